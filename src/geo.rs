use crate::models::OpportunityRecord;

/// Coarse region category assigned from URL and free-text evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    India,
    International,
    Remote,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::India => "India",
            Region::International => "International",
            Region::Remote => "Remote",
        }
    }
}

const REMOTE_TERMS: [&str; 5] = ["remote", "work from home", "wfh", "anywhere", "distributed"];

const INDIA_DOMAIN_SUFFIXES: [&str; 7] = [
    ".ac.in", ".edu.in", ".res.in", ".gov.in", ".nic.in", ".co.in", ".org.in",
];

const FOREIGN_DOMAIN_SUFFIXES: [&str; 12] = [
    ".edu", ".gov", ".ac.uk", ".co.uk", ".edu.au", ".ca", ".de", ".fr", ".nl", ".sg", ".jp",
    ".us",
];

const INDIA_CITIES: [&str; 14] = [
    "india",
    "bangalore",
    "bengaluru",
    "mumbai",
    "delhi",
    "new delhi",
    "hyderabad",
    "pune",
    "chennai",
    "kolkata",
    "gurgaon",
    "gurugram",
    "noida",
    "ahmedabad",
];

/// Reclassify a record's region tag. Pure; first match wins:
///
/// 1. remote-indicating term in location or company name -> Remote
/// 2. India-domain suffix in the apply link -> India (domain evidence
///    beats any foreign suffix in the same URL); else an India city in
///    the location text counts unless a foreign-domain suffix matches
/// 3. foreign-domain suffix with no India-domain evidence -> International
/// 4. ambiguous -> None, stored tag stays untouched
pub fn classify(record: &OpportunityRecord) -> Option<Region> {
    let text = format!("{} {}", record.location, record.company_name).to_lowercase();
    if REMOTE_TERMS.iter().any(|t| text.contains(t)) {
        return Some(Region::Remote);
    }

    let url = record.apply_link.to_lowercase();
    let india_domain = INDIA_DOMAIN_SUFFIXES.iter().any(|s| matches_suffix(&url, s));
    let foreign_domain = FOREIGN_DOMAIN_SUFFIXES.iter().any(|s| matches_suffix(&url, s));

    if india_domain {
        return Some(Region::India);
    }

    let location = record.location.to_lowercase();
    if INDIA_CITIES.iter().any(|c| location.contains(c)) && !foreign_domain {
        return Some(Region::India);
    }

    if foreign_domain {
        return Some(Region::International);
    }

    None
}

/// Substring match with a suffix boundary: the character right after the
/// matched suffix must not be a lowercase letter, so ".edu" is not
/// triggered inside ".education" and ".ca" not inside ".caltech".
fn matches_suffix(haystack: &str, suffix: &str) -> bool {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(suffix) {
        let at = from + pos;
        let end = at + suffix.len();
        let boundary = match haystack[end..].chars().next() {
            Some(c) => !c.is_ascii_lowercase(),
            None => true,
        };
        if boundary {
            return true;
        }
        from = at + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(location: &str, company: &str, link: &str) -> OpportunityRecord {
        OpportunityRecord {
            id: "t".to_string(),
            location: location.to_string(),
            company_name: company.to_string(),
            apply_link: link.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn remote_beats_india_city() {
        let r = record("Remote (Bangalore preferred)", "Acme", "https://acme.co.in/jobs/1");
        assert_eq!(classify(&r), Some(Region::Remote));
    }

    #[test]
    fn wfh_in_company_name_counts() {
        let r = record("", "WFH Labs", "");
        assert_eq!(classify(&r), Some(Region::Remote));
    }

    #[test]
    fn india_domain_wins_over_embedded_foreign_suffix() {
        // ".edu.in" carries ".edu"; the India domain must still win.
        let r = record("", "IIT Bombay", "https://careers.iitb.edu.in/intern");
        assert_eq!(classify(&r), Some(Region::India));
    }

    #[test]
    fn bare_edu_is_international_not_india() {
        let r = record("", "MIT CSAIL", "https://csail.mit.edu/positions");
        assert_eq!(classify(&r), Some(Region::International));
    }

    #[test]
    fn foreign_domain_overrides_city_mention() {
        // City text alone loses to explicit foreign-domain evidence.
        let r = record("Bangalore office", "Stanford", "https://apply.stanford.edu/x");
        assert_eq!(classify(&r), Some(Region::International));
    }

    #[test]
    fn city_alone_classifies_india() {
        let r = record("Hyderabad, Telangana", "Some Startup", "https://example.com/a");
        assert_eq!(classify(&r), Some(Region::India));
    }

    #[test]
    fn suffix_boundary_rejects_longer_words() {
        assert!(!matches_suffix("https://best.education/jobs", ".edu"));
        assert!(!matches_suffix("https://www.caltech.org/x", ".ca"));
        assert!(matches_suffix("https://ox.ac.uk/posts", ".ac.uk"));
        assert!(matches_suffix("https://cs.wisc.edu", ".edu"));
    }

    #[test]
    fn ambiguous_record_declines() {
        let r = record("Hybrid", "Globex", "https://globex.io/careers");
        assert_eq!(classify(&r), None);
    }
}
