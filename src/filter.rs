use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{FacetSelection, OpportunityRecord, StipendTier};

/// Apply the facet selection and produce the display order: match score
/// descending, ties broken by scrape date descending. The sort is stable,
/// so records with identical keys keep their input order.
pub fn view(records: &[OpportunityRecord], facets: &FacetSelection) -> Vec<OpportunityRecord> {
    let needle = facets.search.trim().to_lowercase();

    let mut out: Vec<OpportunityRecord> = records
        .iter()
        .filter(|r| passes(r, facets, &needle))
        .cloned()
        .collect();

    out.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(Ordering::Equal)
            .then_with(|| date_key(&b.date_scraped).cmp(&date_key(&a.date_scraped)))
    });

    out
}

fn passes(r: &OpportunityRecord, facets: &FacetSelection, needle: &str) -> bool {
    if !needle.is_empty() {
        let haystack = format!(
            "{} {} {}",
            r.role_title, r.company_name, r.required_skills
        )
        .to_lowercase();
        if !haystack.contains(needle) {
            return false;
        }
    }

    if let Some(source) = &facets.source {
        if r.source_platform != *source {
            return false;
        }
    }
    if let Some(location) = &facets.location {
        if r.location_type != *location {
            return false;
        }
    }
    if let Some(org) = &facets.org {
        if r.org_type != *org {
            return false;
        }
    }
    if let Some(role) = &facets.role {
        if r.role_type != *role {
            return false;
        }
    }

    let amount = r.stipend_value();
    match facets.stipend {
        StipendTier::All => true,
        // Zero-amount listings still count as paid when the display text
        // carries a monthly cadence the amount parser missed.
        StipendTier::Paid => amount > 0.0 || r.stipend.to_lowercase().contains("month"),
        StipendTier::Min10k => amount >= 10_000.0,
        StipendTier::Min20k => amount >= 20_000.0,
        StipendTier::Min50k => amount >= 50_000.0,
        StipendTier::Unpaid => amount <= 0.0,
    }
}

/// Scrape dates come in a handful of shapes; unparsable ones sort as
/// earliest rather than erroring.
fn date_key(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

/// Distinct non-empty source platforms, sorted, for the source selector.
pub fn distinct_sources(records: &[OpportunityRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|r| !r.source_platform.is_empty())
        .map(|r| r.source_platform.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per-region totals for the tab bar. Anything that is neither India nor
/// Remote is bucketed as International, matching the tab semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionCounts {
    pub total: usize,
    pub india: usize,
    pub international: usize,
    pub remote: usize,
}

pub fn region_counts(records: &[OpportunityRecord]) -> RegionCounts {
    let mut counts = RegionCounts {
        total: records.len(),
        ..Default::default()
    };
    for r in records {
        match r.location_type.as_str() {
            "India" => counts.india += 1,
            "Remote" => counts.remote += 1,
            _ => counts.international += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, score: Option<f64>, date: &str) -> OpportunityRecord {
        OpportunityRecord {
            id: id.to_string(),
            match_score: score,
            date_scraped: date.to_string(),
            ..Default::default()
        }
    }

    fn ids(view: &[OpportunityRecord]) -> Vec<&str> {
        view.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn sort_score_then_date_descending() {
        let records = vec![
            record("1", Some(80.0), "2024-01-02"),
            record("2", Some(80.0), "2024-01-01"),
            record("3", Some(90.0), "2024-01-01"),
        ];
        let v = view(&records, &FacetSelection::default());
        assert_eq!(ids(&v), vec!["3", "1", "2"]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let records = vec![
            record("a", Some(70.0), "2024-03-01"),
            record("b", Some(70.0), "2024-03-01"),
            record("c", Some(70.0), "2024-03-01"),
        ];
        let v = view(&records, &FacetSelection::default());
        assert_eq!(ids(&v), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_score_sorts_as_zero_and_bad_date_sorts_earliest() {
        let records = vec![
            record("bad-date", Some(50.0), "sometime soon"),
            record("dated", Some(50.0), "2023-06-01"),
            record("unscored", None, "2024-06-01"),
        ];
        let v = view(&records, &FacetSelection::default());
        assert_eq!(ids(&v), vec!["dated", "bad-date", "unscored"]);
    }

    #[test]
    fn search_covers_title_company_and_skills() {
        let mut r = record("1", None, "");
        r.required_skills = "PyTorch, CUDA".to_string();
        let records = vec![r, record("2", None, "")];

        let facets = FacetSelection {
            search: "cuda".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &facets)), vec!["1"]);

        let facets = FacetSelection {
            search: "cobol".to_string(),
            ..Default::default()
        };
        assert!(view(&records, &facets).is_empty());
    }

    #[test]
    fn stipend_tiers() {
        let mut r = record("1", None, "");
        r.stipend_numeric = Some(15_000.0);
        let records = vec![r];

        let tier = |stipend| FacetSelection {
            stipend,
            ..Default::default()
        };
        assert_eq!(view(&records, &tier(StipendTier::Min10k)).len(), 1);
        assert_eq!(view(&records, &tier(StipendTier::Min20k)).len(), 0);
        assert_eq!(view(&records, &tier(StipendTier::Paid)).len(), 1);
        assert_eq!(view(&records, &tier(StipendTier::Unpaid)).len(), 0);
    }

    #[test]
    fn paid_tier_accepts_monthly_text_without_amount() {
        let mut r = record("1", None, "");
        r.stipend = "₹8,000 /month".to_string();
        let records = vec![r];
        let facets = FacetSelection {
            stipend: StipendTier::Paid,
            ..Default::default()
        };
        assert_eq!(view(&records, &facets).len(), 1);
    }

    #[test]
    fn exact_facets_filter() {
        let mut a = record("a", None, "");
        a.source_platform = "internshala".to_string();
        a.location_type = "India".to_string();
        let mut b = record("b", None, "");
        b.source_platform = "remotive".to_string();
        b.location_type = "Remote".to_string();
        let records = vec![a, b];

        let facets = FacetSelection {
            source: Some("internshala".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &facets)), vec!["a"]);

        let facets = FacetSelection {
            location: Some("Remote".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&view(&records, &facets)), vec!["b"]);
    }

    #[test]
    fn sources_are_distinct_and_sorted() {
        let mut a = record("a", None, "");
        a.source_platform = "unstop".to_string();
        let mut b = record("b", None, "");
        b.source_platform = "internshala".to_string();
        let mut c = record("c", None, "");
        c.source_platform = "unstop".to_string();
        let d = record("d", None, "");

        let sources = distinct_sources(&[a, b, c, d]);
        assert_eq!(sources, vec!["internshala", "unstop"]);
    }

    #[test]
    fn unknown_region_counts_as_international() {
        let mut a = record("a", None, "");
        a.location_type = "India".to_string();
        let mut b = record("b", None, "");
        b.location_type = "Hybrid".to_string();
        let mut c = record("c", None, "");
        c.location_type = "Remote".to_string();

        let counts = region_counts(&[a, b, c]);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.india, 1);
        assert_eq!(counts.remote, 1);
        assert_eq!(counts.international, 1);
    }
}
