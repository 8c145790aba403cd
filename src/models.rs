use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One opportunity posting as served by the backend.
///
/// The backend round-trips records through a CSV store, so numeric and
/// boolean fields may arrive as numbers, strings, or empty strings.
/// Every field is lenient: a half-broken record should still decode, and
/// anything truly undecodable is dropped at ingestion, not raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpportunityRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub role_title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub location_type: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub stipend: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub stipend_numeric: Option<f64>,
    #[serde(default)]
    pub stipend_currency: String,
    #[serde(default)]
    pub required_skills: String,
    #[serde(default)]
    pub application_deadline: String,
    #[serde(default)]
    pub apply_link: String,
    #[serde(default)]
    pub source_platform: String,
    #[serde(default)]
    pub date_scraped: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_new: bool,
    #[serde(default)]
    pub org_type: String,
    #[serde(default)]
    pub role_type: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub match_score: Option<f64>,
}

impl OpportunityRecord {
    /// Primary sort key. Absent scores sort as 0.
    pub fn score(&self) -> f64 {
        self.match_score.unwrap_or(0.0)
    }

    /// Stipend amount for tier filtering. Absent/non-numeric is 0.
    pub fn stipend_value(&self) -> f64 {
        self.stipend_numeric.unwrap_or(0.0)
    }
}

/// "42000", 42000, 42000.0, "" and null all show up in the wild.
fn lenient_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(de)?;
    Ok(match v {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    })
}

/// Named stipend threshold buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StipendTier {
    #[default]
    All,
    Paid,
    Min10k,
    Min20k,
    Min50k,
    Unpaid,
}

impl StipendTier {
    pub const CYCLE: [StipendTier; 6] = [
        StipendTier::All,
        StipendTier::Paid,
        StipendTier::Min10k,
        StipendTier::Min20k,
        StipendTier::Min50k,
        StipendTier::Unpaid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StipendTier::All => "all",
            StipendTier::Paid => "paid",
            StipendTier::Min10k => "10k+",
            StipendTier::Min20k => "20k+",
            StipendTier::Min50k => "50k+",
            StipendTier::Unpaid => "unpaid",
        }
    }

    pub fn next(self) -> StipendTier {
        let i = Self::CYCLE.iter().position(|t| *t == self).unwrap_or(0);
        Self::CYCLE[(i + 1) % Self::CYCLE.len()]
    }

    pub fn parse(s: &str) -> Option<StipendTier> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(StipendTier::All),
            "paid" => Some(StipendTier::Paid),
            "10k" | "10k+" => Some(StipendTier::Min10k),
            "20k" | "20k+" => Some(StipendTier::Min20k),
            "50k" | "50k+" => Some(StipendTier::Min50k),
            "unpaid" => Some(StipendTier::Unpaid),
            _ => None,
        }
    }
}

/// Current filter state. Read fresh on every render pass; never persisted.
#[derive(Debug, Clone, Default)]
pub struct FacetSelection {
    pub search: String,
    pub source: Option<String>,
    pub location: Option<String>,
    pub stipend: StipendTier,
    pub org: Option<String>,
    pub role: Option<String>,
}

impl FacetSelection {
    pub fn is_default(&self) -> bool {
        self.search.is_empty()
            && self.source.is_none()
            && self.location.is_none()
            && self.stipend == StipendTier::All
            && self.org.is_none()
            && self.role.is_none()
    }
}

/// Out-of-band alert raised by the background job (e.g. a blocking
/// condition it cannot resolve on its own).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub message: String,
}

/// Optional body for POST /scrape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl ScrapeRequest {
    pub fn is_empty(&self) -> bool {
        self.regions.is_none() && self.topics.is_none() && self.sources.is_none()
    }
}

/// Acknowledgement shape shared by the trigger/dismiss/clear endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}
