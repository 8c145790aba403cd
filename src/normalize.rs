use std::collections::HashSet;

use crate::geo;
use crate::models::OpportunityRecord;

/// Clean an incoming batch: drop records without an id, dedup by id
/// keeping the first occurrence in input order, then reclassify each
/// survivor's region tag. Never fails; bad records are simply dropped.
pub fn normalize(batch: Vec<OpportunityRecord>) -> Vec<OpportunityRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<OpportunityRecord> = Vec::with_capacity(batch.len());

    for mut record in batch {
        if record.id.trim().is_empty() {
            continue;
        }
        if !seen.insert(record.id.clone()) {
            continue;
        }
        if let Some(region) = geo::classify(&record) {
            record.location_type = region.as_str().to_string();
        }
        out.push(record);
    }

    out
}
