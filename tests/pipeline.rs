// tests/pipeline.rs
//
// Drives the ingestion pipeline the way the dashboard does:
// raw JSON batch -> normalize -> filter/sort -> reconcile, across
// several polling rounds.
//
use oppdash::filter;
use oppdash::models::{FacetSelection, OpportunityRecord, StipendTier};
use oppdash::normalize::normalize;
use oppdash::reconcile::CardStore;
use serde_json::{Value, json};

fn decode(batch: Vec<Value>) -> Vec<OpportunityRecord> {
    batch
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

fn raw_batch() -> Vec<Value> {
    vec![
        json!({
            "id": "in-1",
            "company_name": "IIT Madras",
            "role_title": "Computer Vision Research Intern",
            "location": "Chennai",
            "location_type": "",
            "apply_link": "https://research.iitm.ac.in/intern",
            "stipend": "₹25,000 /month",
            "stipend_numeric": "25000",
            "required_skills": "Python, PyTorch",
            "source_platform": "universities",
            "date_scraped": "2025-03-02",
            "match_score": 85
        }),
        // Duplicate id: must be dropped, first occurrence wins.
        json!({
            "id": "in-1",
            "company_name": "Duplicate Corp",
            "role_title": "Should not survive"
        }),
        // No id: dropped.
        json!({
            "company_name": "Ghost Labs",
            "role_title": "Phantom Intern"
        }),
        // Not even an object: dropped at decode time.
        json!("garbage"),
        json!({
            "id": "rm-1",
            "company_name": "Distributed Minds",
            "role_title": "ML Engineering Intern",
            "location": "Remote (Bangalore welcome)",
            "location_type": "India",
            "apply_link": "https://distributedminds.com/jobs/7",
            "stipend": "",
            "stipend_numeric": "",
            "required_skills": "Rust, Kubernetes",
            "source_platform": "remotive",
            "date_scraped": "2025-03-04",
            "match_score": 85
        }),
        json!({
            "id": "us-1",
            "company_name": "Stanford AI Lab",
            "role_title": "NLP Summer Intern",
            "location": "Palo Alto",
            "location_type": "",
            "apply_link": "https://ai.stanford.edu/apply",
            "stipend": "$3000 /month",
            "stipend_numeric": 3000,
            "required_skills": "Python, Transformers",
            "source_platform": "universities",
            "date_scraped": "2025-03-03",
            "match_score": 72
        }),
    ]
}

#[test]
fn ingestion_round_normalizes_classifies_and_sorts() {
    let records = normalize(decode(raw_batch()));

    // Five raw elements, one garbage, one id-less, one duplicate.
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id, "in-1");
    assert_eq!(records[0].company_name, "IIT Madras");

    let by_id = |id: &str| records.iter().find(|r| r.id == id).unwrap();
    assert_eq!(by_id("in-1").location_type, "India");
    // Remote wording beats both the stored tag and the city mention.
    assert_eq!(by_id("rm-1").location_type, "Remote");
    assert_eq!(by_id("us-1").location_type, "International");

    // Equal scores fall back to date; lone lower score goes last.
    let view = filter::view(&records, &FacetSelection::default());
    let ids: Vec<&str> = view.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["rm-1", "in-1", "us-1"]);

    let counts = filter::region_counts(&records);
    assert_eq!(
        (counts.total, counts.india, counts.international, counts.remote),
        (3, 1, 1, 1)
    );
}

#[test]
fn polling_rounds_reconcile_without_recreating_survivors() {
    let facets = FacetSelection::default();
    let mut store = CardStore::new();

    // First poll.
    let records = normalize(decode(raw_batch()));
    let view = filter::view(&records, &facets);
    let summary = store.reconcile(&view);
    assert_eq!(summary.created, 3);
    let handle_in1 = store.handle_of("in-1").unwrap();

    // Second poll: same data plus one new record that outranks them all.
    let mut batch = raw_batch();
    batch.push(json!({
        "id": "new-1",
        "company_name": "ISRO",
        "role_title": "Robotics Intern",
        "location": "Ahmedabad",
        "apply_link": "https://careers.gov.in/isro",
        "stipend_numeric": 55000,
        "source_platform": "government",
        "date_scraped": "2025-03-05",
        "match_score": 95
    }));
    let records = normalize(decode(batch));
    let view = filter::view(&records, &facets);
    let summary = store.reconcile(&view);

    assert_eq!(summary.created, 1);
    assert_eq!(summary.removed, 0);
    // The newcomer takes position 0; survivors shift by order value only.
    assert_eq!(store.handle_of("in-1"), Some(handle_in1));
    let new_card = store.card(store.handle_of("new-1").unwrap()).unwrap();
    assert_eq!(new_card.order, 0);
    let kept = store.card(handle_in1).unwrap();
    assert_eq!(kept.order, 2);
}

#[test]
fn facet_change_narrows_then_restores() {
    let mut store = CardStore::new();
    let records = normalize(decode(raw_batch()));

    let view = filter::view(&records, &FacetSelection::default());
    store.reconcile(&view);
    assert_eq!(store.len(), 3);
    let kept_handle = store.handle_of("in-1").unwrap();

    // Tier 20k keeps only the 25k stipend.
    let facets = FacetSelection {
        stipend: StipendTier::Min20k,
        ..Default::default()
    };
    let view = filter::view(&records, &facets);
    let summary = store.reconcile(&view);
    assert_eq!(summary.removed, 2);
    assert_eq!(summary.created, 0);
    assert_eq!(store.handle_of("in-1"), Some(kept_handle));

    // An impossible search empties the view: placeholder mode.
    let facets = FacetSelection {
        search: "blockchain cobol".to_string(),
        ..Default::default()
    };
    let view = filter::view(&records, &facets);
    store.reconcile(&view);
    assert!(view.is_empty());
    assert!(store.showing_placeholder());
    assert!(store.is_empty());

    // Dropping the search restores normal rendering with fresh cards.
    let view = filter::view(&records, &FacetSelection::default());
    let summary = store.reconcile(&view);
    assert!(!store.showing_placeholder());
    assert_eq!(summary.created, 3);
}

#[test]
fn renormalizing_is_a_no_op() {
    let records = normalize(decode(raw_batch()));
    let again = normalize(records.clone());
    let pairs = |rs: &[OpportunityRecord]| -> Vec<(String, String)> {
        rs.iter()
            .map(|r| (r.id.clone(), r.location_type.clone()))
            .collect()
    };
    assert_eq!(pairs(&records), pairs(&again));
}
