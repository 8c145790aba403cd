use std::sync::mpsc::Sender;
use std::thread;

use crate::api::ApiClient;
use crate::models::{ActionResponse, AlertPayload, OpportunityRecord, ScrapeRequest};

/// Results posted back into the UI loop. Every network call runs on a
/// short-lived worker thread and reports at most one message; the UI
/// thread is the only place state is mutated.
#[derive(Debug)]
pub enum Msg {
    Records(Vec<OpportunityRecord>),
    /// The ingestion fetch failed; the re-entrancy flag must be released.
    RecordsFailed(String),
    Status(bool),
    Logs(Vec<String>),
    Alert(Option<AlertPayload>),
    TriggerDone(Result<ActionResponse, String>),
    ClearDone(Result<ActionResponse, String>),
}

pub fn spawn_fetch_records(client: ApiClient, tx: Sender<Msg>) {
    thread::spawn(move || {
        let msg = match client.fetch_opportunities() {
            Ok(batch) => Msg::Records(batch),
            Err(e) => Msg::RecordsFailed(e.to_string()),
        };
        let _ = tx.send(msg);
    });
}

/// Status poll. Failures are swallowed: no message, no state change.
pub fn spawn_status_poll(client: ApiClient, tx: Sender<Msg>) {
    thread::spawn(move || {
        if let Ok(running) = client.scrape_status() {
            let _ = tx.send(Msg::Status(running));
        }
    });
}

/// Log poll. Same failure policy as the status poll.
pub fn spawn_logs_fetch(client: ApiClient, tx: Sender<Msg>) {
    thread::spawn(move || {
        if let Ok(logs) = client.fetch_logs() {
            let _ = tx.send(Msg::Logs(logs));
        }
    });
}

/// Alert poll. Same failure policy as the status poll.
pub fn spawn_alert_poll(client: ApiClient, tx: Sender<Msg>) {
    thread::spawn(move || {
        if let Ok(alert) = client.fetch_alert() {
            let _ = tx.send(Msg::Alert(alert));
        }
    });
}

pub fn spawn_trigger(client: ApiClient, tx: Sender<Msg>, request: Option<ScrapeRequest>) {
    thread::spawn(move || {
        let result = client
            .trigger_scrape(request.as_ref())
            .map_err(|e| e.to_string());
        let _ = tx.send(Msg::TriggerDone(result));
    });
}

/// The banner is hidden locally before this is called; the backend
/// notification is best-effort and needs no reply.
pub fn spawn_dismiss(client: ApiClient) {
    thread::spawn(move || {
        let _ = client.dismiss_alert();
    });
}

pub fn spawn_clear(client: ApiClient, tx: Sender<Msg>) {
    thread::spawn(move || {
        let result = client.clear_data().map_err(|e| e.to_string());
        let _ = tx.send(Msg::ClearDone(result));
    });
}
