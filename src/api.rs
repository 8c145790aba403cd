use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::models::{ActionResponse, AlertPayload, OpportunityRecord, ScrapeRequest};

/// HTTP client for the backend collaborator. One instance is shared by
/// the CLI commands and cloned into poll workers.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AlertResponse {
    #[serde(default)]
    alert: Option<AlertPayload>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<ApiClient> {
        // Bounded timeout so a wedged backend cannot hang a poll worker.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            base: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// GET /opportunities. Elements that fail to decode are dropped so a
    /// single malformed record never sinks the batch.
    pub fn fetch_opportunities(&self) -> Result<Vec<OpportunityRecord>> {
        let response = self
            .client
            .get(self.url("/opportunities"))
            .send()
            .context("Failed to fetch opportunities")?;
        let response = ok_or_status(response, "opportunities")?;
        let raw: Vec<Value> = response
            .json()
            .context("Failed to parse opportunities response")?;
        Ok(decode_records(raw))
    }

    /// POST /scrape, with the region/topic/source selection when one was
    /// given. The backend answers immediately; completion is observed via
    /// the status poll.
    pub fn trigger_scrape(&self, request: Option<&ScrapeRequest>) -> Result<ActionResponse> {
        let mut builder = self.client.post(self.url("/scrape"));
        if let Some(req) = request {
            builder = builder.json(req);
        }
        let response = builder.send().context("Failed to trigger scrape")?;
        let response = ok_or_status(response, "scrape trigger")?;
        response.json().context("Failed to parse trigger response")
    }

    /// GET /scrape/status -> whether the background job is running.
    pub fn scrape_status(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.url("/scrape/status"))
            .send()
            .context("Failed to fetch scraper status")?;
        let response = ok_or_status(response, "status")?;
        let status: StatusResponse = response.json().context("Failed to parse status response")?;
        Ok(status.status == "running")
    }

    /// GET /logs -> ordered log lines, oldest first.
    pub fn fetch_logs(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/logs"))
            .send()
            .context("Failed to fetch logs")?;
        let response = ok_or_status(response, "logs")?;
        let logs: LogsResponse = response.json().context("Failed to parse logs response")?;
        Ok(logs.logs)
    }

    /// GET /alerts -> the current action-required alert, if any.
    pub fn fetch_alert(&self) -> Result<Option<AlertPayload>> {
        let response = self
            .client
            .get(self.url("/alerts"))
            .send()
            .context("Failed to fetch alerts")?;
        let response = ok_or_status(response, "alerts")?;
        let alert: AlertResponse = response.json().context("Failed to parse alert response")?;
        Ok(alert.alert)
    }

    /// POST /alerts/dismiss. Fire-and-forget from the caller's view.
    pub fn dismiss_alert(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("/alerts/dismiss"))
            .send()
            .context("Failed to dismiss alert")?;
        ok_or_status(response, "alert dismiss")?;
        Ok(())
    }

    /// POST /clear. The backend refuses while the job is running; its
    /// status/message body is surfaced either way so the caller can show
    /// the backend's own wording.
    pub fn clear_data(&self) -> Result<ActionResponse> {
        let response = self
            .client
            .post(self.url("/clear"))
            .send()
            .context("Failed to clear data")?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        if let Ok(ack) = serde_json::from_str::<ActionResponse>(&body) {
            if !ack.status.is_empty() {
                return Ok(ack);
            }
        }
        if status.is_success() {
            Ok(ActionResponse {
                status: "success".to_string(),
                message: None,
            })
        } else {
            Err(anyhow!("Clear request failed with status {}: {}", status, body))
        }
    }
}

fn ok_or_status(
    response: reqwest::blocking::Response,
    what: &str,
) -> Result<reqwest::blocking::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(anyhow!("{} request failed with status {}: {}", what, status, body))
    }
}

fn decode_records(raw: Vec<Value>) -> Vec<OpportunityRecord> {
    raw.into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.url("/logs"), "http://localhost:5000/logs");
    }

    #[test]
    fn undecodable_elements_are_dropped_not_fatal() {
        let raw = vec![
            json!({"id": "a", "role_title": "ML Intern"}),
            json!("not a record"),
            json!(42),
            json!({"id": "b"}),
        ];
        let records = decode_records(raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn alert_response_shapes() {
        let none: AlertResponse = serde_json::from_str(r#"{"alert": null}"#).unwrap();
        assert!(none.alert.is_none());

        let some: AlertResponse =
            serde_json::from_str(r#"{"alert": {"source": "linkedin", "message": "captcha"}}"#)
                .unwrap();
        let alert = some.alert.unwrap();
        assert_eq!(alert.source, "linkedin");
        assert_eq!(alert.message, "captcha");
    }
}
