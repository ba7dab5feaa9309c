//! HTTP client for the Pulse gateway

use event_gateway::EventSummary;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Result of posting one event
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Queued { depth: usize },
    Invalid { message: String, details: Value },
    Busy { retry_after_secs: u64 },
}

pub struct PulseClient {
    base_url: String,
    http: reqwest::Client,
}

impl PulseClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn send_event(&self, event: &Value) -> ClientResult<SendOutcome> {
        let response = self.http.post(self.url("/event")).json(event).send().await?;
        let status = response.status();

        if status.is_success() {
            let body: Value = response.json().await?;
            let depth = body.get("depth").and_then(Value::as_u64).unwrap_or(0) as usize;
            return Ok(SendOutcome::Queued { depth });
        }

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Ok(SendOutcome::Busy { retry_after_secs });
        }

        if status == reqwest::StatusCode::BAD_REQUEST {
            let body: Value = response.json().await?;
            let error = body.get("error").cloned().unwrap_or(Value::Null);
            let message =
                error.get("message").and_then(Value::as_str).unwrap_or("invalid event").to_string();
            let details = error.get("details").cloned().unwrap_or(Value::Null);
            return Ok(SendOutcome::Invalid { message, details });
        }

        Err(ClientError::Status { status: status.as_u16(), body: response.text().await? })
    }

    /// Records as loose JSON; historical rows may lack fields
    pub async fn list_events(
        &self,
        after_id: Option<i64>,
        limit: Option<usize>,
    ) -> ClientResult<Vec<Value>> {
        let mut query = Vec::new();
        if let Some(after_id) = after_id {
            query.push(("after_id", after_id.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self.http.get(self.url("/events")).query(&query).send().await?;
        Self::json_or_status(response).await
    }

    pub async fn summary(&self) -> ClientResult<EventSummary> {
        let response = self.http.get(self.url("/events/summary")).send().await?;
        Self::json_or_status(response).await
    }

    pub async fn stats(&self) -> ClientResult<Value> {
        let response = self.http.get(self.url("/stats")).send().await?;
        Self::json_or_status(response).await
    }

    /// Health body; a degraded service answers 503 with the same shape
    pub async fn health(&self) -> ClientResult<Value> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(response.json().await?)
    }

    async fn json_or_status<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { status: status.as_u16(), body: response.text().await? });
        }
        Ok(response.json().await?)
    }
}
