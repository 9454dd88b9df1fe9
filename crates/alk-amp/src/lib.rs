//! alk-amp
//!
//! Cisco Secure Endpoint (AMP) client: the concrete event feed and
//! remediation actuator for the reconciler.
//!
//! Credentials are resolved by the caller (alk-config) and passed in; do
//! not log them. All requests carry basic auth and a bounded timeout so a
//! single stalled call cannot wedge the daemon.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Deserialize;

use alk_events::Event;
use alk_reconcile::{ActionError, EventFeed, FeedError, RemediationActuator};

/// Upper bound on any single platform call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on response-body text carried into error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP client for the platform's event feed and per-host remediation
/// sub-resources.
#[derive(Debug, Clone)]
pub struct AmpClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    api_key: String,
}

impl AmpClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build amp http client")?;

        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one fire-and-forget remediation command. Success means the
    /// platform accepted the command, nothing more.
    async fn issue(&self, method: Method, path: String, action: &'static str) -> Result<(), ActionError> {
        let resp = self
            .http
            .request(method, self.url(&path))
            .basic_auth(&self.client_id, Some(&self.api_key))
            .send()
            .await
            .map_err(|e| ActionError::Transport(format!("{action}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ActionError::Api {
                status: status.as_u16(),
                message: format!("{action}: {}", truncate(&message)),
            });
        }
        Ok(())
    }
}

/// Feed response envelope. The platform wraps the event array alongside
/// version/metadata fields we do not interpret.
#[derive(Debug, Deserialize)]
struct EventsEnvelope {
    data: Vec<Event>,
}

#[async_trait::async_trait]
impl EventFeed for AmpClient {
    async fn fetch_all(&self) -> Result<Vec<Event>, FeedError> {
        let resp = self
            .http
            .get(self.url("/v1/events"))
            .basic_auth(&self.client_id, Some(&self.api_key))
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: truncate(&message),
            });
        }

        let envelope: EventsEnvelope = resp
            .json()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl RemediationActuator for AmpClient {
    async fn start_scan(&self, guid: &str) -> Result<(), ActionError> {
        self.issue(
            Method::POST,
            format!("/v1/computers/{guid}/full_scan"),
            "start_scan",
        )
        .await
    }

    async fn start_isolation(&self, guid: &str) -> Result<(), ActionError> {
        self.issue(
            Method::PUT,
            format!("/v1/computers/{guid}/isolation"),
            "start_isolation",
        )
        .await
    }

    async fn stop_isolation(&self, guid: &str) -> Result<(), ActionError> {
        self.issue(
            Method::DELETE,
            format!("/v1/computers/{guid}/isolation"),
            "stop_isolation",
        )
        .await
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut cut = ERROR_BODY_LIMIT;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &trimmed[..cut])
}
