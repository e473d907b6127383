//! SABnzbd adapter
//!
//! SABnzbd exposes a stateless query-style HTTP API: every call carries the
//! API key, so there is no session to establish or lose. `connect` therefore
//! succeeds trivially and reconnection is meaningless for this agent.
//!
//! Activity is read from `mode=queue`: the queue reports a single overall
//! status string, and only the `"Downloading"` sentinel counts as active —
//! `Paused`, `Idle`, etc. do not. The limit is set through
//! `mode=config&name=speedlimit` with a `K` suffix for KiB/s.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::SabnzbdConfig;
use crate::error::{Result, SpeedShareError};

use super::{http_client, AgentAdapter, AgentId};

/// Queue status string SABnzbd reports while fetching articles.
const DOWNLOADING_STATUS: &str = "Downloading";

/// Response envelope for `mode=queue&output=json`.
#[derive(Debug, Deserialize)]
struct QueueResponse {
    #[serde(default)]
    queue: Option<QueueInfo>,
}

#[derive(Debug, Deserialize)]
struct QueueInfo {
    #[serde(default)]
    status: Option<String>,
}

/// Adapter for SABnzbd's query-style API.
pub struct SabnzbdAdapter {
    config: SabnzbdConfig,
    client: reqwest::Client,
    base_url: String,
}

impl SabnzbdAdapter {
    pub fn new(config: SabnzbdConfig, timeout: Duration) -> Self {
        let base_url = format!("http://{}:{}/sabnzbd/api", config.host, config.port);
        Self {
            config,
            client: http_client(timeout),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl AgentAdapter for SabnzbdAdapter {
    fn id(&self) -> AgentId {
        AgentId::Sabnzbd
    }

    /// No session to establish; the API key rides on every request.
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn is_active(&mut self) -> Result<bool> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("mode", "queue"),
                ("output", "json"),
                ("apikey", &self.config.api_key),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: QueueResponse = response.json().await.map_err(|e| {
            SpeedShareError::Protocol(format!("sabnzbd queue response not understood: {e}"))
        })?;

        let status = body.queue.and_then(|q| q.status);
        debug!(status = ?status, "sabnzbd queue status");
        Ok(status.as_deref() == Some(DOWNLOADING_STATUS))
    }

    async fn apply_limit(&mut self, rate_kib: u64) -> Result<()> {
        let value = format!("{rate_kib}K");
        self.client
            .get(&self.base_url)
            .query(&[
                ("mode", "config"),
                ("name", "speedlimit"),
                ("value", value.as_str()),
                ("apikey", &self.config.api_key),
            ])
            .send()
            .await
            .map_err(|e| SpeedShareError::Apply(format!("sabnzbd speedlimit: {e}")))?
            .error_for_status()
            .map_err(|e| SpeedShareError::Apply(format!("sabnzbd speedlimit: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_response_parsing() {
        let json = r#"{"queue": {"status": "Downloading", "speed": "1.2 M"}}"#;
        let body: QueueResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            body.queue.and_then(|q| q.status).as_deref(),
            Some("Downloading")
        );
    }

    #[test]
    fn test_queue_response_paused_is_not_downloading() {
        let json = r#"{"queue": {"status": "Paused"}}"#;
        let body: QueueResponse = serde_json::from_str(json).unwrap();
        let status = body.queue.and_then(|q| q.status);
        assert_ne!(status.as_deref(), Some(DOWNLOADING_STATUS));
    }

    #[test]
    fn test_unexpected_shape_parses_to_none() {
        // Missing `queue` object must not be a parse failure; it reads as
        // "no status", which the poller treats as inactive.
        let json = r#"{"error": "API Key Incorrect"}"#;
        let body: QueueResponse = serde_json::from_str(json).unwrap();
        assert!(body.queue.is_none());
    }
}
