//! qBittorrent adapter
//!
//! qBittorrent's Web API is session-based: `auth/login` sets an `SID` cookie
//! that every later call must carry, and an expired session answers 403.
//! The cookie lives in the adapter's reqwest cookie store; the supervisor
//! only sees connect/probe outcomes.
//!
//! Activity uses `torrents/info?filter=downloading`, which also returns
//! torrents that are paused or stopped while still "in the downloading
//! category". Those states are excluded by the configurable
//! `inactive_states` list — `stalledDL` stays active on purpose, matching
//! qBittorrent's own notion of a torrent still attempting to download.
//!
//! The global limit endpoint takes bytes/s, so the KiB/s rate is converted
//! here.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::config::QbittorrentConfig;
use crate::error::{Result, SpeedShareError};

use super::{http_client, AgentAdapter, AgentId};

/// One entry from `torrents/info`. Only the state matters here.
#[derive(Debug, Deserialize)]
struct TorrentInfo {
    #[serde(default)]
    state: String,
}

/// Adapter for qBittorrent's Web API.
pub struct QbittorrentAdapter {
    config: QbittorrentConfig,
    client: reqwest::Client,
    base_url: String,
}

impl QbittorrentAdapter {
    pub fn new(config: QbittorrentConfig, timeout: Duration) -> Self {
        let base_url = format!("http://{}:{}", config.host, config.port);
        Self {
            config,
            client: http_client(timeout),
            base_url,
        }
    }

    /// Map a 403 onto the connection taxonomy so the supervisor reconnects.
    fn check_session(status: StatusCode) -> Result<()> {
        if status == StatusCode::FORBIDDEN {
            Err(SpeedShareError::Connection(
                "qbittorrent session expired".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl AgentAdapter for QbittorrentAdapter {
    fn id(&self) -> AgentId {
        AgentId::Qbittorrent
    }

    async fn connect(&mut self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/v2/auth/login", self.base_url))
            // qBittorrent's CSRF check wants a Referer matching the host.
            .header("Referer", &self.base_url)
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        if body.trim() == "Ok." {
            Ok(())
        } else {
            Err(SpeedShareError::Connection(
                "qbittorrent rejected the credentials".to_string(),
            ))
        }
    }

    /// `app/version` is the lightest authenticated endpoint.
    async fn probe(&mut self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/v2/app/version", self.base_url))
            .send()
            .await?;
        Self::check_session(response.status())?;
        response.error_for_status()?;
        Ok(())
    }

    async fn is_active(&mut self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/v2/torrents/info", self.base_url))
            .query(&[("filter", "downloading")])
            .send()
            .await?;
        Self::check_session(response.status())?;

        let torrents: Vec<TorrentInfo> = response
            .error_for_status()?
            .json()
            .await
            .map_err(|e| {
                SpeedShareError::Protocol(format!("qbittorrent torrents/info not understood: {e}"))
            })?;

        let active = torrents
            .iter()
            .any(|t| !self.config.inactive_states.iter().any(|s| s == &t.state));
        debug!(
            total = torrents.len(),
            active, "qbittorrent downloading-filter torrents"
        );
        Ok(active)
    }

    async fn apply_limit(&mut self, rate_kib: u64) -> Result<()> {
        // The API takes bytes/s; 0 would mean unlimited, but the arbiter
        // never allocates 0 (floor and budget are validated nonzero).
        let bytes_per_sec = rate_kib.saturating_mul(1024);
        let response = self
            .client
            .post(format!("{}/api/v2/transfer/setDownloadLimit", self.base_url))
            .form(&[("limit", bytes_per_sec.to_string())])
            .send()
            .await
            .map_err(|e| SpeedShareError::Apply(format!("qbittorrent setDownloadLimit: {e}")))?;
        Self::check_session(response.status())?;
        response
            .error_for_status()
            .map_err(|e| SpeedShareError::Apply(format!("qbittorrent setDownloadLimit: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_defaults() -> QbittorrentConfig {
        QbittorrentConfig::default()
    }

    fn any_active(config: &QbittorrentConfig, torrents: &[TorrentInfo]) -> bool {
        torrents
            .iter()
            .any(|t| !config.inactive_states.iter().any(|s| s == &t.state))
    }

    #[test]
    fn test_paused_and_stopped_are_inactive() {
        let config = config_with_defaults();
        let torrents: Vec<TorrentInfo> = serde_json::from_str(
            r#"[{"state": "pausedDL"}, {"state": "stoppedDL"}]"#,
        )
        .unwrap();
        assert!(!any_active(&config, &torrents));
    }

    #[test]
    fn test_stalled_counts_as_active() {
        // A stalled torrent is still attempting to download; only explicit
        // pauses are excluded.
        let config = config_with_defaults();
        let torrents: Vec<TorrentInfo> =
            serde_json::from_str(r#"[{"state": "pausedDL"}, {"state": "stalledDL"}]"#).unwrap();
        assert!(any_active(&config, &torrents));
    }

    #[test]
    fn test_empty_list_is_inactive() {
        let config = config_with_defaults();
        assert!(!any_active(&config, &[]));
    }

    #[test]
    fn test_custom_inactive_states_respected() {
        let mut config = config_with_defaults();
        config.inactive_states.push("stalledDL".to_string());
        let torrents: Vec<TorrentInfo> =
            serde_json::from_str(r#"[{"state": "stalledDL"}]"#).unwrap();
        assert!(!any_active(&config, &torrents));
    }

    #[test]
    fn test_session_check() {
        assert!(QbittorrentAdapter::check_session(StatusCode::OK).is_ok());
        let err = QbittorrentAdapter::check_session(StatusCode::FORBIDDEN).unwrap_err();
        assert!(err.is_connection());
    }
}
