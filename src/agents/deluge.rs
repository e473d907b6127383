//! Deluge adapter
//!
//! Talks to the Deluge web UI's JSON-RPC endpoint (`POST /json`). The
//! session is a cookie minted by `auth.login`; `web.connected` doubles as a
//! cheap liveness probe for that session.
//!
//! Activity comes from `core.get_torrents_status` filtered by state — Deluge
//! does the stalled/paused exclusion for us when we filter on its
//! `"Downloading"` state, so a nonempty result map means something is
//! actually pulling data. The limit goes through the Scheduler plugin's
//! `low_down` key (`scheduler.set_config`), which means the plugin must be
//! enabled in Deluge for the throttle to take effect.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::DelugeConfig;
use crate::error::{Result, SpeedShareError};

use super::{http_client, AgentAdapter, AgentId};

/// A Deluge web JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    params: Value,
    id: u64,
}

/// A Deluge web JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

/// Adapter for Deluge's web JSON-RPC API.
pub struct DelugeAdapter {
    config: DelugeConfig,
    client: reqwest::Client,
    endpoint: String,
    next_id: u64,
}

impl DelugeAdapter {
    pub fn new(config: DelugeConfig, timeout: Duration) -> Self {
        let endpoint = format!("http://{}:{}/json", config.host, config.port);
        Self {
            config,
            client: http_client(timeout),
            endpoint,
            next_id: 0,
        }
    }

    /// Issue one RPC call and unwrap the JSON-RPC envelope.
    async fn call(&mut self, method: &str, params: Value) -> Result<Value> {
        self.next_id += 1;
        let request = RpcRequest {
            method,
            params,
            id: self.next_id,
        };

        let response: RpcResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| {
                SpeedShareError::Protocol(format!("deluge {method} response not understood: {e}"))
            })?;

        if let Some(err) = response.error {
            return Err(SpeedShareError::Protocol(format!(
                "deluge {method} failed (code {}): {}",
                err.code, err.message
            )));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[async_trait::async_trait]
impl AgentAdapter for DelugeAdapter {
    fn id(&self) -> AgentId {
        AgentId::Deluge
    }

    /// Log in and verify the web UI is attached to a daemon.
    async fn connect(&mut self) -> Result<()> {
        let password = self.config.password.clone();
        let authed = self.call("auth.login", json!([password])).await?;
        if authed.as_bool() != Some(true) {
            return Err(SpeedShareError::Connection(
                "deluge rejected the web UI password".to_string(),
            ));
        }

        let connected = self.call("web.connected", json!([])).await?;
        if connected.as_bool() != Some(true) {
            return Err(SpeedShareError::Connection(
                "deluge web UI is not connected to a daemon".to_string(),
            ));
        }
        Ok(())
    }

    /// Session cookies expire server-side; `web.connected` is the cheapest
    /// call that exercises both the cookie and the daemon link.
    async fn probe(&mut self) -> Result<()> {
        let connected = self.call("web.connected", json!([])).await?;
        if connected.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SpeedShareError::Connection(
                "deluge session lost daemon connection".to_string(),
            ))
        }
    }

    async fn is_active(&mut self) -> Result<bool> {
        let state = self.config.active_state.clone();
        let result = self
            .call(
                "core.get_torrents_status",
                json!([{ "state": state }, ["name"]]),
            )
            .await?;

        // The result is a map of torrent id -> requested fields.
        let count = result.as_object().map(|m| m.len()).unwrap_or(0);
        debug!(count, "deluge torrents in active state");
        Ok(count > 0)
    }

    async fn apply_limit(&mut self, rate_kib: u64) -> Result<()> {
        // Scheduler's low_down is already KiB/s; no conversion needed.
        self.call("scheduler.set_config", json!([{ "low_down": rate_kib }]))
            .await
            .map_err(|e| {
                SpeedShareError::Apply(format!(
                    "deluge scheduler.set_config: {e} (is the Scheduler plugin enabled?)"
                ))
            })?;
        Ok(())
    }
}
