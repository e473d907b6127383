//! Agent adapters for SpeedShare
//!
//! This module defines the closed set of download agents and the
//! [`AgentAdapter`] trait each one implements. The agent set is fixed at
//! compile time, so there is no runtime registry: one tagged enum, three
//! adapter structs.
//!
//! Each adapter owns its wire protocol end to end (auth, call shapes, unit
//! conversion) and exposes the same three operations: establish a session,
//! report whether anything is actually transferring, and enforce a download
//! ceiling. "Actually transferring" is adapter-specific policy: each client
//! has its own status vocabulary, and each adapter reproduces its own
//! stalled/paused exclusions rather than sharing a generalized predicate.

pub mod deluge;
pub mod qbittorrent;
pub mod sabnzbd;

pub use deluge::DelugeAdapter;
pub use qbittorrent::QbittorrentAdapter;
pub use sabnzbd::SabnzbdAdapter;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Identity of a download agent. A closed set: the three clients SpeedShare
/// knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgentId {
    /// SABnzbd (Usenet)
    Sabnzbd,
    /// Deluge (BitTorrent)
    Deluge,
    /// qBittorrent (BitTorrent)
    Qbittorrent,
}

impl AgentId {
    /// Every known agent, in stable order.
    pub const ALL: [AgentId; 3] = [AgentId::Sabnzbd, AgentId::Deluge, AgentId::Qbittorrent];

    /// Short lowercase name used in logs and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Sabnzbd => "sabnzbd",
            AgentId::Deluge => "deluge",
            AgentId::Qbittorrent => "qbittorrent",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for download-agent adapters (SABnzbd, Deluge, qBittorrent).
///
/// Implementations translate between SpeedShare's model (active/inactive,
/// KiB/s ceilings) and the agent's remote control protocol. Session state
/// (auth cookies) is private to the adapter; the connection supervisor only
/// tracks whether `connect` has succeeded.
///
/// Every network call must be bounded by the configured request timeout so
/// one unresponsive agent can never stall the whole tick.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Which agent this adapter drives.
    fn id(&self) -> AgentId;

    /// Establish or re-establish a session with the agent.
    ///
    /// Stateless protocols succeed trivially. Expected network failures
    /// return [`SpeedShareError::Connection`](crate::error::SpeedShareError),
    /// never panic.
    async fn connect(&mut self) -> Result<()>;

    /// Cheap liveness check on an established session.
    ///
    /// Default is a no-op for protocols where every call re-authenticates
    /// anyway. Session-based adapters override this with something cheaper
    /// than a full reconnect.
    async fn probe(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether the agent currently has at least one item actually
    /// transferring data — not merely queued, paused, stalled, or checking.
    async fn is_active(&mut self) -> Result<bool>;

    /// Enforce a download ceiling of `rate_kib` KiB/s on the agent.
    ///
    /// Unit conversion to the agent's native unit is the adapter's job.
    async fn apply_limit(&mut self, rate_kib: u64) -> Result<()>;
}

/// Build the reqwest client shared by an adapter's calls, with the per-call
/// timeout that bounds every tick step.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .cookie_store(true)
        .build()
        // Never hand back a client without the timeout: a builder failure
        // here means the TLS backend is unusable and nothing would work.
        .expect("reqwest client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_display() {
        assert_eq!(AgentId::Sabnzbd.to_string(), "sabnzbd");
        assert_eq!(AgentId::Deluge.to_string(), "deluge");
        assert_eq!(AgentId::Qbittorrent.to_string(), "qbittorrent");
    }

    #[test]
    fn test_http_client_builds_with_timeout() {
        // The adapters rely on this helper to bound every call.
        let _client = http_client(std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_all_is_complete_and_ordered() {
        assert_eq!(AgentId::ALL.len(), 3);
        let mut sorted = AgentId::ALL;
        sorted.sort();
        assert_eq!(sorted, AgentId::ALL);
    }
}
