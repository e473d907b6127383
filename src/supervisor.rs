//! Connection supervisor
//!
//! Owns one adapter plus its connection state per agent, and runs the
//! per-tick passes over them: lazy reconnect, activity polling, and limit
//! application. All agent-level errors are absorbed here — logged once,
//! converted into "inactive" or "unset" outcomes — so one misbehaving agent
//! can never abort the tick for the others.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::agents::{AgentAdapter, AgentId};
use crate::arbiter::Allocation;

/// Connection state of one agent, driven only by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentConnectionState {
    Disconnected,
    Connected,
}

struct AgentEntry {
    adapter: Box<dyn AgentAdapter>,
    state: AgentConnectionState,
}

/// Per-agent connection bookkeeping and tick passes.
pub struct ConnectionSupervisor {
    entries: Vec<AgentEntry>,
}

impl ConnectionSupervisor {
    /// Build a supervisor over the given adapters. All start disconnected;
    /// the first `ensure_connected` pass brings them up.
    pub fn new(adapters: Vec<Box<dyn AgentAdapter>>) -> Self {
        let entries = adapters
            .into_iter()
            .map(|adapter| AgentEntry {
                adapter,
                state: AgentConnectionState::Disconnected,
            })
            .collect();
        Self { entries }
    }

    /// Current connection state for an agent. Unknown ids read as
    /// disconnected.
    pub fn state(&self, id: AgentId) -> AgentConnectionState {
        self.entries
            .iter()
            .find(|e| e.adapter.id() == id)
            .map(|e| e.state)
            .unwrap_or(AgentConnectionState::Disconnected)
    }

    /// Reconnect pass. For every agent, strictly in order:
    ///
    /// - Disconnected: try `connect`; failure leaves it disconnected and
    ///   moves on — the agent is simply inactive this tick.
    /// - Connected: run the cheap liveness probe; failure drops the session
    ///   with no retry until the next tick's connect.
    ///
    /// One agent's outage never blocks the others.
    pub async fn ensure_connected(&mut self) {
        for entry in &mut self.entries {
            let id = entry.adapter.id();
            match entry.state {
                AgentConnectionState::Disconnected => match entry.adapter.connect().await {
                    Ok(()) => {
                        info!(agent = %id, "connected");
                        entry.state = AgentConnectionState::Connected;
                    }
                    Err(e) => {
                        debug!(agent = %id, error = %e, "connect failed, will retry next tick");
                    }
                },
                AgentConnectionState::Connected => {
                    if let Err(e) = entry.adapter.probe().await {
                        warn!(agent = %id, error = %e, "session lost");
                        entry.state = AgentConnectionState::Disconnected;
                    }
                }
            }
        }
    }

    /// Activity poll pass. Produces the tick's active set.
    ///
    /// Disconnected agents are excluded outright. A probe error is fail-safe
    /// "not active"; a connection-class error additionally drops the session
    /// so the next tick reconnects.
    pub async fn poll_active(&mut self) -> BTreeSet<AgentId> {
        let mut active = BTreeSet::new();
        for entry in &mut self.entries {
            if entry.state != AgentConnectionState::Connected {
                continue;
            }
            let id = entry.adapter.id();
            match entry.adapter.is_active().await {
                Ok(true) => {
                    active.insert(id);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(agent = %id, error = %e, "activity probe failed, treating as inactive");
                    if e.is_connection() {
                        entry.state = AgentConnectionState::Disconnected;
                    }
                }
            }
        }
        active
    }

    /// Apply pass. Pushes each agent's allocated rate to every connected
    /// adapter; a disconnected agent is a no-op, not an error, and apply
    /// failures are logged warnings — the next differing tick retries them
    /// naturally.
    pub async fn apply(&mut self, allocation: &Allocation) {
        for entry in &mut self.entries {
            if entry.state != AgentConnectionState::Connected {
                continue;
            }
            let id = entry.adapter.id();
            let Some(&rate_kib) = allocation.get(&id) else {
                continue;
            };
            match entry.adapter.apply_limit(rate_kib).await {
                Ok(()) => debug!(agent = %id, rate_kib, "limit applied"),
                Err(e) => warn!(agent = %id, rate_kib, error = %e, "failed to apply limit"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::MockAgentAdapter;
    use crate::error::SpeedShareError;

    fn mock(id: AgentId) -> MockAgentAdapter {
        let mut adapter = MockAgentAdapter::new();
        adapter.expect_id().return_const(id);
        adapter
    }

    #[tokio::test]
    async fn test_connect_failure_is_isolated() {
        let mut sab = mock(AgentId::Sabnzbd);
        sab.expect_connect()
            .returning(|| Err(SpeedShareError::Connection("refused".into())));

        let mut deluge = mock(AgentId::Deluge);
        deluge.expect_connect().returning(|| Ok(()));

        let mut qbit = mock(AgentId::Qbittorrent);
        qbit.expect_connect().returning(|| Ok(()));

        let mut supervisor =
            ConnectionSupervisor::new(vec![Box::new(sab), Box::new(deluge), Box::new(qbit)]);
        supervisor.ensure_connected().await;

        assert_eq!(
            supervisor.state(AgentId::Sabnzbd),
            AgentConnectionState::Disconnected
        );
        assert_eq!(
            supervisor.state(AgentId::Deluge),
            AgentConnectionState::Connected
        );
        assert_eq!(
            supervisor.state(AgentId::Qbittorrent),
            AgentConnectionState::Connected
        );
    }

    #[tokio::test]
    async fn test_probe_failure_drops_session_without_retry() {
        let mut deluge = mock(AgentId::Deluge);
        deluge.expect_connect().times(1).returning(|| Ok(()));
        deluge
            .expect_probe()
            .times(1)
            .returning(|| Err(SpeedShareError::Connection("cookie expired".into())));

        let mut supervisor = ConnectionSupervisor::new(vec![Box::new(deluge)]);
        supervisor.ensure_connected().await;
        assert_eq!(
            supervisor.state(AgentId::Deluge),
            AgentConnectionState::Connected
        );

        // Second tick: probe fails, state drops, and connect is NOT retried
        // within the same pass (times(1) on connect enforces this).
        supervisor.ensure_connected().await;
        assert_eq!(
            supervisor.state(AgentId::Deluge),
            AgentConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_disconnected_agent_excluded_from_active_set() {
        let mut sab = mock(AgentId::Sabnzbd);
        sab.expect_connect()
            .returning(|| Err(SpeedShareError::Connection("down".into())));
        // is_active must never be called on a disconnected agent.
        sab.expect_is_active().times(0);

        let mut qbit = mock(AgentId::Qbittorrent);
        qbit.expect_connect().returning(|| Ok(()));
        qbit.expect_probe().returning(|| Ok(()));
        qbit.expect_is_active().returning(|| Ok(true));

        let mut supervisor = ConnectionSupervisor::new(vec![Box::new(sab), Box::new(qbit)]);
        supervisor.ensure_connected().await;
        let active = supervisor.poll_active().await;

        assert_eq!(active.len(), 1);
        assert!(active.contains(&AgentId::Qbittorrent));
    }

    #[tokio::test]
    async fn test_probe_error_is_fail_safe_inactive() {
        let mut qbit = mock(AgentId::Qbittorrent);
        qbit.expect_connect().returning(|| Ok(()));
        qbit.expect_is_active()
            .returning(|| Err(SpeedShareError::Protocol("garbled".into())));

        let mut supervisor = ConnectionSupervisor::new(vec![Box::new(qbit)]);
        supervisor.ensure_connected().await;
        let active = supervisor.poll_active().await;

        assert!(active.is_empty());
        // Protocol errors do not tear down the session.
        assert_eq!(
            supervisor.state(AgentId::Qbittorrent),
            AgentConnectionState::Connected
        );
    }

    #[tokio::test]
    async fn test_connection_error_during_poll_drops_session() {
        let mut deluge = mock(AgentId::Deluge);
        deluge.expect_connect().returning(|| Ok(()));
        deluge
            .expect_is_active()
            .returning(|| Err(SpeedShareError::Connection("reset".into())));

        let mut supervisor = ConnectionSupervisor::new(vec![Box::new(deluge)]);
        supervisor.ensure_connected().await;
        let active = supervisor.poll_active().await;

        assert!(active.is_empty());
        assert_eq!(
            supervisor.state(AgentId::Deluge),
            AgentConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_apply_skips_disconnected_and_swallows_failures() {
        let mut sab = mock(AgentId::Sabnzbd);
        sab.expect_connect()
            .returning(|| Err(SpeedShareError::Connection("down".into())));
        sab.expect_apply_limit().times(0);

        let mut deluge = mock(AgentId::Deluge);
        deluge.expect_connect().returning(|| Ok(()));
        deluge
            .expect_apply_limit()
            .times(1)
            .returning(|_| Err(SpeedShareError::Apply("plugin disabled".into())));

        let mut supervisor = ConnectionSupervisor::new(vec![Box::new(sab), Box::new(deluge)]);
        supervisor.ensure_connected().await;

        let allocation: Allocation = AgentId::ALL.iter().map(|id| (*id, 1000)).collect();
        // Must not panic or error despite one agent down and one apply failing.
        supervisor.apply(&allocation).await;
    }
}
