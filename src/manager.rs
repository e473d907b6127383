//! Arbiter control loop
//!
//! [`SpeedManager`] ties the gate, the connection supervisor, and the
//! arbitration math together on a fixed cadence. One tick is strictly
//! sequential: gate, reconnect pass, activity poll, debounce, allocate,
//! apply. The cadence (seconds) vastly exceeds call latency, so nothing runs
//! concurrently and the only state carried across ticks is the previously
//! applied active set plus the supervisor's sessions.
//!
//! The loop never exits voluntarily: component-level failures are absorbed
//! below this layer, and anything unanticipated that still surfaces is
//! logged and answered with a longer backoff before the next tick.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::agents::{AgentId, DelugeAdapter, QbittorrentAdapter, SabnzbdAdapter};
use crate::arbiter::{allocate, Allocation};
use crate::config::{Config, SpeedConfig};
use crate::error::Result;
use crate::supervisor::{AgentConnectionState, ConnectionSupervisor};
use crate::watchdir::Gate;

/// What a single tick did, mostly for tests and one-shot status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Watched folders were configured and empty; nothing was polled.
    Gated,
    /// The active set matched the previously applied one; apply skipped.
    Unchanged,
    /// A new allocation was computed and pushed to the agents.
    Applied(Allocation),
}

/// One-shot view of the system for `speedshare status`.
#[derive(Debug)]
pub struct StatusReport {
    pub states: Vec<(AgentId, AgentConnectionState)>,
    pub active: BTreeSet<AgentId>,
    pub allocation: Allocation,
}

/// The arbiter control loop.
pub struct SpeedManager {
    supervisor: ConnectionSupervisor,
    gate: Gate,
    speed: SpeedConfig,
    /// Active set at the last tick an allocation was applied. `None` until
    /// the first apply, so the first observation always applies.
    previous_active: Option<BTreeSet<AgentId>>,
}

impl SpeedManager {
    /// Wire up the three real adapters from configuration.
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.speed.request_timeout_secs);
        let supervisor = ConnectionSupervisor::new(vec![
            Box::new(SabnzbdAdapter::new(config.sabnzbd.clone(), timeout)),
            Box::new(DelugeAdapter::new(config.deluge.clone(), timeout)),
            Box::new(QbittorrentAdapter::new(config.qbittorrent.clone(), timeout)),
        ]);
        Self::new(
            supervisor,
            Gate::new(config.watched_folders.clone()),
            config.speed.clone(),
        )
    }

    /// Assemble from parts. Tests inject mock adapters through here.
    pub fn new(supervisor: ConnectionSupervisor, gate: Gate, speed: SpeedConfig) -> Self {
        Self {
            supervisor,
            gate,
            speed,
            previous_active: None,
        }
    }

    /// Run one tick: gate, reconnect, poll, debounce, allocate, apply.
    pub async fn tick_once(&mut self) -> Result<TickOutcome> {
        if !self.gate.should_poll() {
            debug!("watched folders empty, skipping tick");
            return Ok(TickOutcome::Gated);
        }

        self.supervisor.ensure_connected().await;
        let active = self.supervisor.poll_active().await;

        if self.previous_active.as_ref() == Some(&active) {
            debug!(active = ?active, "active set unchanged, apply skipped");
            return Ok(TickOutcome::Unchanged);
        }

        let allocation = allocate(&active, self.speed.budget_kib, self.speed.floor_kib);
        info!(
            active = active.len(),
            allocation = ?allocation,
            "active set changed, applying new limits"
        );
        self.supervisor.apply(&allocation).await;
        self.previous_active = Some(active);

        Ok(TickOutcome::Applied(allocation))
    }

    /// Observe without applying: reconnect, poll, and compute what the
    /// allocation would be. Used by the status command; does not touch the
    /// debounce state or the agents' limits.
    pub async fn inspect(&mut self) -> StatusReport {
        self.supervisor.ensure_connected().await;
        let active = self.supervisor.poll_active().await;
        let allocation = allocate(&active, self.speed.budget_kib, self.speed.floor_kib);
        let states = AgentId::ALL
            .iter()
            .map(|id| (*id, self.supervisor.state(*id)))
            .collect();
        StatusReport {
            states,
            active,
            allocation,
        }
    }

    /// Run the loop forever. Errors escaping a tick are logged and answered
    /// with the extended backoff; the process is never exited from here.
    pub async fn run(&mut self) {
        info!(
            budget_kib = self.speed.budget_kib,
            floor_kib = self.speed.floor_kib,
            tick_secs = self.speed.tick_secs,
            "speed manager started"
        );
        loop {
            let sleep_secs = match self.tick_once().await {
                Ok(_) => self.speed.tick_secs,
                Err(e) => {
                    error!(error = %e, "tick failed unexpectedly, backing off");
                    self.speed.error_backoff_secs
                }
            };
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
        }
    }
}
