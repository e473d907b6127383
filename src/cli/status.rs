//! Status command — one-shot probe of every client.
//!
//! Connects, polls activity once, and prints per-agent connectivity plus the
//! allocation the arbiter would apply. Never changes any client's limit.

use std::path::Path;

use anyhow::{Context, Result};

use speedshare::agents::AgentId;
use speedshare::config::Config;
use speedshare::manager::SpeedManager;
use speedshare::supervisor::AgentConnectionState;

pub async fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load_from_path(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let mut manager = SpeedManager::from_config(&config);
    let report = manager.inspect().await;

    println!(
        "budget: {} KiB/s, floor: {} KiB/s",
        config.speed.budget_kib, config.speed.floor_kib
    );
    println!();
    println!("{:<14} {:<14} {:<10} {}", "agent", "connection", "active", "would apply");
    for (id, state) in &report.states {
        let connection = match state {
            AgentConnectionState::Connected => "connected",
            AgentConnectionState::Disconnected => "disconnected",
        };
        let active = if report.active.contains(id) { "yes" } else { "no" };
        let rate = report
            .allocation
            .get(id)
            .map(|r| format!("{r} KiB/s"))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<14} {:<14} {:<10} {}", id.as_str(), connection, active, rate);
    }

    if report
        .states
        .iter()
        .all(|(_, s)| *s == AgentConnectionState::Disconnected)
    {
        println!();
        println!("no client reachable — check hosts, ports and credentials");
    }

    // Unconfigured hosts and credentials are the usual reasons an agent
    // never connects; point at them rather than leaving a bare "disconnected".
    let mut hints = Vec::new();
    for (id, host, credentials_set) in [
        (
            AgentId::Sabnzbd,
            config.sabnzbd.host.as_str(),
            !config.sabnzbd.api_key.is_empty(),
        ),
        (
            AgentId::Deluge,
            config.deluge.host.as_str(),
            !config.deluge.password.is_empty(),
        ),
        (
            AgentId::Qbittorrent,
            config.qbittorrent.host.as_str(),
            !config.qbittorrent.password.is_empty(),
        ),
    ] {
        if host.is_empty() {
            hints.push(format!("note: {} has no host configured", id.as_str()));
        }
        if !credentials_set {
            hints.push(format!("note: {} has no credentials configured", id.as_str()));
        }
    }
    if !hints.is_empty() {
        println!();
        for hint in hints {
            println!("{hint}");
        }
    }

    Ok(())
}
