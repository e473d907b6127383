//! Configuration type definitions for SpeedShare
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a partially filled config file still loads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct for SpeedShare.
///
/// Constructed once at startup and passed by reference into the manager and
/// adapters; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SABnzbd connection settings
    pub sabnzbd: SabnzbdConfig,
    /// Deluge connection settings
    pub deluge: DelugeConfig,
    /// qBittorrent connection settings
    pub qbittorrent: QbittorrentConfig,
    /// Speed arbitration settings (budget, floor, cadence)
    pub speed: SpeedConfig,
    /// Directories that must contain content before clients are polled.
    /// Empty means "always poll".
    pub watched_folders: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sabnzbd: SabnzbdConfig::default(),
            deluge: DelugeConfig::default(),
            qbittorrent: QbittorrentConfig::default(),
            speed: SpeedConfig::default(),
            watched_folders: Vec::new(),
        }
    }
}

// ============================================================================
// Per-agent connection settings
// ============================================================================

/// SABnzbd connection settings (query-style HTTP API, API key auth).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SabnzbdConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
}

impl Default for SabnzbdConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: String::new(),
        }
    }
}

/// Deluge web JSON-RPC connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelugeConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Torrent state used to filter `core.get_torrents_status`. This is
    /// Deluge's own status vocabulary; kept as data so a daemon-side rename
    /// is a config edit, not a rebuild.
    pub active_state: String,
}

impl Default for DelugeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8112,
            password: String::new(),
            active_state: "Downloading".to_string(),
        }
    }
}

/// qBittorrent Web API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QbittorrentConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Torrent states that count as "not actually transferring" even when
    /// qBittorrent lists them under the downloading filter. qBittorrent's
    /// status vocabulary, kept as configuration data.
    pub inactive_states: Vec<String>,
}

impl Default for QbittorrentConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            username: "admin".to_string(),
            password: String::new(),
            inactive_states: vec!["pausedDL".to_string(), "stoppedDL".to_string()],
        }
    }
}

// ============================================================================
// Arbitration settings
// ============================================================================

/// Bandwidth budget and loop cadence. All rates are KiB/s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Total download bandwidth to divide among active clients (KiB/s).
    pub budget_kib: u64,
    /// Per-client limit applied while a client is inactive, or to everyone
    /// when nothing is downloading (KiB/s).
    pub floor_kib: u64,
    /// Seconds between arbiter ticks.
    pub tick_secs: u64,
    /// Seconds to back off after an unexpected loop-level error.
    pub error_backoff_secs: u64,
    /// Per-request timeout for every client API call, in seconds. Bounds how
    /// long one unresponsive client can hold up a tick.
    pub request_timeout_secs: u64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            budget_kib: 3000,
            floor_kib: 1000,
            tick_secs: 5,
            error_backoff_secs: 15,
            request_timeout_secs: 5,
        }
    }
}
