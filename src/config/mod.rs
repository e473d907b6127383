//! Configuration management for SpeedShare
//!
//! Configuration is loaded from `~/.speedshare/config.json` with environment
//! variable overrides (`SPEEDSHARE_*`). The loaded [`Config`] is immutable:
//! it is built once at startup and passed by reference into the manager and
//! adapters.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, SpeedShareError};

impl Config {
    /// Returns the SpeedShare configuration directory path (~/.speedshare)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".speedshare")
    }

    /// Returns the path to the config file (~/.speedshare/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Write this configuration to a path, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Variables follow the pattern `SPEEDSHARE_SECTION_KEY`, mirroring the
    /// JSON structure. Credentials are the usual candidates here so the
    /// config file can stay secret-free.
    fn apply_env_overrides(&mut self) {
        // SABnzbd
        if let Ok(val) = std::env::var("SPEEDSHARE_SABNZBD_HOST") {
            self.sabnzbd.host = val;
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_SABNZBD_PORT") {
            if let Ok(v) = val.parse() {
                self.sabnzbd.port = v;
            }
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_SABNZBD_API_KEY") {
            self.sabnzbd.api_key = val;
        }

        // Deluge
        if let Ok(val) = std::env::var("SPEEDSHARE_DELUGE_HOST") {
            self.deluge.host = val;
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_DELUGE_PORT") {
            if let Ok(v) = val.parse() {
                self.deluge.port = v;
            }
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_DELUGE_PASSWORD") {
            self.deluge.password = val;
        }

        // qBittorrent
        if let Ok(val) = std::env::var("SPEEDSHARE_QBITTORRENT_HOST") {
            self.qbittorrent.host = val;
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_QBITTORRENT_PORT") {
            if let Ok(v) = val.parse() {
                self.qbittorrent.port = v;
            }
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_QBITTORRENT_USERNAME") {
            self.qbittorrent.username = val;
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_QBITTORRENT_PASSWORD") {
            self.qbittorrent.password = val;
        }

        // Speed settings
        if let Ok(val) = std::env::var("SPEEDSHARE_SPEED_BUDGET_KIB") {
            if let Ok(v) = val.parse() {
                self.speed.budget_kib = v;
            }
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_SPEED_FLOOR_KIB") {
            if let Ok(v) = val.parse() {
                self.speed.floor_kib = v;
            }
        }
        if let Ok(val) = std::env::var("SPEEDSHARE_SPEED_TICK_SECS") {
            if let Ok(v) = val.parse() {
                self.speed.tick_secs = v;
            }
        }
    }

    /// Reject configurations the loop cannot run with.
    fn validate(&self) -> Result<()> {
        if self.speed.budget_kib == 0 {
            return Err(SpeedShareError::Config(
                "speed.budget_kib must be nonzero".to_string(),
            ));
        }
        if self.speed.tick_secs == 0 {
            return Err(SpeedShareError::Config(
                "speed.tick_secs must be nonzero".to_string(),
            ));
        }
        if self.speed.request_timeout_secs == 0 {
            return Err(SpeedShareError::Config(
                "speed.request_timeout_secs must be nonzero".to_string(),
            ));
        }
        for (agent, port) in [
            ("sabnzbd", self.sabnzbd.port),
            ("deluge", self.deluge.port),
            ("qbittorrent", self.qbittorrent.port),
        ] {
            if port == 0 {
                return Err(SpeedShareError::Config(format!(
                    "{agent}.port must be nonzero"
                )));
            }
        }
        if self.speed.budget_kib < self.speed.floor_kib {
            warn!(
                budget_kib = self.speed.budget_kib,
                floor_kib = self.speed.floor_kib,
                "budget is below the floor; inactive agents will be allowed more than active ones"
            );
        }
        Ok(())
    }
}
