//! Run command — the foreground arbiter loop.

use std::path::Path;

use anyhow::{Context, Result};

use speedshare::config::Config;
use speedshare::manager::SpeedManager;

pub async fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load_from_path(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let mut manager = SpeedManager::from_config(&config);
    // Runs until the process is killed; all recoverable failures are
    // handled inside the loop.
    manager.run().await;
    Ok(())
}
