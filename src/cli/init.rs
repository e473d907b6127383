//! Init command — write a default config file.

use std::path::Path;

use anyhow::{bail, Context, Result};

use speedshare::config::Config;

pub fn execute(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = Config::default();
    config
        .save_to_path(config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("wrote {}", config_path.display());
    println!("fill in each client's host, port and credentials, then run `speedshare run`");
    Ok(())
}
