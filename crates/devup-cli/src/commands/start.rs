use anyhow::{bail, Result};
use devup_core::{Bootstrap, DevConfig, Outcome, ShutdownLatch};
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let (config, root) = DevConfig::locate(config_path)?;

    // Installed before anything is spawned so Ctrl+C during installs is
    // observed rather than killing devup outright.
    let latch = ShutdownLatch::install()?;

    match Bootstrap::new(config, &root, latch)?.run()? {
        Outcome::Interrupted => Ok(()),
        Outcome::ServerExited { name, status } => {
            bail!("{} stopped unexpectedly ({})", name, status)
        }
    }
}
