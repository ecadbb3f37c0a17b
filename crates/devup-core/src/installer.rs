use crate::config::InstallStep;
use crate::signal::ShutdownLatch;
use crate::ui;
use anyhow::{bail, Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Completed,
    /// An interrupt arrived; the remaining steps were skipped.
    Interrupted,
}

/// Run every install step in order, stopping at the first failure.
pub fn install_all(
    steps: &[InstallStep],
    root: &Path,
    latch: &ShutdownLatch,
) -> Result<InstallOutcome> {
    for step in steps {
        if latch.is_triggered() {
            return Ok(InstallOutcome::Interrupted);
        }
        if let Err(e) = run_step(step, root) {
            // A Ctrl+C reaches the installer too, so its failure is expected.
            if latch.is_triggered() {
                return Ok(InstallOutcome::Interrupted);
            }
            ui::failed(&format!("{:#}", e));
            return Err(e);
        }
    }
    Ok(InstallOutcome::Completed)
}

fn run_step(step: &InstallStep, root: &Path) -> Result<()> {
    ui::installing(&format!("{}...", step.name));
    tracing::debug!(step = %step.name, command = %step.command, "running install step");

    let status = step
        .command
        .to_command(root)
        .status()
        .with_context(|| format!("Failed to run `{}`", step.command));

    match status {
        Ok(s) if s.success() => {
            ui::ok(&format!("{} installed successfully", step.name));
            Ok(())
        }
        Ok(s) => bail!("Failed to install {} (`{}` exited with {})", step.name, step.command, s),
        Err(e) => Err(e.context(format!("Failed to install {}", step.name))),
    }
}
