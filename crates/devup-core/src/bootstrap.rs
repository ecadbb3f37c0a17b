use crate::config::DevConfig;
use crate::installer::{self, InstallOutcome};
use crate::launcher::{self, Launch};
use crate::preflight;
use crate::signal::ShutdownLatch;
use crate::supervisor::{Outcome, Supervisor};
use crate::ui;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The full `devup start` pipeline: prerequisite check, installs, server
/// launch, supervision and shutdown.
#[derive(Debug)]
pub struct Bootstrap {
    config: DevConfig,
    root: PathBuf,
    latch: ShutdownLatch,
}

impl Bootstrap {
    pub fn new(config: DevConfig, root: &Path, latch: ShutdownLatch) -> Result<Self> {
        config.validate()?;
        let root = root
            .canonicalize()
            .with_context(|| format!("Project directory {} not found", root.display()))?;
        Ok(Self {
            config,
            root,
            latch,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run until the servers are shut down. Setup failures (missing
    /// manifests, failed installs, spawn errors) are returned as errors.
    pub fn run(&self) -> Result<Outcome> {
        ui::heading(&format!(
            "Starting {} development environment...",
            self.config.project.name
        ));
        ui::rule();
        tracing::info!(root = %self.root.display(), "bootstrapping");

        preflight::check(&self.root, &self.config.prerequisites.files)?;

        if installer::install_all(&self.config.install, &self.root, &self.latch)?
            == InstallOutcome::Interrupted
        {
            ui::hint("Interrupted, skipping remaining steps");
            return Ok(Outcome::Interrupted);
        }

        println!();
        ui::rule();
        ui::heading("Starting development servers...");

        let supervisor_config = &self.config.supervisor;
        let launch = launcher::launch(
            &self.config.servers(),
            &self.root,
            supervisor_config.startup_delay(),
            supervisor_config.shutdown_timeout(),
            &self.latch,
        )?;
        let processes = match launch {
            Launch::Started(processes) => processes,
            Launch::Interrupted => {
                ui::ok("Servers stopped successfully");
                return Ok(Outcome::Interrupted);
            }
        };

        self.print_ready();
        Supervisor::new(processes, self.latch.clone(), supervisor_config).run()
    }

    fn print_ready(&self) {
        println!();
        ui::rule();
        ui::ok("Development environment is ready!");
        for server in self.config.servers() {
            for link in &server.links {
                ui::link(&link.label, &link.url);
            }
        }
        println!();
        ui::hint("Press Ctrl+C to stop both servers");
        ui::rule();
    }
}
