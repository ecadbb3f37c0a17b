use crate::config::SupervisorConfig;
use crate::process::ManagedProcess;
use crate::signal::ShutdownLatch;
use crate::ui;
use anyhow::Result;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why supervision ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// SIGINT/SIGTERM received; all servers were stopped on request.
    Interrupted,
    /// A server exited on its own; the others were stopped in response.
    ServerExited { name: String, status: ExitStatus },
}

impl Outcome {
    /// Whether this ending counts as a clean shutdown (exit code 0).
    pub fn is_clean(&self) -> bool {
        matches!(self, Outcome::Interrupted)
    }

    /// Line printed once every server has been stopped.
    pub fn shutdown_message(&self) -> &'static str {
        match self {
            Outcome::Interrupted => "Servers stopped successfully",
            Outcome::ServerExited { .. } => "Remaining servers stopped",
        }
    }
}

/// Polls the running servers until one dies or an interrupt arrives, then
/// shuts everything down.
pub struct Supervisor {
    processes: Vec<ManagedProcess>,
    latch: ShutdownLatch,
    poll_interval: Duration,
    shutdown_timeout: Duration,
}

impl Supervisor {
    pub fn new(processes: Vec<ManagedProcess>, latch: ShutdownLatch, config: &SupervisorConfig) -> Self {
        Self {
            processes,
            latch,
            poll_interval: config.poll_interval(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    pub fn run(mut self) -> Result<Outcome> {
        let outcome = self.watch()?;

        match &outcome {
            Outcome::Interrupted => {
                println!();
                ui::heading("Shutting down servers...");
            }
            Outcome::ServerExited { name, status } => {
                ui::failed(&format!("{} stopped unexpectedly ({})", name, status));
            }
        }

        shutdown(&mut self.processes, self.shutdown_timeout)?;
        ui::ok(outcome.shutdown_message());
        Ok(outcome)
    }

    fn watch(&mut self) -> Result<Outcome> {
        debug!(
            count = self.processes.len(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "supervising"
        );
        loop {
            if self.latch.is_triggered() {
                info!("interrupt received");
                return Ok(Outcome::Interrupted);
            }

            for process in &mut self.processes {
                if let Some(status) = process.try_exit()? {
                    // Ctrl+C also reaches the children; prefer the interrupt
                    // if it lands while we are polling.
                    if self.latch.is_triggered() {
                        return Ok(Outcome::Interrupted);
                    }
                    warn!(
                        name = %process.name(),
                        %status,
                        uptime_secs = process.uptime().as_secs(),
                        "server exited"
                    );
                    return Ok(Outcome::ServerExited {
                        name: process.name().to_string(),
                        status,
                    });
                }
            }

            self.latch.sleep(self.poll_interval);
        }
    }
}

/// Ask every process to stop, then wait for all of them, sharing one grace
/// period. Processes that already exited are skipped.
pub fn shutdown(processes: &mut [ManagedProcess], timeout: Duration) -> Result<()> {
    let mut first_err = None;

    for process in processes.iter_mut() {
        if process.try_exit().ok().flatten().is_none() {
            ui::stopping(process.name());
        }
        if let Err(e) = process.request_stop() {
            warn!(name = %process.name(), error = %e, "failed to request stop");
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }

    let deadline = Instant::now() + timeout;
    for process in processes.iter_mut() {
        if let Err(e) = process.wait_for_exit(deadline) {
            warn!(name = %process.name(), error = %e, "failed to wait for exit");
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use std::os::unix::process::ExitStatusExt;

    fn spawn(name: &str, script: &str) -> ManagedProcess {
        let spec = CommandSpec::new("sh", ["-c", script]);
        ManagedProcess::spawn(name, &spec, &std::env::temp_dir()).unwrap()
    }

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            startup_delay_ms: 0,
            poll_interval_ms: 50,
            shutdown_timeout_ms: 5000,
        }
    }

    #[test]
    fn interrupt_is_a_clean_outcome() {
        assert!(Outcome::Interrupted.is_clean());
        let exited = Outcome::ServerExited {
            name: "api".to_string(),
            status: ExitStatus::from_raw(256),
        };
        assert!(!exited.is_clean());
    }

    #[test]
    fn only_an_interrupt_reports_a_successful_stop() {
        assert_eq!(Outcome::Interrupted.shutdown_message(), "Servers stopped successfully");
        let exited = Outcome::ServerExited {
            name: "api".to_string(),
            status: ExitStatus::from_raw(256),
        };
        assert!(!exited.shutdown_message().contains("successfully"));
    }

    #[test]
    fn interrupt_terminates_both_servers() {
        let dir = tempfile::tempdir().unwrap();
        let api_marker = dir.path().join("api-term");
        let web_marker = dir.path().join("web-term");
        let api = spawn(
            "api",
            &format!("trap 'touch {}; exit 0' TERM; while true; do sleep 0.05; done", api_marker.display()),
        );
        let web = spawn(
            "web",
            &format!("trap 'touch {}; exit 0' TERM; while true; do sleep 0.05; done", web_marker.display()),
        );
        std::thread::sleep(Duration::from_millis(200));

        let latch = ShutdownLatch::new();
        let remote = latch.clone();
        let trigger = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            remote.trigger();
        });

        let outcome = Supervisor::new(vec![api, web], latch, &fast_config()).run().unwrap();
        trigger.join().unwrap();

        assert_eq!(outcome, Outcome::Interrupted);
        assert!(api_marker.exists());
        assert!(web_marker.exists());
    }

    #[test]
    fn unexpected_exit_stops_the_other_server() {
        let api = spawn("api", "sleep 0.2; exit 7");
        let web = spawn("web", "exec sleep 30");

        let outcome = Supervisor::new(vec![api, web], ShutdownLatch::new(), &fast_config())
            .run()
            .unwrap();

        match outcome {
            Outcome::ServerExited { name, status } => {
                assert_eq!(name, "api");
                assert_eq!(status.code(), Some(7));
            }
            Outcome::Interrupted => panic!("expected a server exit"),
        }
    }

    #[test]
    fn shutdown_skips_exited_processes() {
        let mut done = spawn("done", "exit 0");
        done.wait_for_exit(Instant::now() + Duration::from_secs(5)).unwrap();
        let running = spawn("running", "exec sleep 30");
        let mut procs = vec![done, running];

        shutdown(&mut procs, Duration::from_secs(5)).unwrap();
        assert_eq!(
            procs[1].try_exit().unwrap().and_then(|s| s.signal()),
            Some(nix::sys::signal::Signal::SIGTERM as i32)
        );
    }

    #[test]
    fn shutdown_of_nothing_is_ok() {
        shutdown(&mut [], Duration::from_secs(1)).unwrap();
    }
}
