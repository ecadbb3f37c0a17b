use crate::command::CommandSpec;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const EXIT_POLL: Duration = Duration::from_millis(50);

/// A spawned server process owned by the supervisor.
///
/// Dropping a `ManagedProcess` that is still running kills it, so an early
/// return never leaves an orphaned dev server behind.
#[derive(Debug)]
pub struct ManagedProcess {
    name: String,
    child: Child,
    started_at: Instant,
}

impl ManagedProcess {
    pub fn spawn(name: &str, spec: &CommandSpec, root: &Path) -> Result<Self> {
        let child = spec
            .to_command(root)
            .spawn()
            .with_context(|| format!("Failed to start {} (`{}`)", name, spec))?;
        debug!(name = %name, pid = child.id(), program = %spec.program, "spawned");
        Ok(Self {
            name: name.to_string(),
            child,
            started_at: Instant::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Non-blocking liveness check. `Some` once the child has exited.
    pub fn try_exit(&mut self) -> Result<Option<ExitStatus>> {
        self.child
            .try_wait()
            .with_context(|| format!("Failed to poll {}", self.name))
    }

    /// Ask the child to stop: SIGTERM on Unix, a hard kill elsewhere.
    /// No-op if it has already exited.
    pub fn request_stop(&mut self) -> Result<()> {
        if self.try_exit()?.is_some() {
            return Ok(());
        }

        self.signal_stop()
    }

    #[cfg(unix)]
    fn signal_stop(&mut self) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(self.child.id())
            .with_context(|| format!("Invalid pid for {}", self.name))?;
        debug!(name = %self.name, pid = raw, "sending SIGTERM");
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            // Exited between the poll and the signal.
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to signal {}", self.name)),
        }
    }

    #[cfg(not(unix))]
    fn signal_stop(&mut self) -> Result<()> {
        debug!(name = %self.name, pid = self.child.id(), "killing");
        self.child
            .kill()
            .with_context(|| format!("Failed to stop {}", self.name))
    }

    /// Wait for the child to exit, killing it outright once `deadline` passes.
    pub fn wait_for_exit(&mut self, deadline: Instant) -> Result<ExitStatus> {
        loop {
            if let Some(status) = self.try_exit()? {
                debug!(name = %self.name, %status, "exited");
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(
                    name = %self.name,
                    pid = self.child.id(),
                    "did not exit after termination request, killing"
                );
                self.child
                    .kill()
                    .with_context(|| format!("Failed to kill {}", self.name))?;
                return self
                    .child
                    .wait()
                    .with_context(|| format!("Failed to reap {}", self.name));
            }
            std::thread::sleep(EXIT_POLL);
        }
    }

    /// [`request_stop`](Self::request_stop) followed by
    /// [`wait_for_exit`](Self::wait_for_exit) with the given grace period.
    pub fn terminate(&mut self, timeout: Duration) -> Result<ExitStatus> {
        self.request_stop()?;
        self.wait_for_exit(Instant::now() + timeout)
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            warn!(name = %self.name, pid = self.child.id(), "dropped while running, killing");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
