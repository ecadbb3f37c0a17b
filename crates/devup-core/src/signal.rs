use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity at which interruptible sleeps re-check the latch.
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shutdown flag tripped by SIGINT/SIGTERM.
///
/// The OS handler only flips the flag; the control thread polls it between
/// sleeps and does the actual shutdown work.
#[derive(Debug, Clone, Default)]
pub struct ShutdownLatch {
    flag: Arc<AtomicBool>,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a latch and register it as the process-wide Ctrl+C handler.
    /// Can only succeed once per process.
    pub fn install() -> Result<Self> {
        let latch = Self::new();
        let handle = latch.clone();
        ctrlc::set_handler(move || handle.trigger())
            .context("Failed to install interrupt handler")?;
        tracing::debug!("interrupt handler installed");
        Ok(latch)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for `total`, waking early if the latch trips.
    /// Returns `true` if the sleep was interrupted.
    pub fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.is_triggered() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
