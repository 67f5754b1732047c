//! Cooperative cancellation of a stress run.

use crate::native;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest time a pause keeps sleeping without looking at the cancellation flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Called by the platform signal handler.
pub(crate) fn interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Error happened while installing the interrupt handler.
#[derive(Debug, thiserror::Error)]
#[cfg_attr(unix, error("failed to install the SIGINT handler: {errno}"))]
#[cfg_attr(
    not(unix),
    error("failed to install the console control handler (error code {code})")
)]
pub struct InterruptError {
    #[cfg(unix)]
    pub(crate) errno: nix::errno::Errno,
    #[cfg(not(unix))]
    pub(crate) code: u32,
}

#[derive(Clone)]
enum Flag {
    Interrupt,
    Local(Arc<AtomicBool>),
}

/// Flag telling a stress run to stop at the next opportunity.
///
/// The run polls the flag between its steps: cancellation is observed within one iteration, and
/// pauses are cut short, but an allocation already in progress is never interrupted midway.
#[derive(Clone)]
pub struct Cancellation {
    flag: Flag,
}

impl Cancellation {
    /// Create a flag which is only cancelled by calling [`Cancellation::cancel`].
    pub fn new() -> Self {
        Cancellation {
            flag: Flag::Local(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Install a handler for the interrupt signal (Ctrl+C) and return the flag it sets.
    ///
    /// The handler replaces the default behavior of terminating the process. Calling this more
    /// than once is fine, every returned value observes the same flag.
    pub fn on_interrupt() -> Result<Self, InterruptError> {
        native::install_interrupt_handler()?;
        Ok(Self::interrupt_flag())
    }

    pub(crate) fn interrupt_flag() -> Self {
        Cancellation {
            flag: Flag::Interrupt,
        }
    }

    fn atomic(&self) -> &AtomicBool {
        match &self.flag {
            Flag::Interrupt => &INTERRUPTED,
            Flag::Local(flag) => flag,
        }
    }

    /// Request cancellation. Every clone of this value observes it.
    pub fn cancel(&self) {
        self.atomic().store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.atomic().load(Ordering::SeqCst)
    }

    /// Block the current thread for `duration`, waking up early if cancellation is requested.
    ///
    /// Returns `true` if the pause ended because of cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let cancellation = Cancellation::new();
        let clone = cancellation.clone();
        assert!(!clone.is_cancelled());

        cancellation.cancel();
        assert!(clone.is_cancelled());
        assert!(!Cancellation::new().is_cancelled());
    }

    #[test]
    fn test_sleep_runs_to_completion() {
        let start = Instant::now();
        assert!(!Cancellation::new().sleep(Duration::from_millis(120)));
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_sleep_zero() {
        assert!(!Cancellation::new().sleep(Duration::ZERO));
    }

    #[test]
    fn test_sleep_returns_immediately_when_cancelled() {
        let cancellation = Cancellation::new();
        cancellation.cancel();

        let start = Instant::now();
        assert!(cancellation.sleep(Duration::from_secs(60)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_is_interrupted() {
        let cancellation = Cancellation::new();
        let remote = cancellation.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(cancellation.sleep(Duration::from_secs(60)));
        assert!(start.elapsed() < Duration::from_secs(10));
        canceller.join().unwrap();
    }
}
