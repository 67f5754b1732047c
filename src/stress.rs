//! The allocate-touch-retain loop.

use crate::block::{Allocation, BlockSource, RetainedBlocks, SystemAllocator};
use crate::cancel::Cancellation;
use crate::config::StressConfig;
use crate::report::Reporter;
use chrono::Local;
use log::{info, warn};
use std::io::{self, Write};

/// Reason why a stress run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The allocator refused a block: the maximum stress point was reached.
    Exhausted,
    /// The run was cancelled, usually by the operator pressing Ctrl+C.
    Cancelled,
}

/// Error happened while running a stress test.
///
/// Neither memory exhaustion nor cancellation are errors: they are the expected ways for a run
/// to end, and are reported through [`Summary::outcome`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StressError {
    /// Writing the report failed.
    #[error("failed to write the report: {0}")]
    Io(#[from] io::Error),
}

/// Result of a completed stress run.
///
/// The summary owns every block allocated during the run: they stay allocated until it's
/// dropped.
pub struct Summary {
    outcome: Outcome,
    attempts: u64,
    megabytes: u128,
    retained: RetainedBlocks,
}

impl Summary {
    /// Why the run stopped.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Number of allocations attempted, including the one that failed if any.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Whole megabytes held by the retained blocks.
    pub fn megabytes(&self) -> u128 {
        self.megabytes
    }

    /// The blocks retained during the run.
    pub fn retained(&self) -> &RetainedBlocks {
        &self.retained
    }
}

/// A memory stress test, allocating and retaining blocks until the memory is exhausted or the
/// test is cancelled.
///
/// ```no_run
/// # use memstress::{Cancellation, StressConfig, StressTest};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = StressTest::new(StressConfig::default(), std::io::stdout())
///     .cancellation(Cancellation::on_interrupt()?)
///     .run()?;
/// println!("reached {} MB", summary.megabytes());
/// # Ok(())
/// # }
/// ```
#[must_use = "call `.run()` to run the stress test"]
pub struct StressTest<S: BlockSource, W: Write> {
    config: StressConfig,
    source: S,
    cancellation: Cancellation,
    reporter: Reporter<W>,
}

impl<W: Write> StressTest<SystemAllocator, W> {
    /// Create a stress test allocating from the global allocator and reporting to `out`.
    ///
    /// The test can't be cancelled unless a flag is provided with
    /// [`cancellation`](StressTest::cancellation).
    pub fn new(config: StressConfig, out: W) -> Self {
        StressTest {
            config,
            source: SystemAllocator,
            cancellation: Cancellation::new(),
            reporter: Reporter::new(out),
        }
    }
}

impl<S: BlockSource, W: Write> StressTest<S, W> {
    /// Stop the test as soon as `cancellation` is cancelled.
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Allocate blocks from `source` instead of the global allocator.
    pub fn block_source<S2: BlockSource>(self, source: S2) -> StressTest<S2, W> {
        StressTest {
            config: self.config,
            source,
            cancellation: self.cancellation,
            reporter: self.reporter,
        }
    }

    /// Run the test until the memory is exhausted or the test is cancelled, then print the
    /// final report.
    pub fn run(mut self) -> Result<Summary, StressError> {
        let block_size = self.config.block_size();
        info!(
            "starting the stress test with blocks of {} bytes, pausing {:?} between them",
            block_size,
            self.config.sleep_interval()
        );
        self.reporter.start(&self.config)?;

        let mut retained = RetainedBlocks::new();
        let mut attempts: u64 = 0;
        let outcome = loop {
            if self.cancellation.is_cancelled() {
                break Outcome::Cancelled;
            }

            attempts += 1;
            self.reporter.attempt(Local::now().time(), attempts)?;

            let fresh = match self.source.allocate(block_size) {
                Allocation::Allocated(fresh) => fresh,
                Allocation::Exhausted => {
                    warn!("allocation of block {attempts} was refused");
                    break Outcome::Exhausted;
                }
            };
            if self.cancellation.is_cancelled() {
                break Outcome::Cancelled;
            }
            if retained.retain(fresh.touch()).is_err() {
                warn!("the list of retained blocks can't grow past {}", retained.len());
                break Outcome::Exhausted;
            }
            self.reporter.success(self.config.megabytes(retained.len()))?;

            if self.cancellation.sleep(self.config.sleep_interval()) {
                break Outcome::Cancelled;
            }
        };

        let megabytes = self.config.megabytes(retained.len());
        info!(
            "stress test ended ({:?}) after {} attempts, {} blocks retained",
            outcome,
            attempts,
            retained.len()
        );
        self.reporter.finish(outcome, megabytes)?;

        Ok(Summary {
            outcome,
            attempts,
            megabytes,
            retained,
        })
    }
}
