//! Human-readable progress report printed on the standard output.

use crate::config::{BYTES_PER_MB, StressConfig};
use crate::stress::Outcome;
use chrono::NaiveTime;
use std::io::{self, Write};

const SEPARATOR: &str = "--------------------------------------------------";

/// Writer of the stress test report.
///
/// Every method flushes the underlying writer, so partial lines (like the one announcing an
/// allocation) are visible while the allocation is still in progress.
pub(crate) struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    /// Create a reporter writing to `out`.
    pub(crate) fn new(out: W) -> Self {
        Reporter { out }
    }

    /// Print the banner announcing the start of the test.
    pub(crate) fn start(&mut self, config: &StressConfig) -> io::Result<()> {
        writeln!(self.out, "--- STARTING MEMORY STRESS TEST ---")?;
        writeln!(
            self.out,
            "Allocating memory in blocks of {} MB.",
            config.block_size() as u128 / BYTES_PER_MB
        )?;
        writeln!(self.out, "Press Ctrl+C to stop the test at any time.")?;
        writeln!(self.out, "{SEPARATOR}")?;
        self.out.flush()
    }

    /// Announce the allocation of block number `block`, without ending the line.
    pub(crate) fn attempt(&mut self, time: NaiveTime, block: u64) -> io::Result<()> {
        write!(
            self.out,
            "[{}] Allocating block {block}...",
            time.format("%H:%M:%S")
        )?;
        self.out.flush()
    }

    /// Complete the line of the last attempt, reporting the megabytes retained so far.
    pub(crate) fn success(&mut self, total_mb: u128) -> io::Result<()> {
        writeln!(self.out, " SUCCESS. Total allocated: {total_mb} MB")?;
        self.out.flush()
    }

    /// Print why the test ended, followed by the final total and the closing banner.
    pub(crate) fn finish(&mut self, outcome: Outcome, total_mb: u128) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "{SEPARATOR}")?;
        match outcome {
            Outcome::Exhausted => {
                writeln!(
                    self.out,
                    "MEMORY ERROR: the operating system could not allocate more memory."
                )?;
                writeln!(self.out, "This is the maximum stress point reached.")?;
            }
            Outcome::Cancelled => {
                writeln!(self.out, "TEST INTERRUPTED BY USER.")?;
            }
        }
        writeln!(
            self.out,
            "Test finished. Total memory that remained allocated: {total_mb} MB."
        )?;
        writeln!(self.out, "--- END OF STRESS TEST ---")?;
        self.out.flush()
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.out
    }
}
