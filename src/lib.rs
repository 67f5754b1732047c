#![warn(missing_docs)]

//! Memstress is a manual memory stress tool: it allocates memory in fixed-size blocks, forces
//! the kernel to back every block with physical memory and never releases them, until the
//! system refuses to allocate more or the operator presses Ctrl+C.
//!
//! It's meant to observe how a machine behaves under memory pressure: swapping, the OOM killer
//! kicking in, monitoring alerts firing. Running out of memory is the expected end of a test,
//! and is not reported as an error.
//!
//! The `memstress` binary runs [`StressTest`] with the [default configuration][StressConfig],
//! which allocates 100 MiB every second.

pub mod block;
mod cancel;
mod config;
pub mod logging;
mod native;
mod report;
mod stress;

pub use crate::cancel::{Cancellation, InterruptError};
pub use crate::config::{
    ConfigError, DEFAULT_BLOCK_SIZE, DEFAULT_SLEEP_INTERVAL, StressConfig, StressConfigBuilder,
};
pub use crate::stress::{Outcome, StressError, StressTest, Summary};
