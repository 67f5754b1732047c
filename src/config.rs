//! Configuration of a stress run.

use std::time::Duration;

/// Size of every block allocated by a default run: 100 MiB.
pub const DEFAULT_BLOCK_SIZE: usize = 100 * 1024 * 1024;

/// Pause between two allocations of a default run.
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) const BYTES_PER_MB: u128 = 1024 * 1024;

/// Error returned by [`StressConfigBuilder::build`] when the configuration can't be used.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// Blocks must contain at least one byte, otherwise there is nothing to touch.
    #[error("the block size must be greater than zero")]
    ZeroBlockSize,
    /// The global allocator can't describe allocations bigger than `isize::MAX` bytes.
    #[error("a block size of {0} bytes exceeds the maximum allocation size")]
    BlockSizeTooLarge(usize),
}

/// Fixed parameters of a stress run.
///
/// Both values are decided before the run starts and never change while it's in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    block_size: usize,
    sleep_interval: Duration,
}

impl StressConfig {
    /// Create a builder starting from the default configuration.
    pub fn builder() -> StressConfigBuilder {
        StressConfigBuilder::new()
    }

    /// Size in bytes of every allocated block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Pause between two consecutive allocations.
    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    /// Whole megabytes held by `blocks` blocks of the configured size.
    pub fn megabytes(&self, blocks: usize) -> u128 {
        blocks as u128 * self.block_size as u128 / BYTES_PER_MB
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            sleep_interval: DEFAULT_SLEEP_INTERVAL,
        }
    }
}

/// Builder of a [`StressConfig`].
#[must_use = "call `.build()` to get the configuration"]
pub struct StressConfigBuilder {
    block_size: usize,
    sleep_interval: Duration,
}

impl StressConfigBuilder {
    /// Create a builder initialized with [`DEFAULT_BLOCK_SIZE`] and [`DEFAULT_SLEEP_INTERVAL`].
    pub fn new() -> Self {
        StressConfigBuilder {
            block_size: DEFAULT_BLOCK_SIZE,
            sleep_interval: DEFAULT_SLEEP_INTERVAL,
        }
    }

    /// Set the size in bytes of every block allocated during the run.
    pub fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Set the pause between two allocations. A zero duration disables the pause, which is
    /// mostly useful in tests.
    pub fn sleep_interval(mut self, interval: Duration) -> Self {
        self.sleep_interval = interval;
        self
    }

    /// Validate the values and build the configuration.
    pub fn build(self) -> Result<StressConfig, ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.block_size > isize::MAX as usize {
            return Err(ConfigError::BlockSizeTooLarge(self.block_size));
        }
        Ok(StressConfig {
            block_size: self.block_size,
            sleep_interval: self.sleep_interval,
        })
    }
}
