#![allow(dead_code)]

use log::LevelFilter;
use memstress::block::{Allocation, BlockSource, SystemAllocator};
use memstress::{Cancellation, StressConfig};
use std::time::Duration;

pub(crate) const MIB: usize = 1024 * 1024;

pub(crate) fn init_logs() {
    let env = env_logger::Builder::new()
        .filter_module("memstress", LevelFilter::Debug)
        .format_timestamp(None)
        .is_test(true)
        .build();
    memstress::logging::init_with(env);
}

/// Configuration without pauses, so tests don't have to wait between allocations.
pub(crate) fn config(block_size: usize) -> StressConfig {
    StressConfig::builder()
        .block_size(block_size)
        .sleep_interval(Duration::ZERO)
        .build()
        .unwrap()
}

/// Block source wrapping the global allocator, scripting what happens at a given attempt.
pub(crate) struct Scripted {
    attempts: u64,
    fail_at: Option<u64>,
    cancel_at: Option<(u64, Cancellation)>,
}

impl Scripted {
    pub(crate) fn new() -> Self {
        Scripted {
            attempts: 0,
            fail_at: None,
            cancel_at: None,
        }
    }

    /// Refuse the allocation number `attempt`.
    pub(crate) fn fail_at(mut self, attempt: u64) -> Self {
        self.fail_at = Some(attempt);
        self
    }

    /// Cancel `cancellation` while performing the allocation number `attempt`.
    pub(crate) fn cancel_at(mut self, attempt: u64, cancellation: &Cancellation) -> Self {
        self.cancel_at = Some((attempt, cancellation.clone()));
        self
    }

    pub(crate) fn attempts(&self) -> u64 {
        self.attempts
    }
}

impl BlockSource for Scripted {
    fn allocate(&mut self, size: usize) -> Allocation {
        self.attempts += 1;
        if let Some((attempt, cancellation)) = &self.cancel_at {
            if *attempt == self.attempts {
                cancellation.cancel();
            }
        }
        if self.fail_at == Some(self.attempts) {
            return Allocation::Exhausted;
        }
        SystemAllocator.allocate(size)
    }
}

/// Strip the `[HH:MM:SS] ` prefix from every progress line of the report.
pub(crate) fn strip_timestamps(report: &str) -> String {
    report
        .lines()
        .map(|line| match line.strip_prefix('[') {
            Some(rest) if rest.as_bytes().get(8) == Some(&b']') => &rest[10..],
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
