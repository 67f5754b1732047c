//! Diagnostic logging of memstress.
//!
//! The report of a stress test is always printed on the standard output. Log records emitted
//! through the [`log` crate][log] are diagnostics about the run, and are written to the standard
//! error by [`env_logger`][env_logger].
//!
//! [log]: https://crates.io/crates/log
//! [env_logger]: https://crates.io/crates/env_logger

use env_logger::{Builder, Env, Logger};
use std::sync::Once;

static INIT_LOGS: Once = Once::new();

/// Initialize the default logger, showing only warnings and errors.
///
/// The `RUST_LOG` environment variable can be used to show more records, for example
/// `RUST_LOG=memstress=debug`.
pub fn init() {
    let logger = Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .build();
    init_with(logger);
}

/// Initialize memstress logging with a custom `env_logger` logger.
///
/// Only the first call installs a logger: subsequent calls, and calls made after another logger
/// was installed by someone else, are ignored.
pub fn init_with(logger: Logger) {
    INIT_LOGS.call_once(|| {
        let max_level = logger.filter();
        if log::set_boxed_logger(Box::new(logger)).is_ok() {
            log::set_max_level(max_level);
        }
    });
}
