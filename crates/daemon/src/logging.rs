// SPDX-License-Identifier: MIT

//! Logging (C9): one `tracing` subscriber installed at process start,
//! mirroring the teacher's `setup_logging` — `EnvFilter` plus an `fmt`
//! layer, pretty or JSON depending on config. Unlike the teacher's
//! daemon this crate has no log rotation to do, so there is no file
//! appender: output goes to stderr, leaving stdout free for query
//! results in the CLI front-end.

use crate::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Call once, at process start.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format.as_str() {
        "json" => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        _ => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}
