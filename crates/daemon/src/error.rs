// SPDX-License-Identifier: MIT

//! Daemon-crate error taxonomy, mirroring the teacher's `LifecycleError`.

use obs_core::ProcessState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine a state directory for the config file")]
    NoStateDir,

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// Raised by `TaskObserver`'s process-bucketing query when a
    /// process's latest run is in `ProcessState::Unknown` — a wire value
    /// this build does not recognize. A programming fault (§7), not a
    /// degrade-and-continue case.
    #[error("encountered an unexpected process state: {0:?}")]
    UnexpectedState(ProcessState),
}
