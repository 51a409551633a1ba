// SPDX-License-Identifier: MIT

//! The reconstructed runner state model: what `CheckpointReplayer` folds a
//! checkpoint log into, and what queries read from.

use crate::enums::{ProcessState, TaskRunState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header written once per task at launch time by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHeader {
    pub task_id: String,
    pub user: String,
    pub hostname: String,
    pub launch_time_ms: u64,
    pub sandbox: String,
    pub log_dir: String,
    #[serde(default)]
    pub ports: HashMap<String, u16>,
}

/// One entry in the task's status history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub state: TaskRunState,
    pub timestamp_ms: u64,
}

/// One execution attempt of a named process, indexed by run number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRun {
    pub process: String,
    #[serde(default)]
    pub state: ProcessState,
    pub start_time_ms: Option<u64>,
    pub stop_time_ms: Option<u64>,
}

impl ProcessRun {
    pub fn new(process: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            state: ProcessState::default(),
            start_time_ms: None,
            stop_time_ms: None,
        }
    }
}

/// The runner's reconstructed state machine for one task: header plus the
/// ordered status and per-process run histories accumulated by replaying
/// its checkpoint log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerState {
    pub header: Option<TaskHeader>,
    pub statuses: Vec<StatusEntry>,
    pub processes: HashMap<String, Vec<ProcessRun>>,
}

impl RunnerState {
    /// The most recently appended status entry, if any.
    pub fn current_status(&self) -> Option<&StatusEntry> {
        self.statuses.last()
    }

    /// The launch status entry (first appended), if any.
    pub fn launch_status(&self) -> Option<&StatusEntry> {
        self.statuses.first()
    }
}

/// Per-process CPU/RAM snapshot for the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessSample {
    /// Fraction of a core consumed, averaged over the sampling window.
    pub cpu: f64,
    /// Resident memory in bytes.
    pub ram: u64,
}

/// Aggregated resource usage across a task's live process tree, plus its
/// sandbox disk footprint.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSample {
    pub process_sample: ProcessSample,
    pub disk_usage: u64,
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
