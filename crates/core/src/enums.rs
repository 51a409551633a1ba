// SPDX-License-Identifier: MIT

//! Closed-variant enums for runner and process state, with an `Unknown`
//! fallback so a checkpoint record written by a newer runner never fails
//! to deserialize.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task as reported by the runner's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRunState {
    Active,
    Success,
    Failed,
    Killed,
    Lost,
    /// Any state code this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl TaskRunState {
    /// The name used in query results; matches the serde wire name.
    pub fn name(&self) -> &'static str {
        match self {
            TaskRunState::Active => "ACTIVE",
            TaskRunState::Success => "SUCCESS",
            TaskRunState::Failed => "FAILED",
            TaskRunState::Killed => "KILLED",
            TaskRunState::Lost => "LOST",
            TaskRunState::Unknown => "UNKNOWN",
        }
    }

    /// Whether this is a state a task settles into once finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskRunState::Success | TaskRunState::Failed | TaskRunState::Killed | TaskRunState::Lost
        )
    }
}

impl fmt::Display for TaskRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a single process run within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Waiting,
    Forked,
    Running,
    Success,
    Failed,
    Killed,
    Lost,
    #[serde(other)]
    Unknown,
}

impl ProcessState {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessState::Waiting => "WAITING",
            ProcessState::Forked => "FORKED",
            ProcessState::Running => "RUNNING",
            ProcessState::Success => "SUCCESS",
            ProcessState::Failed => "FAILED",
            ProcessState::Killed => "KILLED",
            ProcessState::Lost => "LOST",
            ProcessState::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::Success | ProcessState::Failed | ProcessState::Killed | ProcessState::Lost
        )
    }
}

impl Default for ProcessState {
    /// Absent/null run-state is treated as `WAITING`.
    fn default() -> Self {
        ProcessState::Waiting
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "enums_tests.rs"]
mod tests;
