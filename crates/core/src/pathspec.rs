// SPDX-License-Identifier: MIT

//! Pure filesystem path derivation for the checkpoint tree.
//!
//! `PathSpec` never touches the filesystem. It is a small immutable value
//! that accumulates bound keys (`task_id`, `state`, `process`, `run`,
//! `log_dir`) via [`PathSpec::given`] and turns a [`PathKind`] into a
//! concrete path via [`PathSpec::getpath`]. Requesting a kind without its
//! required keys bound is a programming fault, not a runtime condition —
//! it returns [`PathSpecError::MissingKey`] rather than panicking so
//! callers can decide how to treat it.

use std::path::PathBuf;
use thiserror::Error;

/// The state subtree a task currently lives under on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTreeState {
    Active,
    Finished,
}

impl TaskTreeState {
    pub fn dirname(&self) -> &'static str {
        match self {
            TaskTreeState::Active => "active",
            TaskTreeState::Finished => "finished",
        }
    }
}

/// The kind of path to derive. Each variant documents the keys it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// `<root>/tasks/<state>/<task_id>` — needs `task_id`, `state`.
    TaskPath,
    /// `<root>/checkpoints/<task_id>/runner` — needs `task_id`.
    RunnerCheckpoint,
    /// `<log_dir>/<process>/<run>` — needs `log_dir`, `process`, `run`.
    ProcessLogDir,
    /// `<log_dir>/<process>/<run>/stdout` — needs `log_dir`, `process`, `run`.
    ProcessStdout,
    /// `<log_dir>/<process>/<run>/stderr` — needs `log_dir`, `process`, `run`.
    ProcessStderr,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSpecError {
    #[error("path kind {kind:?} requires key `{key}` but it was not bound")]
    MissingKey { kind: PathKind, key: &'static str },
}

/// Immutable, pure path-derivation spec. Clone + bind via [`given`](Self::given).
#[derive(Debug, Clone)]
pub struct PathSpec {
    root: PathBuf,
    task_id: Option<String>,
    state: Option<TaskTreeState>,
    process: Option<String>,
    run: Option<usize>,
    log_dir: Option<PathBuf>,
}

impl PathSpec {
    /// Create a spec rooted at the checkpoint directory. No other keys bound.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            task_id: None,
            state: None,
            process: None,
            run: None,
            log_dir: None,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Return a new spec with `task_id` bound, leaving all other keys intact.
    pub fn given_task_id(&self, task_id: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.task_id = Some(task_id.into());
        next
    }

    pub fn given_state(&self, state: TaskTreeState) -> Self {
        let mut next = self.clone();
        next.state = Some(state);
        next
    }

    pub fn given_process(&self, process: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.process = Some(process.into());
        next
    }

    pub fn given_run(&self, run: usize) -> Self {
        let mut next = self.clone();
        next.run = Some(run);
        next
    }

    pub fn given_log_dir(&self, log_dir: impl Into<PathBuf>) -> Self {
        let mut next = self.clone();
        next.log_dir = Some(log_dir.into());
        next
    }

    /// Derive the filesystem path for `kind` from the keys bound so far.
    pub fn getpath(&self, kind: PathKind) -> Result<PathBuf, PathSpecError> {
        match kind {
            PathKind::TaskPath => {
                let task_id = self.require_task_id(kind)?;
                let state = self.state.ok_or(PathSpecError::MissingKey {
                    kind,
                    key: "state",
                })?;
                Ok(self.root.join("tasks").join(state.dirname()).join(task_id))
            }
            PathKind::RunnerCheckpoint => {
                let task_id = self.require_task_id(kind)?;
                Ok(self.root.join("checkpoints").join(task_id).join("runner"))
            }
            PathKind::ProcessLogDir => self.process_log_dir(kind),
            PathKind::ProcessStdout => Ok(self.process_log_dir(kind)?.join("stdout")),
            PathKind::ProcessStderr => Ok(self.process_log_dir(kind)?.join("stderr")),
        }
    }

    fn process_log_dir(&self, kind: PathKind) -> Result<PathBuf, PathSpecError> {
        let log_dir = self.log_dir.as_ref().ok_or(PathSpecError::MissingKey {
            kind,
            key: "log_dir",
        })?;
        let process = self.process.as_deref().ok_or(PathSpecError::MissingKey {
            kind,
            key: "process",
        })?;
        let run = self.run.ok_or(PathSpecError::MissingKey { kind, key: "run" })?;
        Ok(log_dir.join(process).join(run.to_string()))
    }

    fn require_task_id(&self, kind: PathKind) -> Result<&str, PathSpecError> {
        self.task_id
            .as_deref()
            .ok_or(PathSpecError::MissingKey {
                kind,
                key: "task_id",
            })
    }
}

#[cfg(test)]
#[path = "pathspec_tests.rs"]
mod tests;
