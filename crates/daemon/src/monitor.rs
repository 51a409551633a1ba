// SPDX-License-Identifier: MIT

//! `TaskMonitor` (C4): an incremental reader over one active task's runner
//! checkpoint. Resumes from the last byte offset on each call instead of
//! re-reading the whole file, reusing the exact fold semantics
//! `obs_storage::CheckpointReplayer` uses for a one-shot replay.

use obs_core::{ProcessState, RunnerState, TaskStateSource};
use obs_storage::{decode_from, fold_events};
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

struct Cursor {
    offset: usize,
    state: RunnerState,
}

/// Thread-safe, incremental checkpoint reader for one task. `get_state`
/// serializes internally, satisfying the contract that it may be called
/// concurrently from the reconciliation thread and from query handlers.
pub struct TaskMonitor {
    path: PathBuf,
    cursor: Mutex<Cursor>,
}

impl TaskMonitor {
    pub fn new(runner_checkpoint_path: PathBuf) -> Self {
        Self {
            path: runner_checkpoint_path,
            cursor: Mutex::new(Cursor {
                offset: 0,
                state: RunnerState::default(),
            }),
        }
    }

    /// A snapshot of the folded state, consistent as of some instant no
    /// later than this call. Reads only the bytes appended since the last
    /// call; if the file shrank (rewritten from scratch) the cursor resets
    /// and the state is rebuilt from the start.
    pub fn get_state(&self) -> RunnerState {
        let mut cursor = self.cursor.lock();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read checkpoint, returning last known state");
                return cursor.state.clone();
            }
        };

        if bytes.len() < cursor.offset {
            warn!(path = %self.path.display(), "checkpoint shrank, replaying from the start");
            cursor.offset = 0;
            cursor.state = RunnerState::default();
        }

        let (events, consumed) = decode_from(&bytes[cursor.offset..]);
        fold_events(&mut cursor.state, &events);
        cursor.offset += consumed;

        cursor.state.clone()
    }
}

impl TaskStateSource for TaskMonitor {
    fn running_process_names(&self) -> Vec<String> {
        self.get_state()
            .processes
            .into_iter()
            .filter_map(|(name, runs)| {
                let last = runs.last()?;
                matches!(last.state, ProcessState::Forked | ProcessState::Running)
                    .then_some(name)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
