// SPDX-License-Identifier: MIT

//! Folds a decoded record stream into a [`RunnerState`].
//!
//! Mirrors the fold-on-replay shape of a WAL reader: records are applied to
//! an accumulator in append order, and a record that cannot be (fully) read
//! simply isn't applied yet — it is not an error, since the runner may
//! still be appending to the file.

use crate::record::{decode_from, RunnerEvent};
use obs_core::{ProcessRun, RunnerState, StatusEntry};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error reading checkpoint: {0}")]
    Io(#[from] io::Error),
}

/// Stateless replayer: reads an entire checkpoint file and folds it into a
/// fresh [`RunnerState`]. Used once by a finished task, whose checkpoint log
/// will never be appended to again.
pub struct CheckpointReplayer;

impl CheckpointReplayer {
    /// Replay `path` from the start. Returns `Ok(None)` if the file does not
    /// exist (a task that vanished between detection and replay is a
    /// transient condition, not an error).
    pub fn from_file(path: &Path) -> Result<Option<RunnerState>, ReplayError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (events, consumed) = decode_from(&bytes);
        if consumed < bytes.len() {
            // Trailing bytes didn't form a complete record. Expected for a
            // checkpoint still being appended to; fold what we have.
            warn!(
                path = %path.display(),
                trailing_bytes = bytes.len() - consumed,
                "checkpoint has a truncated trailing record, replaying partial state",
            );
        }

        let mut state = RunnerState::default();
        fold_events(&mut state, &events);
        Ok(Some(state))
    }
}

/// Apply a batch of events to `state` in order. Exported so an incremental
/// reader (one that resumes from a byte offset instead of reading the whole
/// file) can fold newly decoded events into an existing `RunnerState` using
/// the exact same semantics as a full replay.
pub fn fold_events(state: &mut RunnerState, events: &[RunnerEvent]) {
    for event in events {
        match event {
            RunnerEvent::Header(header) => {
                state.header = Some(header.clone());
            }
            RunnerEvent::Status { state: s, timestamp_ms } => {
                state.statuses.push(StatusEntry {
                    state: *s,
                    timestamp_ms: *timestamp_ms,
                });
            }
            RunnerEvent::ProcessRun {
                process,
                run,
                state: process_state,
                start_time_ms,
                stop_time_ms,
            } => {
                let runs = state.processes.entry(process.clone()).or_default();
                let entry = ProcessRun {
                    process: process.clone(),
                    state: *process_state,
                    start_time_ms: *start_time_ms,
                    stop_time_ms: *stop_time_ms,
                };
                match (*run).cmp(&runs.len()) {
                    std::cmp::Ordering::Equal => runs.push(entry),
                    std::cmp::Ordering::Less => runs[*run] = entry,
                    std::cmp::Ordering::Greater => {
                        warn!(
                            process = %process,
                            run,
                            known_runs = runs.len(),
                            "process-run transition references a run past the known history, ignoring",
                        );
                    }
                }
            }
            RunnerEvent::Unknown => {
                warn!("skipping unrecognized checkpoint record kind");
            }
        }
    }
}

#[cfg(test)]
#[path = "replayer_tests.rs"]
mod tests;
