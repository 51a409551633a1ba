// SPDX-License-Identifier: MIT

//! The checkpoint wire format: a stream of length-prefixed JSON records.
//!
//! Each record is a 4-byte big-endian length prefix followed by that many
//! bytes of JSON encoding a [`RunnerEvent`]. The exact format produced by
//! the external runner is out of scope for this crate; this is the concrete
//! choice this implementation makes so the replayer is testable end to end
//! (see DESIGN.md).

use obs_core::{ProcessState, TaskHeader, TaskRunState};
use serde::{Deserialize, Serialize};

/// One event appended to a task's checkpoint log by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunnerEvent {
    /// Written once, at task launch.
    Header(TaskHeader),
    /// A task-level status transition.
    Status { state: TaskRunState, timestamp_ms: u64 },
    /// A process-run transition. `run` is the 0-based run index within
    /// `process`'s history; `run == current length` appends a new run,
    /// otherwise it updates an existing one in place.
    ProcessRun {
        process: String,
        run: usize,
        state: ProcessState,
        start_time_ms: Option<u64>,
        stop_time_ms: Option<u64>,
    },
    /// Any record kind this build does not recognize. Skipped by the
    /// replayer with a logged warning rather than failing the replay.
    #[serde(other)]
    Unknown,
}

/// Encode a single record: 4-byte big-endian length prefix + JSON body.
///
/// Used by tests to build fixture checkpoint files; the real runner is an
/// external process and writes this format independently.
#[allow(clippy::expect_used)]
pub fn encode(event: &RunnerEvent) -> Vec<u8> {
    let body = serde_json::to_vec(event).expect("RunnerEvent always serializes");
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Decode as many complete records as `bytes` holds.
///
/// Returns the decoded events and the number of bytes consumed. Stops
/// cleanly (without error) at:
/// - a truncated length prefix (fewer than 4 bytes remain),
/// - a truncated payload (declared length exceeds remaining bytes),
/// - a payload that fails to parse as JSON.
///
/// In every case the unconsumed suffix is left for a future call once more
/// bytes have been appended — this is what makes incremental reading safe
/// against a runner that is still writing.
#[allow(clippy::expect_used)]
pub fn decode_from(bytes: &[u8]) -> (Vec<RunnerEvent>, usize) {
    let mut events = Vec::new();
    let mut pos = 0usize;

    loop {
        if bytes.len() - pos < 4 {
            break;
        }
        // Exactly 4 bytes by the length check above.
        let len_bytes: [u8; 4] = bytes[pos..pos + 4].try_into().expect("checked length");
        let len = u32::from_be_bytes(len_bytes) as usize;

        if bytes.len() - pos - 4 < len {
            break;
        }
        let payload = &bytes[pos + 4..pos + 4 + len];

        match serde_json::from_slice::<RunnerEvent>(payload) {
            Ok(event) => events.push(event),
            Err(_) => break,
        }

        pos += 4 + len;
    }

    (events, pos)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
