// SPDX-License-Identifier: MIT

use super::*;
use crate::record::encode;
use obs_core::{ProcessState, TaskHeader, TaskRunState};
use std::collections::HashMap;
use std::io::Write;

fn header_event() -> RunnerEvent {
    RunnerEvent::Header(TaskHeader {
        task_id: "T1".into(),
        user: "u".into(),
        hostname: "h".into(),
        launch_time_ms: 1000,
        sandbox: "/s".into(),
        log_dir: "/s/logs".into(),
        ports: HashMap::new(),
    })
}

#[test]
fn missing_file_returns_none_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("no-such-runner");
    let result = CheckpointReplayer::from_file(&path).expect("replay");
    assert!(result.is_none());
}

#[test]
fn replays_header_and_statuses_in_append_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("runner");
    let mut file = std::fs::File::create(&path).expect("create");
    file.write_all(&encode(&header_event())).expect("write");
    file.write_all(&encode(&RunnerEvent::Status {
        state: TaskRunState::Active,
        timestamp_ms: 1000,
    }))
    .expect("write");
    file.write_all(&encode(&RunnerEvent::Status {
        state: TaskRunState::Success,
        timestamp_ms: 2000,
    }))
    .expect("write");

    let state = CheckpointReplayer::from_file(&path)
        .expect("replay")
        .expect("some state");
    assert_eq!(state.header.unwrap().task_id, "T1");
    assert_eq!(state.statuses.len(), 2);
    assert_eq!(state.statuses[0].state, TaskRunState::Active);
    assert_eq!(state.statuses[1].state, TaskRunState::Success);
}

#[test]
fn replaying_the_same_file_twice_yields_equal_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("runner");
    std::fs::write(&path, encode(&header_event())).expect("write");

    let first = CheckpointReplayer::from_file(&path).expect("replay").unwrap();
    let second = CheckpointReplayer::from_file(&path).expect("replay").unwrap();
    assert_eq!(first, second);
}

#[test]
fn truncated_trailing_record_folds_only_the_complete_prefix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("runner");
    let mut bytes = encode(&header_event());
    let tail = encode(&RunnerEvent::Status {
        state: TaskRunState::Active,
        timestamp_ms: 1000,
    });
    bytes.extend_from_slice(&tail[..tail.len() - 2]);
    std::fs::write(&path, &bytes).expect("write");

    let state = CheckpointReplayer::from_file(&path).expect("replay").unwrap();
    assert!(state.header.is_some());
    assert!(state.statuses.is_empty());
}

#[test]
fn process_runs_fold_in_append_order_and_indexed_updates_apply() {
    let mut state = RunnerState::default();
    fold_events(
        &mut state,
        &[
            RunnerEvent::ProcessRun {
                process: "p".into(),
                run: 0,
                state: ProcessState::Waiting,
                start_time_ms: None,
                stop_time_ms: None,
            },
            RunnerEvent::ProcessRun {
                process: "p".into(),
                run: 1,
                state: ProcessState::Running,
                start_time_ms: Some(10),
                stop_time_ms: None,
            },
            RunnerEvent::ProcessRun {
                process: "p".into(),
                run: 1,
                state: ProcessState::Success,
                start_time_ms: Some(10),
                stop_time_ms: Some(20),
            },
        ],
    );

    let runs = state.processes.get("p").expect("process present");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].state, ProcessState::Waiting);
    assert_eq!(runs[1].state, ProcessState::Success);
    assert_eq!(runs[1].stop_time_ms, Some(20));
}

#[test]
fn unknown_record_is_skipped_without_affecting_folded_state() {
    let mut state = RunnerState::default();
    fold_events(&mut state, &[header_event(), RunnerEvent::Unknown]);
    assert!(state.header.is_some());
}
