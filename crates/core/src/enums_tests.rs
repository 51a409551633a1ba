// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn unknown_task_state_falls_back_on_deserialize() {
    let state: TaskRunState = serde_json::from_str("\"WEIRD_FUTURE_STATE\"").expect("deserialize");
    assert_eq!(state, TaskRunState::Unknown);
    assert_eq!(state.name(), "UNKNOWN");
}

#[test]
fn unknown_process_state_falls_back_on_deserialize() {
    let state: ProcessState = serde_json::from_str("\"SOMETHING_ELSE\"").expect("deserialize");
    assert_eq!(state, ProcessState::Unknown);
}

#[test]
fn process_state_default_is_waiting() {
    assert_eq!(ProcessState::default(), ProcessState::Waiting);
}

#[test]
fn terminal_states() {
    assert!(TaskRunState::Success.is_terminal());
    assert!(TaskRunState::Failed.is_terminal());
    assert!(!TaskRunState::Active.is_terminal());

    assert!(ProcessState::Killed.is_terminal());
    assert!(!ProcessState::Running.is_terminal());
}

#[test]
fn display_matches_name() {
    assert_eq!(TaskRunState::Active.to_string(), "ACTIVE");
    assert_eq!(ProcessState::Forked.to_string(), "FORKED");
}
