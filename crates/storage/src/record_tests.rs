// SPDX-License-Identifier: MIT

use super::*;
use obs_core::TaskRunState;
use std::collections::HashMap;

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
fn round_trips_a_single_record() {
    let event = header_event();
    let bytes = encode(&event);
    let (events, consumed) = decode_from(&bytes);
    assert_eq!(consumed, bytes.len());
    assert_eq!(events, vec![event]);
}

#[test]
fn decodes_multiple_concatenated_records() {
    let a = header_event();
    let b = RunnerEvent::Status {
        state: TaskRunState::Active,
        timestamp_ms: 1000,
    };
    let mut bytes = encode(&a);
    bytes.extend(encode(&b));

    let (events, consumed) = decode_from(&bytes);
    assert_eq!(consumed, bytes.len());
    assert_eq!(events, vec![a, b]);
}

#[test]
fn stops_at_truncated_length_prefix() {
    let bytes = vec![0u8, 0u8];
    let (events, consumed) = decode_from(&bytes);
    assert!(events.is_empty());
    assert_eq!(consumed, 0);
}

#[test]
fn stops_at_truncated_payload_and_leaves_it_for_next_call() {
    let event = header_event();
    let full = encode(&event);
    let truncated = &full[..full.len() - 3];

    let (events, consumed) = decode_from(truncated);
    assert!(events.is_empty());
    assert_eq!(consumed, 0);
}

#[test]
fn a_complete_record_before_a_truncated_one_is_still_returned() {
    let a = header_event();
    let b = RunnerEvent::Status {
        state: TaskRunState::Success,
        timestamp_ms: 2000,
    };
    let mut bytes = encode(&a);
    let b_bytes = encode(&b);
    bytes.extend_from_slice(&b_bytes[..b_bytes.len() - 2]);

    let (events, consumed) = decode_from(&bytes);
    assert_eq!(events, vec![a]);
    assert!(consumed < bytes.len());
}

#[test]
fn unknown_kind_decodes_to_the_unknown_variant() {
    let json = br#"{"kind":"something_new_from_a_future_runner"}"#;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(json.len() as u32).to_be_bytes());
    bytes.extend_from_slice(json);

    let (events, consumed) = decode_from(&bytes);
    assert_eq!(events, vec![RunnerEvent::Unknown]);
    assert_eq!(consumed, bytes.len());
}

#[test]
fn malformed_json_payload_stops_the_stream_without_erroring() {
    let mut bytes = Vec::new();
    let garbage = b"not json";
    bytes.extend_from_slice(&(garbage.len() as u32).to_be_bytes());
    bytes.extend_from_slice(garbage);

    let (events, consumed) = decode_from(&bytes);
    assert!(events.is_empty());
    assert_eq!(consumed, 0);
}
