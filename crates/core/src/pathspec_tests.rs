// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn task_path_for_active_state() {
    let spec = PathSpec::new("/var/oj")
        .given_task_id("T1")
        .given_state(TaskTreeState::Active);
    assert_eq!(
        spec.getpath(PathKind::TaskPath).expect("path"),
        PathBuf::from("/var/oj/tasks/active/T1")
    );
}

#[test]
fn task_path_for_finished_state() {
    let spec = PathSpec::new("/var/oj")
        .given_task_id("T1")
        .given_state(TaskTreeState::Finished);
    assert_eq!(
        spec.getpath(PathKind::TaskPath).expect("path"),
        PathBuf::from("/var/oj/tasks/finished/T1")
    );
}

#[test]
fn runner_checkpoint_path() {
    let spec = PathSpec::new("/var/oj").given_task_id("T1");
    assert_eq!(
        spec.getpath(PathKind::RunnerCheckpoint).expect("path"),
        PathBuf::from("/var/oj/checkpoints/T1/runner")
    );
}

#[test]
fn process_log_paths() {
    let spec = PathSpec::new("/var/oj")
        .given_log_dir("/var/oj/logs/T1")
        .given_process("webserver")
        .given_run(2);
    assert_eq!(
        spec.getpath(PathKind::ProcessLogDir).expect("path"),
        PathBuf::from("/var/oj/logs/T1/webserver/2")
    );
    assert_eq!(
        spec.getpath(PathKind::ProcessStdout).expect("path"),
        PathBuf::from("/var/oj/logs/T1/webserver/2/stdout")
    );
    assert_eq!(
        spec.getpath(PathKind::ProcessStderr).expect("path"),
        PathBuf::from("/var/oj/logs/T1/webserver/2/stderr")
    );
}

#[test]
fn missing_task_id_is_a_missing_key_fault() {
    let spec = PathSpec::new("/var/oj").given_state(TaskTreeState::Active);
    let err = spec.getpath(PathKind::TaskPath).unwrap_err();
    assert_eq!(
        err,
        PathSpecError::MissingKey {
            kind: PathKind::TaskPath,
            key: "task_id",
        }
    );
}

#[test]
fn missing_state_is_a_missing_key_fault() {
    let spec = PathSpec::new("/var/oj").given_task_id("T1");
    let err = spec.getpath(PathKind::TaskPath).unwrap_err();
    assert_eq!(
        err,
        PathSpecError::MissingKey {
            kind: PathKind::TaskPath,
            key: "state",
        }
    );
}

#[test]
fn given_does_not_mutate_the_original_spec() {
    let base = PathSpec::new("/var/oj");
    let bound = base.given_task_id("T1").given_state(TaskTreeState::Active);
    assert!(base.getpath(PathKind::TaskPath).is_err());
    assert!(bound.getpath(PathKind::TaskPath).is_ok());
}
