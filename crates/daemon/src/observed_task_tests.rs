// SPDX-License-Identifier: MIT

use super::*;
use obs_core::ProcessSample;
use obs_sampler::{ResourceSampler, SamplerIntervals};
use obs_storage::{encode, RunnerEvent};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

struct NullSampler;

impl ResourceSampler for NullSampler {
    fn sample_processes(
        &self,
        _sandbox: &Path,
        _names: &[String],
    ) -> HashMap<String, ProcessSample> {
        HashMap::new()
    }

    fn disk_usage(&self, _sandbox: &Path) -> u64 {
        0
    }
}

fn fast_intervals() -> SamplerIntervals {
    SamplerIntervals {
        process: Duration::from_millis(20),
        disk: Duration::from_millis(20),
    }
}

fn header_event(task_id: &str, user: &str) -> RunnerEvent {
    RunnerEvent::Header(obs_core::TaskHeader {
        task_id: task_id.into(),
        user: user.into(),
        hostname: "h".into(),
        launch_time_ms: 1000,
        sandbox: "/s".into(),
        log_dir: "/s/logs".into(),
        ports: HashMap::from([("http".to_string(), 8080u16)]),
    })
}

fn new_active(
    task_id: &str,
    config_path: PathBuf,
    checkpoint_path: PathBuf,
    sandbox: PathBuf,
) -> ActiveObservedTask {
    let task_monitor = Arc::new(TaskMonitor::new(checkpoint_path));
    let mut resource_monitor = ResourceMonitor::new(
        Arc::clone(&task_monitor),
        sandbox,
        Arc::new(NullSampler),
        fast_intervals(),
    );
    resource_monitor.start();
    ActiveObservedTask::new(
        TaskId::new(task_id),
        SystemTime::now(),
        config_path,
        task_monitor,
        resource_monitor,
    )
}

#[test]
fn active_task_defers_config_loading_until_a_header_exists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let checkpoint_path = dir.path().join("runner");
    std::fs::write(&checkpoint_path, Vec::new()).expect("write empty checkpoint");
    let config_path = dir.path().join("config");
    std::fs::write(&config_path, br#"{"name":"{{task_id}}-svc","user":"{{user}}"}"#)
        .expect("write config");

    let task = new_active("T1", config_path, checkpoint_path, dir.path().to_path_buf());

    assert!(task.task().is_none());
}

#[test]
fn active_task_config_is_materialized_and_memoized_once_header_lands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let checkpoint_path = dir.path().join("runner");
    std::fs::write(&checkpoint_path, encode(&header_event("T1", "alice"))).expect("write");
    let config_path = dir.path().join("config");
    std::fs::write(&config_path, br#"{"name":"{{task_id}}-svc","user":"{{user}}"}"#)
        .expect("write config");

    let mut task = new_active(
        "T1",
        config_path.clone(),
        checkpoint_path,
        dir.path().to_path_buf(),
    );

    let config = task.task().expect("config available");
    assert_eq!(config.name.as_deref(), Some("T1-svc"));
    assert_eq!(config.user.as_deref(), Some("alice"));

    // second call returns the memoized value without touching the filesystem again
    std::fs::remove_file(&config_path).expect("remove config");
    let second = task.task().expect("still memoized");
    assert_eq!(second, config);

    task.kill_sampler();
}

#[test]
fn finished_task_replays_state_once_at_construction() {
    let dir = tempfile::tempdir().expect("tempdir");
    let checkpoint_path = dir.path().join("runner");
    std::fs::write(&checkpoint_path, encode(&header_event("T2", "bob"))).expect("write");
    let config_path = dir.path().join("config");
    std::fs::write(&config_path, br#"{"name":"svc"}"#).expect("write config");

    let task = FinishedObservedTask::new(
        TaskId::new("T2"),
        SystemTime::now(),
        config_path,
        &checkpoint_path,
    );

    assert_eq!(task.state().header.unwrap().task_id, "T2");
    assert_eq!(task.task().unwrap().name.as_deref(), Some("svc"));
}

#[test]
fn observed_task_enum_delegates_to_the_active_variant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let checkpoint_path = dir.path().join("runner");
    std::fs::write(&checkpoint_path, encode(&header_event("T3", "carol"))).expect("write");
    let config_path = dir.path().join("config");
    std::fs::write(&config_path, b"{}").expect("write config");

    let mut task = new_active("T3", config_path, checkpoint_path, dir.path().to_path_buf());

    let wrapped = ObservedTask::Active(&task);
    assert_eq!(wrapped.task_id(), &TaskId::new("T3"));
    assert_eq!(wrapped.state().header.unwrap().task_id, "T3");

    task.kill_sampler();
}
