// SPDX-License-Identifier: MIT

//! `ObservedTask` (C6): the in-memory handle tying a task_id to its
//! monitors and cached state. Modeled as a sum type per the "polymorphism
//! over Active/Finished handles" design note rather than an inheritance
//! hierarchy, since the two variants have genuinely disjoint field sets
//! (only an active handle owns a sampler).

use crate::monitor::TaskMonitor;
use obs_core::{RunnerState, TaskId};
use obs_sampler::ResourceMonitor;
use obs_storage::CheckpointReplayer;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// The config fields this observer actually reads out of a task's
/// serialized config file. The runner owns the full schema; this crate
/// only needs `name` and `user` for the `main` query row (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskConfig {
    pub name: Option<String>,
    pub user: Option<String>,
}

/// Substitute the `{{task_id}}`, `{{user}}`, and `{{ports.<name>}}`
/// placeholders a task config may reference, resolved against the
/// header available once the runner has written one.
fn substitute(raw: &str, header: &obs_core::TaskHeader) -> String {
    let mut out = raw
        .replace("{{task_id}}", &header.task_id)
        .replace("{{user}}", &header.user);
    for (port_name, port) in &header.ports {
        out = out.replace(&format!("{{{{ports.{port_name}}}}}"), &port.to_string());
    }
    out
}

fn load_task_config(path: &std::path::Path, header: &obs_core::TaskHeader) -> Option<TaskConfig> {
    let bytes = fs::read(path).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let obj = value.as_object()?;
    Some(TaskConfig {
        name: obj
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| substitute(s, header)),
        user: obj
            .get("user")
            .and_then(|v| v.as_str())
            .map(|s| substitute(s, header)),
    })
}

/// An active handle: `state` reads through to a live `TaskMonitor`.
pub struct ActiveObservedTask {
    task_id: TaskId,
    mtime: SystemTime,
    config_path: PathBuf,
    task_monitor: Arc<TaskMonitor>,
    resource_monitor: ResourceMonitor<TaskMonitor>,
    config_cache: Mutex<Option<Option<TaskConfig>>>,
}

impl ActiveObservedTask {
    /// `resource_monitor` must already have been `start()`-ed by the
    /// caller (the reconciliation loop does this as an explicit, logged
    /// step — see `TaskObserver`).
    pub fn new(
        task_id: TaskId,
        mtime: SystemTime,
        config_path: PathBuf,
        task_monitor: Arc<TaskMonitor>,
        resource_monitor: ResourceMonitor<TaskMonitor>,
    ) -> Self {
        Self {
            task_id,
            mtime,
            config_path,
            task_monitor,
            resource_monitor,
            config_cache: Mutex::new(None),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    pub fn state(&self) -> RunnerState {
        self.task_monitor.get_state()
    }

    pub fn task_monitor(&self) -> &Arc<TaskMonitor> {
        &self.task_monitor
    }

    pub fn resource_monitor(&self) -> &ResourceMonitor<TaskMonitor> {
        &self.resource_monitor
    }

    /// Lazily materialized task config, memoized once a header is
    /// available. Returns `None` (without caching) while the header is
    /// still pending.
    pub fn task(&self) -> Option<TaskConfig> {
        let mut cache = self.config_cache.lock();
        if let Some(cached) = cache.as_ref() {
            return cached.clone();
        }
        let header = self.state().header?;
        let config = load_task_config(&self.config_path, &header);
        *cache = Some(config.clone());
        config
    }

    /// Stops the sampler. Called explicitly during an active→finished or
    /// garbage-collection transition, ahead of the handle being dropped.
    pub fn kill_sampler(&mut self) {
        self.resource_monitor.kill();
    }
}

/// A finished handle: state is replayed once from disk and cached for
/// the handle's lifetime — a finished task's checkpoint never changes
/// again.
pub struct FinishedObservedTask {
    task_id: TaskId,
    mtime: SystemTime,
    config_path: PathBuf,
    state: RunnerState,
    config_cache: Mutex<Option<Option<TaskConfig>>>,
}

impl FinishedObservedTask {
    pub fn new(
        task_id: TaskId,
        mtime: SystemTime,
        config_path: PathBuf,
        runner_checkpoint_path: &std::path::Path,
    ) -> Self {
        let state = CheckpointReplayer::from_file(runner_checkpoint_path)
            .ok()
            .flatten()
            .unwrap_or_default();

        Self {
            task_id,
            mtime,
            config_path,
            state,
            config_cache: Mutex::new(None),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn mtime(&self) -> SystemTime {
        self.mtime
    }

    pub fn state(&self) -> RunnerState {
        self.state.clone()
    }

    pub fn task(&self) -> Option<TaskConfig> {
        let mut cache = self.config_cache.lock();
        if let Some(cached) = cache.as_ref() {
            return cached.clone();
        }
        let header = self.state.header.clone()?;
        let config = load_task_config(&self.config_path, &header);
        *cache = Some(config.clone());
        config
    }
}

/// Sum type over the two handle kinds, per the "polymorphism over
/// Active/Finished handles" design note. The registries in `TaskObserver`
/// store one map per variant rather than a single map of this enum,
/// preserving the source's lifecycle partitioning; this type exists for
/// query helpers that need to treat both uniformly.
pub enum ObservedTask<'a> {
    Active(&'a ActiveObservedTask),
    Finished(&'a FinishedObservedTask),
}

impl ObservedTask<'_> {
    pub fn task_id(&self) -> &TaskId {
        match self {
            ObservedTask::Active(t) => t.task_id(),
            ObservedTask::Finished(t) => t.task_id(),
        }
    }

    pub fn mtime(&self) -> SystemTime {
        match self {
            ObservedTask::Active(t) => t.mtime(),
            ObservedTask::Finished(t) => t.mtime(),
        }
    }

    pub fn state(&self) -> RunnerState {
        match self {
            ObservedTask::Active(t) => t.state(),
            ObservedTask::Finished(t) => t.state(),
        }
    }

    pub fn task(&self) -> Option<TaskConfig> {
        match self {
            ObservedTask::Active(t) => t.task(),
            ObservedTask::Finished(t) => t.task(),
        }
    }
}

#[cfg(test)]
#[path = "observed_task_tests.rs"]
mod tests;
