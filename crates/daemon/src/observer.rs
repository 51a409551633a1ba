// SPDX-License-Identifier: MIT

//! `TaskObserver` (C7): the reconciliation loop, the registries it owns,
//! and the full query surface. Grounded on the teacher's
//! `lifecycle::reconcile` loop for the overall "diff disk against memory,
//! mutate, requeue" shape, and on `listener::query_status` for the
//! query-handler style of building a response record by walking the
//! in-memory state.
//!
//! Concurrency note: rather than a `parking_lot::ReentrantMutex`, this
//! implementation takes the simpler of the two options the design notes
//! allow — every public entry point acquires `registries` exactly once
//! and threads a `&Registries` reference through the internal helpers
//! (`lookup`, `build_row`, ...) that would otherwise need to re-enter the
//! lock. This gets the same "one acquisition per composite query"
//! guarantee without runtime reentrancy bookkeeping.

use crate::error::DaemonError;
use crate::observed_task::{ActiveObservedTask, FinishedObservedTask, ObservedTask};
use crate::query::{
    FileEntry, FilesListing, LogPaths, MainKind, MainResult, ProcessBuckets, ProcessRecord, StateRow, TaskRow,
};
use obs_core::{PathKind, PathSpec, ProcessState, ResourceSample, StatusEntry, TaskId, TaskTreeState};
use obs_sampler::{ResourceMonitor, ResourceSampler, SamplerIntervals};
use obs_storage::TaskDetector;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, warn};

struct Registries {
    active: HashMap<TaskId, ActiveObservedTask>,
    finished: HashMap<TaskId, FinishedObservedTask>,
}

impl Registries {
    fn lookup(&self, task_id: &TaskId) -> Option<ObservedTask<'_>> {
        if let Some(t) = self.active.get(task_id) {
            return Some(ObservedTask::Active(t));
        }
        self.finished.get(task_id).map(ObservedTask::Finished)
    }
}

pub struct TaskObserver {
    spec: PathSpec,
    detector: TaskDetector,
    sampler: Arc<dyn ResourceSampler>,
    sampler_intervals: SamplerIntervals,
    polling_interval: Duration,
    registries: Mutex<Registries>,
    stop: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TaskObserver {
    /// `sampler` plays the role of the spec's "resource monitor factory":
    /// Rust's type system already guarantees anything implementing
    /// `ResourceSampler` satisfies the `ResourceMonitor` contract, so the
    /// "reject an incompatible factory at construction" fault from §7 has
    /// no runtime analogue here — an incompatible factory is a compile
    /// error, not a `ValueError`-equivalent.
    pub fn new(
        root: PathBuf,
        sampler: Arc<dyn ResourceSampler>,
        polling_interval: Duration,
        sampler_intervals: SamplerIntervals,
    ) -> Arc<Self> {
        let spec = PathSpec::new(root);
        Arc::new(Self {
            detector: TaskDetector::new(spec.clone()),
            spec,
            sampler,
            sampler_intervals,
            polling_interval,
            registries: Mutex::new(Registries {
                active: HashMap::new(),
                finished: HashMap::new(),
            }),
            stop: AtomicBool::new(false),
            thread: Mutex::new(None),
        })
    }

    /// Spawns the reconciliation thread. No-op if already started.
    pub fn start(self: &Arc<Self>) {
        let mut thread_guard = self.thread.lock();
        if thread_guard.is_some() {
            return;
        }
        let observer = Arc::clone(self);
        *thread_guard = Some(thread::spawn(move || {
            while !observer.stop.load(Ordering::SeqCst) {
                observer.reconcile_once();
                if observer.stop.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(observer.polling_interval);
            }
        }));
    }

    /// Signals the reconciliation thread to stop after its current pass,
    /// joins it, then kills every remaining active sampler — reconciling
    /// stopped, so nothing will GC them otherwise.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
        let mut registries = self.registries.lock();
        for (_, mut task) in registries.active.drain() {
            task.kill_sampler();
        }
    }

    /// One reconciliation pass (§4.7). A fault handling any single task
    /// (an unreadable checkpoint, a missing header) is already contained
    /// by the helpers it calls — `TaskDetector` and `TaskMonitor` degrade
    /// to an empty/partial result and log rather than propagate — so no
    /// single task's trouble can unwind this loop.
    pub fn reconcile_once(&self) {
        let d_a: HashSet<TaskId> = self.detector.get_task_ids(TaskTreeState::Active).into_iter().collect();
        let d_f: HashSet<TaskId> = self.detector.get_task_ids(TaskTreeState::Finished).into_iter().collect();

        let mut registries = self.registries.lock();

        // 3. Promote to active.
        let to_promote: Vec<TaskId> = d_a.iter().filter(|t| !registries.active.contains_key(*t)).cloned().collect();
        for task_id in to_promote {
            if registries.finished.contains_key(&task_id) {
                error!(%task_id, "task present in both active and finished subtrees; skipping promotion");
                continue;
            }
            match self.build_active(&task_id) {
                Some(task) => {
                    registries.active.insert(task_id, task);
                }
                None => debug!(%task_id, "runner has not written a header yet; will retry next pass"),
            }
        }

        // 4. Active -> finished.
        let to_transition: Vec<TaskId> = d_f.iter().filter(|t| registries.active.contains_key(*t)).cloned().collect();
        for task_id in to_transition {
            if let Some(mut task) = registries.active.remove(&task_id) {
                task.kill_sampler();
            }
            if let Some(task) = self.build_finished(&task_id) {
                registries.finished.insert(task_id, task);
            }
        }

        // 5. New finished.
        let to_insert: Vec<TaskId> = d_f
            .iter()
            .filter(|t| !registries.active.contains_key(*t) && !registries.finished.contains_key(*t))
            .cloned()
            .collect();
        for task_id in to_insert {
            if let Some(task) = self.build_finished(&task_id) {
                registries.finished.insert(task_id, task);
            }
        }

        // 6. Garbage-collect disappeared.
        let gone_active: Vec<TaskId> = registries
            .active
            .keys()
            .filter(|t| !d_a.contains(*t) && !d_f.contains(*t))
            .cloned()
            .collect();
        for task_id in gone_active {
            if let Some(mut task) = registries.active.remove(&task_id) {
                task.kill_sampler();
            }
        }
        let gone_finished: Vec<TaskId> = registries
            .finished
            .keys()
            .filter(|t| !d_a.contains(*t) && !d_f.contains(*t))
            .cloned()
            .collect();
        for task_id in gone_finished {
            registries.finished.remove(&task_id);
        }
    }

    fn build_active(&self, task_id: &TaskId) -> Option<ActiveObservedTask> {
        let checkpoint_path = self.spec.given_task_id(task_id.as_str()).getpath(PathKind::RunnerCheckpoint).ok()?;
        let task_monitor = Arc::new(crate::monitor::TaskMonitor::new(checkpoint_path));
        let header = task_monitor.get_state().header?;

        let config_path = self
            .spec
            .given_task_id(task_id.as_str())
            .given_state(TaskTreeState::Active)
            .getpath(PathKind::TaskPath)
            .ok()?;
        let mtime = mtime_of(&config_path);

        let mut resource_monitor = ResourceMonitor::new(
            Arc::clone(&task_monitor),
            PathBuf::from(&header.sandbox),
            Arc::clone(&self.sampler),
            self.sampler_intervals,
        );
        resource_monitor.start();

        Some(ActiveObservedTask::new(task_id.clone(), mtime, config_path, task_monitor, resource_monitor))
    }

    fn build_finished(&self, task_id: &TaskId) -> Option<FinishedObservedTask> {
        let checkpoint_path = self.spec.given_task_id(task_id.as_str()).getpath(PathKind::RunnerCheckpoint).ok()?;
        let config_path = self
            .spec
            .given_task_id(task_id.as_str())
            .given_state(TaskTreeState::Finished)
            .getpath(PathKind::TaskPath)
            .ok()?;
        let mtime = mtime_of(&config_path);
        Some(FinishedObservedTask::new(task_id.clone(), mtime, config_path, &checkpoint_path))
    }

    // --- Query surface (§4.7) ---

    pub fn state(&self, task_id: &TaskId) -> Option<StateRow> {
        let guard = self.registries.lock();
        let header = guard.lookup(task_id)?.state().header?;
        Some(StateRow {
            task_id: header.task_id,
            launch_time: header.launch_time_ms as f64 / 1000.0,
            sandbox: header.sandbox,
            hostname: header.hostname,
            user: header.user,
        })
    }

    pub fn task_statuses(&self, task_id: &TaskId) -> Vec<(String, f64)> {
        let guard = self.registries.lock();
        let Some(task) = guard.lookup(task_id) else {
            return Vec::new();
        };
        task.state()
            .statuses
            .iter()
            .map(|s| (s.state.name().to_string(), s.timestamp_ms as f64 / 1000.0))
            .collect()
    }

    pub fn process(&self, task_id: &TaskId, process_name: &str, run: Option<i64>) -> Option<ProcessRecord> {
        let guard = self.registries.lock();
        let task = guard.lookup(task_id)?;
        let state = task.state();
        let runs = state.processes.get(process_name)?;
        let idx = resolve_run(run.unwrap_or(-1), runs.len())?;
        let run_rec = &runs[idx];
        let used = if run_rec.state == ProcessState::Running {
            sample_used(&task, process_name)
        } else {
            None
        };
        Some(ProcessRecord {
            process_name: process_name.to_string(),
            process_run: idx,
            state: run_rec.state,
            start_time: run_rec.start_time_ms.map(|ms| ms as f64 / 1000.0),
            stop_time: run_rec.stop_time_ms.map(|ms| ms as f64 / 1000.0),
            used,
        })
    }

    /// Buckets a task's processes by the state of their latest run
    /// (§4.7's internal `_task_processes`). A process whose latest run is
    /// in `Unknown` state — a wire value this build does not recognize —
    /// is a programming fault, not a degrade-and-continue case, and is
    /// reported as `DaemonError::UnexpectedState` rather than silently
    /// dropped or bucketed.
    fn task_processes(&self, task: &ObservedTask<'_>) -> Result<ProcessBuckets, DaemonError> {
        let state = task.state();
        let mut buckets = ProcessBuckets::default();
        for (name, runs) in &state.processes {
            match runs.last() {
                None => buckets.waiting.push(name.clone()),
                Some(run) => match run.state {
                    ProcessState::Waiting | ProcessState::Lost => buckets.waiting.push(name.clone()),
                    ProcessState::Forked | ProcessState::Running => buckets.running.push(name.clone()),
                    ProcessState::Success => buckets.success.push(name.clone()),
                    ProcessState::Failed => buckets.failed.push(name.clone()),
                    ProcessState::Killed => buckets.killed.push(name.clone()),
                    ProcessState::Unknown => return Err(DaemonError::UnexpectedState(run.state)),
                },
            }
        }
        Ok(buckets)
    }

    pub fn processes(&self, task_ids: &[TaskId]) -> Result<HashMap<TaskId, HashMap<String, ProcessRecord>>, DaemonError> {
        let guard = self.registries.lock();
        let mut out = HashMap::new();
        for task_id in task_ids {
            let Some(task) = guard.lookup(task_id) else {
                continue;
            };
            let buckets = self.task_processes(&task)?;
            let state = task.state();
            let mut per_process = HashMap::new();
            for name in buckets.waiting.iter().chain(&buckets.running).chain(&buckets.success).chain(&buckets.failed).chain(&buckets.killed) {
                let runs = &state.processes[name];
                let Some(idx) = runs.len().checked_sub(1) else {
                    continue;
                };
                let run_rec = &runs[idx];
                let used = if run_rec.state == ProcessState::Running {
                    sample_used(&task, name)
                } else {
                    None
                };
                per_process.insert(
                    name.clone(),
                    ProcessRecord {
                        process_name: name.clone(),
                        process_run: idx,
                        state: run_rec.state,
                        start_time: run_rec.start_time_ms.map(|ms| ms as f64 / 1000.0),
                        stop_time: run_rec.stop_time_ms.map(|ms| ms as f64 / 1000.0),
                        used,
                    },
                );
            }
            out.insert(task_id.clone(), per_process);
        }
        Ok(out)
    }

    pub fn logs(&self, task_id: &TaskId, process: &str, run: Option<usize>) -> Option<LogPaths> {
        let guard = self.registries.lock();
        let task = guard.lookup(task_id)?;
        let state = task.state();
        let header = state.header?;
        let runs = state.processes.get(process)?;
        let run_idx = run.unwrap_or_else(|| runs.len().saturating_sub(1));
        if run_idx >= runs.len() {
            return None;
        }
        let located = self
            .spec
            .given_log_dir(header.log_dir)
            .given_process(process)
            .given_run(run_idx);
        let stdout = located.getpath(PathKind::ProcessStdout).ok()?;
        let stderr = located.getpath(PathKind::ProcessStderr).ok()?;
        Some(LogPaths { stdout, stderr })
    }

    pub fn main(&self, kind: MainKind, offset: i64, num: usize) -> MainResult {
        let guard = self.registries.lock();
        let mut rows: Vec<(SystemTime, TaskRow)> = Vec::new();

        if matches!(kind, MainKind::Active | MainKind::All) {
            for (task_id, task) in &guard.active {
                let wrapped = ObservedTask::Active(task);
                rows.push((task.mtime(), build_row(task_id, &wrapped)));
            }
        }
        if matches!(kind, MainKind::Finished | MainKind::All) {
            for (task_id, task) in &guard.finished {
                let wrapped = ObservedTask::Finished(task);
                rows.push((task.mtime(), build_row(task_id, &wrapped)));
            }
        }

        rows.sort_by(|a, b| b.0.cmp(&a.0));
        let count = rows.len();
        let tasks: Vec<TaskRow> = rows
            .into_iter()
            .skip(effective_offset(offset, count))
            .take(num)
            .map(|(_, row)| row)
            .collect();

        MainResult {
            tasks,
            kind: kind_name(kind).to_string(),
            offset,
            num,
            task_count: count,
        }
    }

    /// Sandbox path containment (§4.7, security-critical). A pure
    /// normalization check — unlike `valid_file`, the target need not
    /// exist. Returns `(sandbox_root, relative_path)` on success. Never
    /// logs `relpath` — an escape attempt must not leave the attempted
    /// path in a log line.
    pub fn valid_path(&self, task_id: &TaskId, relpath: &str) -> Option<(PathBuf, PathBuf)> {
        let guard = self.registries.lock();
        let header = guard.lookup(task_id)?.state().header?;
        drop(guard);

        let base = std::fs::canonicalize(&header.sandbox).ok()?;
        let target = realpath_tolerant(&base, relpath);
        if !target.starts_with(&base) {
            warn!(%task_id, "sandbox containment check rejected a path");
            return None;
        }
        let rel = target.strip_prefix(&base).ok()?.to_path_buf();
        Some((base, rel))
    }

    pub fn valid_file(&self, task_id: &TaskId, relpath: &str) -> Option<PathBuf> {
        let (base, rel) = self.valid_path(task_id, relpath)?;
        let full = base.join(&rel);
        full.is_file().then_some(full)
    }

    pub fn files(&self, task_id: &TaskId, path: &str) -> Option<FilesListing> {
        let (base, rel) = self.valid_path(task_id, path)?;
        let dir = base.join(&rel);
        let entries = std::fs::read_dir(&dir).ok()?;
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            out.push(FileEntry { name, is_dir });
        }
        Some(FilesListing { entries: out })
    }
}

fn kind_name(kind: MainKind) -> &'static str {
    match kind {
        MainKind::Active => "active",
        MainKind::Finished => "finished",
        MainKind::All => "all",
    }
}

/// A nonnegative offset is used as-is. A negative offset wraps from the
/// end when its magnitude is smaller than `count`; otherwise it clamps to
/// 0 rather than producing a negative skip.
fn effective_offset(offset: i64, count: usize) -> usize {
    if offset >= 0 {
        return offset as usize;
    }
    let abs = offset.unsigned_abs() as usize;
    if abs < count {
        count - abs
    } else {
        0
    }
}

/// `run >= len(history)` is empty; otherwise `run % len(history)` wraps a
/// negative index from the end. Preserved from the source verbatim per
/// the open-question decision in DESIGN.md.
fn resolve_run(run: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if run >= 0 {
        let run = run as usize;
        return (run < len).then_some(run);
    }
    let len_i = len as i64;
    let wrapped = ((run % len_i) + len_i) % len_i;
    Some(wrapped as usize)
}

fn sample_used(task: &ObservedTask<'_>, process_name: &str) -> Option<obs_core::ProcessSample> {
    match task {
        ObservedTask::Active(active) => Some(active.resource_monitor().sample_by_process(process_name)),
        ObservedTask::Finished(_) => None,
    }
}

/// First status entry equal to the current state that follows a status
/// of a different state; 0 if no such boundary exists (single-status
/// tasks, or a task with no statuses at all).
fn state_transition_timestamp(statuses: &[StatusEntry]) -> u64 {
    let Some(current) = statuses.last() else {
        return 0;
    };
    let mut idx = statuses.len() - 1;
    while idx > 0 && statuses[idx - 1].state == current.state {
        idx -= 1;
    }
    if idx == 0 {
        0
    } else {
        statuses[idx].timestamp_ms
    }
}

fn build_row(task_id: &TaskId, task: &ObservedTask<'_>) -> TaskRow {
    let state = task.state();
    let config = task.task();
    let header = state.header.clone();

    let launch_timestamp = header.as_ref().map(|h| h.launch_time_ms as f64 / 1000.0).unwrap_or(0.0);
    let current_state = state
        .current_status()
        .map(|s| s.state.name().to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let state_timestamp = state_transition_timestamp(&state.statuses) as f64 / 1000.0;
    let ports = header.as_ref().map(|h| h.ports.clone()).unwrap_or_default();

    let resource: ResourceSample = match task {
        ObservedTask::Active(active) => active.resource_monitor().sample().1,
        ObservedTask::Finished(_) => ResourceSample::default(),
    };

    TaskRow {
        task_id: task_id.to_string(),
        name: config.as_ref().and_then(|c| c.name.clone()),
        user: config.as_ref().and_then(|c| c.user.clone()),
        launch_timestamp,
        state: current_state,
        state_timestamp,
        ports,
        cpu: resource.process_sample.cpu,
        ram: resource.process_sample.ram,
        disk_usage: resource.disk_usage,
    }
}

/// `realpath`-style normalization that tolerates a non-existent leaf:
/// resolves symlinks as far as the path exists on disk, then appends any
/// remaining components lexically (`..` pops, `.` is a no-op). A leading
/// root or prefix component in `relpath` is dropped rather than honored,
/// so the result always stays anchored under `base` regardless of how
/// `relpath` is spelled.
fn realpath_tolerant(base: &Path, relpath: &str) -> PathBuf {
    let mut resolved = base.to_path_buf();
    for component in Path::new(relpath).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                if let Ok(canon) = std::fs::canonicalize(&resolved) {
                    resolved = canon;
                }
            }
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    resolved
}

fn mtime_of(path: &std::path::Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now())
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
