// SPDX-License-Identifier: MIT

//! Response records for `TaskObserver`'s query surface (§4.7). Plain,
//! serializable structs rather than a wire format — "in-process method
//! calls returning plain records" per spec §6.

use obs_core::{ProcessSample, ProcessState};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// `state(task_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRow {
    pub task_id: String,
    /// Seconds since epoch.
    pub launch_time: f64,
    pub sandbox: String,
    pub hostname: String,
    pub user: String,
}

/// `process(task_id, process_name, run)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub process_name: String,
    pub process_run: usize,
    pub state: ProcessState,
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub used: Option<ProcessSample>,
}

/// `_task_processes(task_id)`: a task's processes bucketed by the state
/// of their latest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessBuckets {
    pub waiting: Vec<String>,
    pub running: Vec<String>,
    pub success: Vec<String>,
    pub failed: Vec<String>,
    pub killed: Vec<String>,
}

/// `logs(task_id, process, run)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogPaths {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// `main(type, offset, num)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub task_id: String,
    pub name: Option<String>,
    pub user: Option<String>,
    pub launch_timestamp: f64,
    pub state: String,
    pub state_timestamp: f64,
    pub ports: HashMap<String, u16>,
    pub cpu: f64,
    pub ram: u64,
    pub disk_usage: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainKind {
    Active,
    Finished,
    #[default]
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainResult {
    pub tasks: Vec<TaskRow>,
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub num: usize,
    pub task_count: usize,
}

/// `files(task_id, path)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesListing {
    pub entries: Vec<FileEntry>,
}
