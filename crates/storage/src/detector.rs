// SPDX-License-Identifier: MIT

//! Enumerates task ids present on disk under the `active` or `finished`
//! subtrees of the checkpoint root.

use obs_core::{PathKind, PathSpec, TaskId, TaskTreeState};
use std::fs;
use tracing::debug;

/// Scans `<root>/tasks/<state>/` for task ids.
///
/// Reading the root is best-effort: a missing or unreadable directory is
/// logged and yields an empty list rather than propagating an error, since
/// an absent subtree (e.g. no finished tasks yet) is a normal condition.
pub struct TaskDetector {
    spec: PathSpec,
}

impl TaskDetector {
    pub fn new(spec: PathSpec) -> Self {
        Self { spec }
    }

    /// List task ids currently present in `state`'s subtree.
    ///
    /// An entry is only reported if its runner checkpoint file also exists,
    /// which tolerates a task directory the runner has started writing but
    /// not yet fully initialized (config written, checkpoint not yet
    /// created).
    pub fn get_task_ids(&self, state: TaskTreeState) -> Vec<TaskId> {
        let dir = self
            .spec
            .root()
            .join("tasks")
            .join(state.dirname());

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "could not read task subtree");
                return Vec::new();
            }
        };

        let mut task_ids = Vec::new();
        for entry in entries.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };

            let checkpoint_path = match self.spec.given_task_id(&name).getpath(PathKind::RunnerCheckpoint) {
                Ok(path) => path,
                Err(e) => {
                    debug!(task_id = %name, error = %e, "could not resolve checkpoint path");
                    continue;
                }
            };

            if !checkpoint_path.exists() {
                debug!(task_id = %name, "skipping partially written task directory");
                continue;
            }

            task_ids.push(TaskId::new(name));
        }

        task_ids
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
