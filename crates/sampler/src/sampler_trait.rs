// SPDX-License-Identifier: MIT

//! The process-table contract `ResourceMonitor` samples through, plus a
//! default Linux `/proc` implementation.
//!
//! Mirrors the teacher's `CheckpointWriter` trait: all actual I/O goes
//! through an injectable seam so `ResourceMonitor`'s scheduling logic can be
//! tested against a fake instead of the real process table.

use obs_core::ProcessSample;
use std::collections::HashMap;
use std::path::Path;

/// Samples OS-level resource usage for a task's live process tree.
///
/// Implementations are expected to be best-effort: a process that exits
/// between discovery and sampling simply contributes nothing, it must not
/// be treated as an error.
pub trait ResourceSampler: Send + Sync + 'static {
    /// Per-process CPU/RAM for every process rooted at `sandbox`, keyed by
    /// process name. Processes this sampler cannot attribute to a name are
    /// omitted, not guessed at.
    fn sample_processes(&self, sandbox: &Path, names: &[String]) -> HashMap<String, ProcessSample>;

    /// Total bytes used by the sandbox directory tree.
    fn disk_usage(&self, sandbox: &Path) -> u64;
}

/// Default sampler: Linux `/proc`, scoped to processes whose `cwd` resolves
/// under the sandbox and whose `comm` matches one of the requested names.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcTableSampler;

#[cfg(target_os = "linux")]
mod linux {
    use super::ProcTableSampler;
    use obs_core::ProcessSample;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use tracing::debug;

    impl super::ResourceSampler for ProcTableSampler {
        fn sample_processes(
            &self,
            sandbox: &Path,
            names: &[String],
        ) -> HashMap<String, ProcessSample> {
            let Ok(canonical_sandbox) = sandbox.canonicalize() else {
                debug!(sandbox = %sandbox.display(), "sandbox does not exist, skipping sample");
                return HashMap::new();
            };

            let mut found = HashMap::new();
            let Ok(proc_entries) = fs::read_dir("/proc") else {
                return found;
            };

            for entry in proc_entries.flatten() {
                let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok())
                else {
                    continue;
                };

                let cwd = match fs::read_link(entry.path().join("cwd")) {
                    Ok(cwd) => cwd,
                    Err(_) => continue,
                };
                if !cwd.starts_with(&canonical_sandbox) {
                    continue;
                }

                let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
                    continue;
                };
                let comm = comm.trim();
                let Some(name) = names.iter().find(|n| n.as_str() == comm) else {
                    continue;
                };

                if let Some(sample) = sample_one(pid) {
                    found.insert(name.clone(), sample);
                }
            }

            found
        }

        fn disk_usage(&self, sandbox: &Path) -> u64 {
            walk_size(sandbox)
        }
    }

    fn sample_one(pid: u32) -> Option<ProcessSample> {
        let statm = fs::read_to_string(format!("/proc/{pid}/statm")).ok()?;
        let rss_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        let page_size = 4096u64;

        let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        let after_comm = stat.rsplit_once(')')?.1;
        let fields: Vec<&str> = after_comm.split_whitespace().collect();
        let utime: u64 = fields.get(11).and_then(|s| s.parse().ok()).unwrap_or(0);
        let stime: u64 = fields.get(12).and_then(|s| s.parse().ok()).unwrap_or(0);
        let clk_tck = 100u64;
        let cpu_seconds = (utime + stime) as f64 / clk_tck as f64;

        Some(ProcessSample {
            cpu: cpu_seconds,
            ram: rss_pages * page_size,
        })
    }

    fn walk_size(root: &Path) -> u64 {
        let Ok(meta) = fs::symlink_metadata(root) else {
            return 0;
        };
        if meta.is_symlink() {
            return 0;
        }
        if meta.is_file() {
            return meta.len();
        }
        if !meta.is_dir() {
            return 0;
        }

        let Ok(entries) = fs::read_dir(root) else {
            return 0;
        };
        entries
            .flatten()
            .map(|entry| walk_size(&entry.path()))
            .sum()
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback {
    use super::ProcTableSampler;
    use obs_core::ProcessSample;
    use std::collections::HashMap;
    use std::path::Path;
    use tracing::debug;

    impl super::ResourceSampler for ProcTableSampler {
        fn sample_processes(
            &self,
            _sandbox: &Path,
            _names: &[String],
        ) -> HashMap<String, ProcessSample> {
            debug!("process-table sampling is unsupported on this platform");
            HashMap::new()
        }

        fn disk_usage(&self, _sandbox: &Path) -> u64 {
            0
        }
    }
}

#[cfg(test)]
#[path = "sampler_trait_tests.rs"]
mod tests;
