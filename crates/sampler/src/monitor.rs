// SPDX-License-Identifier: MIT

//! `ResourceMonitor`: a background sampler bound to one active task's
//! sandbox. Owns its sampler thread the way the teacher's `Checkpointer`
//! owns its background write thread, but is long-lived and cancellable
//! rather than one-shot.

use crate::sampler_trait::ResourceSampler;
use obs_core::{ProcessSample, ResourceSample, TaskStateSource};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct SamplerIntervals {
    pub process: Duration,
    pub disk: Duration,
}

impl Default for SamplerIntervals {
    fn default() -> Self {
        Self {
            process: Duration::from_secs(2),
            disk: Duration::from_secs(15),
        }
    }
}

struct SharedSamples {
    latest: Mutex<(u64, ResourceSample)>,
    per_process: Mutex<std::collections::HashMap<String, ProcessSample>>,
}

impl Default for SharedSamples {
    fn default() -> Self {
        Self {
            latest: Mutex::new((0, ResourceSample::default())),
            per_process: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

/// Samples a task's live process tree and sandbox disk usage on a
/// background thread. `start()`/`kill()` bracket the thread's lifetime;
/// after `kill()`, `sample()` keeps returning the last value observed
/// rather than blocking or erroring.
pub struct ResourceMonitor<S: TaskStateSource> {
    task_state: Arc<S>,
    sandbox: PathBuf,
    sampler: Arc<dyn ResourceSampler>,
    intervals: SamplerIntervals,
    shared: Arc<SharedSamples>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl<S: TaskStateSource + 'static> ResourceMonitor<S> {
    pub fn new(
        task_state: Arc<S>,
        sandbox: PathBuf,
        sampler: Arc<dyn ResourceSampler>,
        intervals: SamplerIntervals,
    ) -> Self {
        Self {
            task_state,
            sandbox,
            sampler,
            intervals,
            shared: Arc::new(SharedSamples::default()),
            stop_tx: None,
            handle: None,
        }
    }

    /// Spawns the sampler thread. Calling twice without an intervening
    /// `kill()` is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let task_state = Arc::clone(&self.task_state);
        let sandbox = self.sandbox.clone();
        let sampler = Arc::clone(&self.sampler);
        let shared = Arc::clone(&self.shared);
        let intervals = self.intervals;

        let handle = thread::spawn(move || {
            sampler_loop(&task_state, &sandbox, sampler.as_ref(), &shared, intervals, &stop_rx);
        });

        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
    }

    /// Stops the sampler thread and joins it, releasing its resources.
    /// Idempotent: calling `kill()` when not started is a no-op.
    pub fn kill(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("sampler thread panicked during shutdown");
            }
        }
    }

    /// Latest aggregated sample and the timestamp (ms since epoch) it was
    /// taken at. Zeroed if no sample has ever completed.
    pub fn sample(&self) -> (u64, ResourceSample) {
        *self.shared.latest.lock()
    }

    /// Per-process CPU/RAM for the most recently sampled tick. A process
    /// absent from the last sample (never seen, or exited) reads as zero.
    pub fn sample_by_process(&self, name: &str) -> ProcessSample {
        self.shared
            .per_process
            .lock()
            .get(name)
            .copied()
            .unwrap_or_default()
    }
}

impl<S: TaskStateSource> Drop for ResourceMonitor<S> {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn sampler_loop<S: TaskStateSource>(
    task_state: &Arc<S>,
    sandbox: &PathBuf,
    sampler: &dyn ResourceSampler,
    shared: &Arc<SharedSamples>,
    intervals: SamplerIntervals,
    stop_rx: &mpsc::Receiver<()>,
) {
    let mut ticks_since_disk_sample = 0u64;
    let disk_ratio = (intervals.disk.as_millis() / intervals.process.as_millis().max(1)).max(1) as u64;
    let mut last_disk_usage = 0u64;

    loop {
        let names = task_state.running_process_names();
        let per_process = sampler.sample_processes(sandbox, &names);

        if ticks_since_disk_sample == 0 {
            last_disk_usage = sampler.disk_usage(sandbox);
        }
        ticks_since_disk_sample = (ticks_since_disk_sample + 1) % disk_ratio;

        let aggregated = ResourceSample {
            process_sample: ProcessSample {
                cpu: per_process.values().map(|p| p.cpu).sum(),
                ram: per_process.values().map(|p| p.ram).sum(),
            },
            disk_usage: last_disk_usage,
        };
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        *shared.latest.lock() = (now_ms, aggregated);
        *shared.per_process.lock() = per_process;

        debug!(sandbox = %sandbox.display(), "sampled resource usage");

        match stop_rx.recv_timeout(intervals.process) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => continue,
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
