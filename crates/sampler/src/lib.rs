// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! obs-sampler: per-task background resource sampling. Polls a task's live
//! process tree and sandbox disk usage on its own thread and exposes the
//! latest sample without blocking on the kernel.

pub mod monitor;
pub mod sampler_trait;

pub use monitor::{ResourceMonitor, SamplerIntervals};
pub use sampler_trait::{ProcTableSampler, ResourceSampler};
