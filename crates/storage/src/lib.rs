// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! obs-storage: reads the checkpoint tree a runner writes. Detects which
//! tasks exist on disk and replays their checkpoint logs into a
//! [`obs_core::RunnerState`]. This crate never writes runner state.

pub mod detector;
pub mod record;
pub mod replayer;

pub use detector::TaskDetector;
pub use record::{decode_from, encode, RunnerEvent};
pub use replayer::{fold_events, CheckpointReplayer, ReplayError};
