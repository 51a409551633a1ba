// SPDX-License-Identifier: MIT

//! Config (C8): process-wide knobs loaded from a TOML file, merged over
//! built-in defaults. Path resolution mirrors the teacher's `env.rs`
//! `state_dir()` precedence.

use crate::error::DaemonError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_polling_interval_ms() -> u64 {
    1000
}

fn default_sampler_interval_ms() -> u64 {
    2000
}

fn default_disk_sample_interval_ms() -> u64 {
    15_000
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Loaded from TOML; every field has a built-in default so a missing file
/// is not an error (see [`Config::load`]).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub checkpoint_root: PathBuf,

    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,

    #[serde(default = "default_sampler_interval_ms")]
    pub sampler_interval_ms: u64,

    #[serde(default = "default_disk_sample_interval_ms")]
    pub disk_sample_interval_ms: u64,

    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_root: PathBuf::from("."),
            polling_interval_ms: default_polling_interval_ms(),
            sampler_interval_ms: default_sampler_interval_ms(),
            disk_sample_interval_ms: default_disk_sample_interval_ms(),
            log_dir: None,
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

/// Resolve the default config path: `OBS_STATE_DIR` > `XDG_STATE_HOME/obs`
/// > `~/.local/state/obs`, joined with `observer.toml`.
pub fn default_config_path() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("OBS_STATE_DIR") {
        return Ok(PathBuf::from(dir).join("observer.toml"));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("obs").join("observer.toml"));
    }
    let home = dirs::home_dir().ok_or(DaemonError::NoStateDir)?;
    Ok(home.join(".local/state/obs/observer.toml"))
}

impl Config {
    /// Load from `path`. A missing file yields `Config::default()` with
    /// `checkpoint_root` left at its placeholder value — callers
    /// typically override `checkpoint_root` via a CLI flag in that case.
    /// A malformed file is a startup-time fault.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => {
                return Err(DaemonError::ConfigRead {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        toml::from_str(&contents).map_err(|e| DaemonError::ConfigParse {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    pub fn polling_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.polling_interval_ms)
    }

    pub fn sampler_intervals(&self) -> obs_sampler::SamplerIntervals {
        obs_sampler::SamplerIntervals {
            process: std::time::Duration::from_millis(self.sampler_interval_ms),
            disk: std::time::Duration::from_millis(self.disk_sample_interval_ms),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
