// SPDX-License-Identifier: MIT

//! Output formatting (text/JSON), mirroring the teacher's `output::OutputFormat`.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render a single serializable record. Text mode falls back to
/// pretty-printed JSON too — this CLI has no per-record text templates,
/// unlike the teacher's richer entity set.
pub fn render<T: Serialize>(format: OutputFormat, value: &T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

/// Render a `main()` listing as a column-aligned table in text mode.
pub fn render_main(format: OutputFormat, result: &obs_daemon::query::MainResult) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => render(format, result),
        OutputFormat::Text => {
            println!("{:<24} {:<12} {:<10} {:>10}", "TASK_ID", "STATE", "USER", "CPU");
            for task in &result.tasks {
                println!(
                    "{:<24} {:<12} {:<10} {:>10.2}",
                    task.task_id,
                    task.state,
                    task.user.as_deref().unwrap_or("-"),
                    task.cpu,
                );
            }
            println!("({} of {} tasks)", result.tasks.len(), result.task_count);
            Ok(())
        }
    }
}
