// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! obsctl — a thin operational front-end over `TaskObserver`. Not a wire
//! protocol client: this binary embeds the observer directly, the way the
//! teacher's `oj` embeds `DaemonClient` over its own socket. Here there is
//! no socket to dial, so each invocation loads config, runs one
//! reconciliation pass, and answers a single query before exiting.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use obs_core::TaskId;
use obs_daemon::query::MainKind;
use obs_daemon::{Config, TaskObserver};
use obs_sampler::ProcTableSampler;
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "obsctl", version, about = "Inspect tasks tracked by the task observer")]
struct Cli {
    /// Path to the observer's checkpoint root. Overrides `checkpoint_root` in config.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Path to the observer's TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active and/or finished tasks
    List {
        #[arg(long, value_enum, default_value_t = MainKindArg::All)]
        kind: MainKindArg,
        #[arg(long, default_value_t = 0)]
        offset: i64,
        #[arg(long, default_value_t = 50)]
        num: usize,
    },
    /// Show a task's header and status history
    Show { task_id: String },
    /// Show a task's process runs
    Ps { task_id: String },
    /// Show a process run's log paths
    Logs {
        task_id: String,
        process: String,
        #[arg(long)]
        run: Option<usize>,
    },
    /// List files under a task's sandbox
    Files {
        task_id: String,
        #[arg(default_value = ".")]
        path: String,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum MainKindArg {
    Active,
    Finished,
    All,
}

impl From<MainKindArg> for MainKind {
    fn from(value: MainKindArg) -> Self {
        match value {
            MainKindArg::Active => MainKind::Active,
            MainKindArg::Finished => MainKind::Finished,
            MainKindArg::All => MainKind::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => obs_daemon::config::default_config_path().context("resolving default config path")?,
    };
    let mut config = Config::load(&config_path).context("loading config")?;
    if let Some(root) = &cli.root {
        config.checkpoint_root = root.clone();
    }

    obs_daemon::logging::init(&config);

    let observer = TaskObserver::new(
        config.checkpoint_root.clone(),
        Arc::new(ProcTableSampler),
        config.polling_interval(),
        config.sampler_intervals(),
    );
    observer.reconcile_once();

    match cli.command {
        Commands::List { kind, offset, num } => {
            let result = observer.main(kind.into(), offset, num);
            output::render_main(cli.output, &result)?;
        }
        Commands::Show { task_id } => {
            let task_id = TaskId::new(task_id);
            let state = observer.state(&task_id).context("task not found")?;
            let statuses = observer.task_statuses(&task_id);
            output::render(cli.output, &serde_json::json!({ "state": state, "statuses": statuses }))?;
        }
        Commands::Ps { task_id } => {
            let task_id = TaskId::new(task_id);
            let result = observer.processes(std::slice::from_ref(&task_id)).context("bucketing task processes")?;
            let processes = result.get(&task_id).cloned().unwrap_or_default();
            output::render(cli.output, &processes)?;
        }
        Commands::Logs { task_id, process, run } => {
            let task_id = TaskId::new(task_id);
            let paths = observer.logs(&task_id, &process, run).context("no such process run")?;
            output::render(cli.output, &paths)?;
        }
        Commands::Files { task_id, path } => {
            let task_id = TaskId::new(task_id);
            let listing = observer.files(&task_id, &path).context("path not valid or not found")?;
            output::render(cli.output, &listing)?;
        }
    }

    Ok(())
}
