use crate::logging;
use anyhow::Context;
use clap::Parser;
use gul_core::config::{ConfigStore, default_config_path, validate_key};
use gul_core::dispatcher::{PoolEvent, RunSummary, WORKER_COUNT, run_targets};
use gul_core::lockfile::WorkdirLock;
use gul_core::model::{RunConfiguration, RunFlags};
use gul_core::pipeline::{GitPipeline, StepEvent, StepKind, TargetReport};
use gul_core::workdir::{Workdir, select_targets};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

mod app;
mod args;
mod config_cmd;
mod push_cmd;
mod render;

use args::*;

use config_cmd::handle_config;
use push_cmd::handle_push;

pub fn run() -> anyhow::Result<()> {
    app::run()
}
