//! Repairs and verifies a local Spark setup.
//!
//! Cleans stale runtime entries out of PATH, pins the engine to one
//! interpreter, provisions working directories, checks the installed engine
//! version and runs a short table self-test against a fresh session.

mod diagnostics;
mod doctor;
mod report;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use sdbl::core::environment::ProcessEnvironment;
use sdbl::engine::local::LocalEngine;
use sdbl::error::exit_code_for;
use sdbl::io::config::{config_path, load_config};
use sdbl::io::package::PipShow;
use sdbl::io::prompt::TerminalConfirm;
use sdbl::logging;

use crate::doctor::{DoctorDeps, DoctorOptions, run_doctor};

#[derive(Parser)]
#[command(name = "doctor", version, about = "Repair and verify a local Spark setup")]
struct Cli {
    /// Config file (default: $SDBL_CONFIG, then ./sdbl.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Continue past a known-incompatible engine version without asking.
    #[arg(short, long)]
    yes: bool,
    /// Interpreter for the engine's driver and workers.
    #[arg(long)]
    python: Option<PathBuf>,
    /// Print the prepared variables as shell commands.
    #[arg(long)]
    print_env: bool,
}

fn main() {
    logging::init("warn");
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let env = ProcessEnvironment::capture();
    let config_file = cli.config.clone().unwrap_or_else(|| config_path(&env));
    let config = load_config(&config_file)?;
    let timeout = Duration::from_secs(config.runtime.query_timeout_secs);
    let opts = DoctorOptions {
        config,
        env,
        cwd: std::env::current_dir().context("read current directory")?,
        python: cli.python,
        auto_confirm: cli.yes,
        print_env: cli.print_env,
    };

    let package = PipShow::new(timeout);
    let mut confirm = TerminalConfirm::stdio();
    let factory = LocalEngine::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = run_doctor(
        &opts,
        DoctorDeps {
            package: &package,
            confirm: &mut confirm,
            factory: &factory,
        },
        &mut out,
    )?;
    Ok(report.outcome.exit_code())
}
