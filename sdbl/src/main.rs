//! `sdbl {local|qa|prod} {load_date}`
//!
//! Opens a session for the given run environment. Exits -1 with a usage line
//! when either argument is missing.

use anyhow::Result;

use sdbl::bootstrap::{Invocation, run_bootstrap};
use sdbl::core::environment::ProcessEnvironment;
use sdbl::engine::local::LocalEngine;
use sdbl::error::exit_code_for;
use sdbl::exit_codes;
use sdbl::io::config::{config_path, load_config};
use sdbl::logging;

fn main() {
    logging::init("info");
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let invocation = Invocation::from_args(std::env::args_os())?;
    let env = ProcessEnvironment::capture();
    let config = load_config(&config_path(&env))?;
    run_bootstrap(&invocation, &config, &env, &LocalEngine::new())?;
    Ok(())
}
