//! Cutover CLI - release promotion across a fleet of hosts
//!
//! Usage: cutover [OPTIONS] <STAGE> [TASK]
//!
//! Common tasks:
//!   to            Deploy a revision to a stage (the default)
//!   setup         Prepare directories on a fresh stage
//!   sync          Copy shared files and the database from the source stage
//!   db:rollback   Restore the previous database

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cutover::application::{render_plan, stage_timeout, standard_graph, RunUseCase, Services};
use cutover::config::Project;
use cutover::error::CutoverError;
use is_terminal::IsTerminal;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<CutoverError>()
                .map(CutoverError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

/// Logs go to stderr so plans and diffs on stdout stay pipeable
fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let project = Project::load(cli.file.as_deref(), &cwd)?;
    for warning in &project.warnings {
        warn!("{}", warning);
    }

    if cli.list {
        let graph = standard_graph(&project.config)?;
        print!("{}", render_plan(&graph, &cli.task)?);
        return Ok(());
    }

    let timeout = stage_timeout(&project, &cli.stage)?;
    let services = Services::system(&project, timeout)?;
    RunUseCase::new(&project, services)?.execute(&cli.request())?;
    Ok(())
}
