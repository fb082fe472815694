use std::path::PathBuf;

use clap::Parser;
use cutover::application::RunRequest;

/// Cutover - release promotion across a fleet of hosts
#[derive(Parser, Debug)]
#[command(name = "cutover")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Run 'cutover <STAGE> --list' to see what a task would do.")]
pub struct Cli {
    /// Stage to deploy to (dev, uat, prod, ...)
    pub stage: String,

    /// Task or group to run
    #[arg(default_value = "to")]
    pub task: String,

    /// Skip guards that would otherwise refuse to continue
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Stage to copy shared files and the database from
    #[arg(short = 'S', long)]
    pub source: Option<String>,

    /// Branch, commit, or =stage to deploy
    #[arg(short = 'R', long)]
    pub revision: Option<String>,

    /// Destination file for db:export
    #[arg(short = 'O', long)]
    pub output: Option<PathBuf>,

    /// Dump file for db:import
    #[arg(short = 'I', long)]
    pub input: Option<PathBuf>,

    /// Deployment document (defaults to deploy.yml in the working directory)
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print the execution order of TASK and exit
    #[arg(long)]
    pub list: bool,
}

impl Cli {
    pub fn request(&self) -> RunRequest {
        RunRequest {
            stage: self.stage.clone(),
            task: self.task.clone(),
            source: self.source.clone(),
            revision: self.revision.clone(),
            force: self.force,
            input: self.input.clone(),
            output: self.output.clone(),
        }
    }

    /// Default log filter for the verbosity flag
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
