//! Local process execution

use std::process::Command;

use crate::domain::ports::{CommandSpec, Invocation};

/// Translate a spec into a process on this machine
///
/// Argument vectors are spawned directly. Pipelines and scripts go through
/// `sh -c`.
pub fn command_for(spec: &CommandSpec) -> Command {
    let mut cmd = match spec.invocation() {
        Invocation::Exec { program, args } => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
        Invocation::Pipeline(pipeline) => shell(&pipeline.render()),
        Invocation::Script(script) => shell(script),
    };
    if let Some(dir) = spec.cwd() {
        cmd.current_dir(dir);
    }
    for (key, value) in spec.env_vars() {
        cmd.env(key, value);
    }
    cmd
}

fn shell(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}
