//! Remote execution over ssh
//!
//! Plain commands travel as one quoted string after `--`. Commands carrying
//! env run as `sh -s` and receive the exports and the command on stdin, so
//! secrets such as `PGPASSWORD` never appear in a local or remote argv.

use std::process::Command;

use is_terminal::IsTerminal;

use crate::domain::entities::Host;
use crate::domain::ports::CommandSpec;

/// A prepared ssh child and the script to feed it, if any
pub struct Remote {
    pub command: Command,
    pub stdin: Option<String>,
}

/// `ssh [-p port] -o BatchMode=yes [-t] [user@]host -- <command>`
pub fn command_for(destination: &str, host: &Host, spec: &CommandSpec) -> Remote {
    let mut command = Command::new("ssh");
    command.args(ssh_args(destination, host, spec, std::io::stdin().is_terminal()));
    Remote {
        command,
        stdin: stdin_script(spec),
    }
}

fn carries_env(spec: &CommandSpec) -> bool {
    !spec.env_vars().is_empty()
}

fn stdin_script(spec: &CommandSpec) -> Option<String> {
    carries_env(spec).then(|| format!("{}\n", spec.to_shell()))
}

fn ssh_args(destination: &str, host: &Host, spec: &CommandSpec, interactive: bool) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(port) = host.port() {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    args.push("-o".to_string());
    args.push("BatchMode=yes".to_string());
    // build tools colour and pace output when they see a terminal; stdin is
    // taken by the script when env is set
    if spec.is_streaming() && interactive && !carries_env(spec) {
        args.push("-t".to_string());
    }
    args.push(destination.to_string());
    args.push("--".to_string());
    if carries_env(spec) {
        args.push("sh -s".to_string());
    } else {
        args.push(spec.command_line());
    }
    args
}
