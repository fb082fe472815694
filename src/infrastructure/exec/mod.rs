//! Command Execution
//!
//! [`SystemExecutor`] implements the `Executor` port: local hosts spawn
//! processes directly, remote hosts go through ssh.

mod local;
mod process;
mod ssh;

use std::time::Duration;

use tracing::debug;

use crate::domain::entities::Host;
use crate::domain::ports::{CommandSpec, Executor, Timeout};
use crate::error::CutoverResult;

pub use process::{supervise, Label};

/// Bounded default for commands that do not opt out
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
pub struct SystemExecutor {
    default_timeout: Duration,
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SystemExecutor {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    fn deadline(&self, policy: Timeout) -> Option<Duration> {
        match policy {
            Timeout::Default => Some(self.default_timeout),
            Timeout::Unbounded => None,
            Timeout::After(after) => Some(after),
        }
    }
}

impl Executor for SystemExecutor {
    fn run(&self, host: &Host, command: &CommandSpec) -> CutoverResult<String> {
        let line = command.display();
        debug!(host = %host, cwd = ?command.cwd(), "$ {}", line);

        let (process, input) = match host.ssh_destination() {
            Some(destination) => {
                let remote = ssh::command_for(&destination, host, command);
                (remote.command, remote.stdin)
            }
            None => (local::command_for(command), None),
        };

        supervise(
            process,
            input.as_deref(),
            Label {
                host: host.name(),
                command: &line,
            },
            self.deadline(command.timeout_policy()),
            command.is_streaming(),
        )
    }
}
