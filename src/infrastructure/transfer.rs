//! File transfer
//!
//! scp for remote hosts. Local hosts share the operator's filesystem, so a
//! plain copy does.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::domain::entities::Host;
use crate::domain::ports::{shell_quote, FileTransfer};
use crate::error::CutoverResult;
use crate::infrastructure::exec::{supervise, Label};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTransfer;

impl SystemTransfer {
    pub fn new() -> Self {
        Self
    }

    fn scp(host: &Host, from: &str, to: &str) -> CutoverResult<()> {
        let mut cmd = Command::new("scp");
        cmd.args(scp_args(host, from, to));
        let line = format!("scp {} {}", from, to);
        debug!(host = %host, "$ {}", line);
        supervise(
            cmd,
            None,
            Label {
                host: host.name(),
                command: &line,
            },
            None,
            false,
        )?;
        Ok(())
    }
}

fn scp_args(host: &Host, from: &str, to: &str) -> Vec<String> {
    let mut args = vec!["-q".to_string(), "-B".to_string()];
    if let Some(port) = host.port() {
        args.push("-P".to_string());
        args.push(port.to_string());
    }
    args.push(from.to_string());
    args.push(to.to_string());
    args
}

fn copy_local(from: &Path, to: &Path) -> CutoverResult<()> {
    if from == to {
        return Ok(());
    }
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)?;
    Ok(())
}

impl FileTransfer for SystemTransfer {
    fn upload(&self, host: &Host, local: &Path, remote: &str) -> CutoverResult<()> {
        match host.ssh_destination() {
            Some(dest) => Self::scp(
                host,
                &local.to_string_lossy(),
                &format!("{}:{}", dest, shell_quote(remote)),
            ),
            None => copy_local(local, Path::new(remote)),
        }
    }

    fn download(&self, host: &Host, remote: &str, local: &Path) -> CutoverResult<()> {
        match host.ssh_destination() {
            Some(dest) => Self::scp(
                host,
                &format!("{}:{}", dest, shell_quote(remote)),
                &local.to_string_lossy(),
            ),
            None => copy_local(Path::new(remote), local),
        }
    }
}
