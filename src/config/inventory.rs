//! Host inventory loading
//!
//! `hosts.yml` maps host names to their connection details. Document order
//! is inventory order, which decides the host used by `once` tasks.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::domain::entities::{Host, Inventory, Role};
use crate::error::{CutoverError, CutoverResult};

use super::loader::{find_line_number, suggest_key, ConfigWarning};

pub const INVENTORY_FILES: &[&str] = &["hosts.yml", "hosts.yaml"];

#[derive(Debug, Deserialize)]
struct HostEntry {
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    stage: String,
    #[serde(default)]
    roles: Vec<Role>,
    /// Run commands as local processes even if a hostname is given
    #[serde(default)]
    local: bool,
}

impl HostEntry {
    fn into_host(self, name: String) -> Host {
        let host = match (self.local, self.hostname) {
            (false, Some(address)) => Host::remote(name, address, self.stage),
            _ => Host::local(name, self.stage),
        };
        let host = host.with_roles(self.roles);
        let host = match self.user {
            Some(user) => host.with_user(user),
            None => host,
        };
        match self.port {
            Some(port) => host.with_port(port),
            None => host,
        }
    }
}

/// First inventory file present in `dir`
pub fn discover(dir: &Path) -> Option<PathBuf> {
    INVENTORY_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

pub fn load_inventory(path: &Path) -> CutoverResult<(Inventory, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path).map_err(|e| CutoverError::InvalidConfig {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_inventory(path, &content)
}

pub fn parse_inventory(
    path: &Path,
    content: &str,
) -> CutoverResult<(Inventory, Vec<ConfigWarning>)> {
    let invalid = |message: String| CutoverError::InvalidConfig {
        file: path.to_path_buf(),
        message,
    };

    let document: serde_yaml_ng::Mapping = if content.trim().is_empty() {
        serde_yaml_ng::Mapping::new()
    } else {
        serde_yaml_ng::from_str(content).map_err(|e| invalid(e.to_string()))?
    };

    let mut hosts = Vec::with_capacity(document.len());
    let mut warnings = Vec::new();

    for (key, value) in document {
        let name = key
            .as_str()
            .ok_or_else(|| invalid("host names must be strings".to_string()))?
            .to_string();

        let mut unknown: Vec<String> = Vec::new();
        let entry: HostEntry = serde_ignored::deserialize(value, |p| unknown.push(p.to_string()))
            .map_err(|e| invalid(format!("host {}: {}", name, e)))?;

        for key in unknown {
            warnings.push(ConfigWarning {
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
                key,
                file: path.to_path_buf(),
            });
        }
        if entry.roles.is_empty() {
            warn!(host = %name, "host has no roles and will never be selected");
        }
        hosts.push(entry.into_host(name));
    }

    Ok((Inventory::new(hosts), warnings))
}
