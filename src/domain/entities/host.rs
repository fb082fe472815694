//! Host entity and inventory
//!
//! A host belongs to exactly one stage and carries a subset of roles.
//! Hosts without an address are the operator's own machine.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Capability tag gating which tasks execute on a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Serves the live release (owns the stage pointer)
    #[serde(alias = "web")]
    Serving,
    /// Holds the VCS cache, releases and shares
    Files,
    /// Runs the database
    Data,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Serving, Role::Files, Role::Data];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Serving => "serving",
            Role::Files => "files",
            Role::Data => "data",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serving" | "web" => Ok(Role::Serving),
            "files" => Ok(Role::Files),
            "data" => Ok(Role::Data),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A deployment target machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    name: String,
    address: Option<String>,
    user: Option<String>,
    port: Option<u16>,
    stage: String,
    roles: BTreeSet<Role>,
}

impl Host {
    /// A host reached over ssh
    pub fn remote(
        name: impl Into<String>,
        address: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: Some(address.into()),
            user: None,
            port: None,
            stage: stage.into(),
            roles: BTreeSet::new(),
        }
    }

    /// The operator's own machine
    pub fn local(name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            user: None,
            port: None,
            stage: stage.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_local(&self) -> bool {
        self.address.is_none()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// True when the host carries at least one of `filter`
    pub fn matches_any(&self, filter: &[Role]) -> bool {
        filter.iter().any(|r| self.roles.contains(r))
    }

    /// ssh destination (`user@address` or `address`), `None` for local hosts
    pub fn ssh_destination(&self) -> Option<String> {
        let address = self.address.as_ref()?;
        Some(match &self.user {
            Some(user) => format!("{}@{}", user, address),
            None => address.clone(),
        })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Every known host, across all stages
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: Vec<Host>,
}

impl Inventory {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }

    /// One local host per stage, carrying every role
    pub fn local_for_stages<S: AsRef<str>>(stages: &[S]) -> Self {
        let hosts = stages
            .iter()
            .map(|s| Host::local(format!("local{}", s.as_ref()), s.as_ref()).with_roles(Role::ALL))
            .collect();
        Self { hosts }
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Hosts of `stage` whose roles intersect `filter`, in inventory order
    pub fn select(&self, stage: &str, filter: &[Role]) -> Vec<&Host> {
        self.hosts
            .iter()
            .filter(|h| h.stage() == stage && h.matches_any(filter))
            .collect()
    }

    /// First host of `stage` carrying `role`
    pub fn first(&self, stage: &str, role: Role) -> Option<&Host> {
        self.hosts
            .iter()
            .find(|h| h.stage() == stage && h.has_role(role))
    }

    /// Distinct stage labels, in first-seen order
    pub fn stages(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for host in &self.hosts {
            if !seen.contains(&host.stage()) {
                seen.push(host.stage());
            }
        }
        seen
    }
}
