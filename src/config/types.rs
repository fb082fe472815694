//! Configuration type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Role;

/// Keys whose value is a list, unioned with `<key>-<stage>`
pub const KEYED_LISTS: &[&str] = &["share", "sync", "build", "release", "migrate"];

/// Keys whose value is a map, merged with `<key>-<stage>`
pub const KEYED_MAPS: &[&str] = &["env", "options"];

pub const DEFAULT_STAGES: &[&str] = &["dev", "uat", "prod"];
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_SOURCE: &str = "prod";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Version control section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsConfig {
    #[serde(rename = "type", default = "default_vcs_type")]
    pub kind: String,

    #[serde(default)]
    pub path: Option<String>,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            kind: default_vcs_type(),
            path: None,
        }
    }
}

fn default_vcs_type() -> String {
    "git".to_string()
}

/// Database section
///
/// Without a `db` section no database is managed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(rename = "type", default = "default_db_type")]
    pub kind: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Connecting user; backend default when unset
    #[serde(default)]
    pub user: Option<String>,

    /// Owner of created databases
    #[serde(default = "default_db_role")]
    pub role: String,

    #[serde(default)]
    pub pass: Option<String>,

    /// Database server handed to the client as `-h`
    #[serde(default)]
    pub host: Option<String>,
}

fn default_db_type() -> String {
    "pgsql".to_string()
}

fn default_db_role() -> String {
    "web".to_string()
}

/// One or many shell commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Commands {
    One(String),
    Many(Vec<String>),
}

impl Default for Commands {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Commands {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(cmd) => vec![cmd.clone()],
            Self::Many(cmds) => cmds.clone(),
        }
    }
}

/// Operator-defined task from the `tasks` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTask {
    /// Empty runs the commands once on the operator machine
    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default)]
    pub run: Commands,

    #[serde(default)]
    pub once: bool,

    #[serde(default)]
    pub description: Option<String>,
}

/// Value of a stage-keyed entry (`build`, `build-prod`, `options`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keyed {
    List(Vec<String>),
    Map(BTreeMap<String, serde_json::Value>),
    Scalar(String),
}

/// Main configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,

    /// Directory holding cache/, releases/, shares/ and stages/
    #[serde(default)]
    pub root: Option<String>,

    #[serde(default)]
    pub vcs: VcsConfig,

    #[serde(default)]
    pub db: Option<DbConfig>,

    #[serde(default)]
    pub tasks: BTreeMap<String, CustomTask>,

    /// task -> tasks to run immediately before it
    #[serde(default)]
    pub before: BTreeMap<String, Vec<String>>,

    /// Stage-keyed entries, filled by the loader
    #[serde(skip)]
    pub keyed: BTreeMap<String, Keyed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            root: None,
            vcs: VcsConfig::default(),
            db: None,
            tasks: BTreeMap::new(),
            before: BTreeMap::new(),
            keyed: BTreeMap::new(),
        }
    }
}

fn default_stages() -> Vec<String> {
    DEFAULT_STAGES.iter().map(|s| s.to_string()).collect()
}

/// Base key of a stage-keyed entry: `build-prod` -> `build`
pub fn keyed_base(key: &str) -> Option<&'static str> {
    KEYED_LISTS
        .iter()
        .chain(KEYED_MAPS)
        .find(|base| {
            key == **base
                || key
                    .strip_prefix(**base)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .is_some_and(|stage| !stage.is_empty())
        })
        .copied()
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Config {
    fn keyed_entries(&self, key: &str, stage: &str) -> [Option<&Keyed>; 2] {
        [
            self.keyed.get(key),
            self.keyed.get(&format!("{}-{}", key, stage)),
        ]
    }

    /// Union of `key` and `key-<stage>`, first occurrence wins
    pub fn merged_list(&self, key: &str, stage: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in self.keyed_entries(key, stage).into_iter().flatten() {
            let items = match entry {
                Keyed::List(items) => items.clone(),
                Keyed::Scalar(item) => vec![item.clone()],
                Keyed::Map(_) => Vec::new(),
            };
            for item in items {
                if !out.contains(&item) {
                    out.push(item);
                }
            }
        }
        out
    }

    /// `key` overlaid with `key-<stage>`
    pub fn merged_map(&self, key: &str, stage: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for entry in self.keyed_entries(key, stage).into_iter().flatten() {
            if let Keyed::Map(map) = entry {
                for (k, v) in map {
                    out.insert(k.clone(), scalar_to_string(v));
                }
            }
        }
        out
    }
}
