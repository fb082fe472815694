//! Configuration loading
//!
//! `deploy.yml`, `deploy.yaml` or `deploy.toml`. Unknown keys are reported
//! as warnings; stage-keyed entries (`build-prod`, `options-uat`) are picked
//! out of the raw document in a second pass.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CutoverError, CutoverResult};

use super::types::{keyed_base, Config, Keyed, KEYED_MAPS};

/// Searched for, in order, when no file is given
pub const CONFIG_FILES: &[&str] = &["deploy.yml", "deploy.yaml", "deploy.toml"];

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// First config file present in `dir`
pub fn discover(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> CutoverResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path).map_err(|e| CutoverError::InvalidConfig {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_with_warnings(path, &content)
}

/// Parse `content` as if read from `path` (the extension picks the format)
pub fn parse_with_warnings(
    path: &Path,
    content: &str,
) -> CutoverResult<(Config, Vec<ConfigWarning>)> {
    let invalid = |message: String| CutoverError::InvalidConfig {
        file: path.to_path_buf(),
        message,
    };

    if content.trim().is_empty() {
        return Ok((Config::default(), Vec::new()));
    }

    let format = Format::of(path);
    let mut unknown_paths: Vec<String> = Vec::new();
    let mut config: Config = match format {
        Format::Yaml => serde_ignored::deserialize(
            serde_yaml_ng::Deserializer::from_str(content),
            |p| unknown_paths.push(p.to_string()),
        )
        .map_err(|e| invalid(e.to_string()))?,
        Format::Toml => serde_ignored::deserialize(
            toml::de::Deserializer::new(content),
            |p| unknown_paths.push(p.to_string()),
        )
        .map_err(|e| invalid(e.to_string()))?,
    };

    let raw: BTreeMap<String, serde_json::Value> = match format {
        Format::Yaml => serde_yaml_ng::from_str(content).map_err(|e| invalid(e.to_string()))?,
        Format::Toml => toml::from_str(content).map_err(|e| invalid(e.to_string()))?,
    };
    for (key, value) in raw {
        let Some(base) = keyed_base(&key) else {
            continue;
        };
        let keyed: Keyed = serde_json::from_value(value)
            .map_err(|_| invalid(format!("'{}' must be a list or a map", key)))?;
        let wants_map = KEYED_MAPS.contains(&base);
        if wants_map != matches!(keyed, Keyed::Map(_)) {
            let shape = if wants_map { "a map" } else { "a list" };
            return Err(invalid(format!("'{}' must be {}", key, shape)));
        }
        config.keyed.insert(key, keyed);
    }

    let warnings = unknown_paths
        .into_iter()
        .filter(|p| {
            let top = p.split('.').next().unwrap_or(p.as_str());
            keyed_base(top).is_none()
        })
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

pub(crate) fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

pub(crate) fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "stages",
        "root",
        "vcs",
        "db",
        "tasks",
        "before",
        "type",
        "path",
        "name",
        "user",
        "role",
        "roles",
        "pass",
        "run",
        "once",
        "description",
        "share",
        "sync",
        "build",
        "release",
        "migrate",
        "env",
        "options",
        "hostname",
        "port",
        "stage",
        "local",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 && dist < unknown.len() => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(prev[j + 1] + 1, curr[j] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}
