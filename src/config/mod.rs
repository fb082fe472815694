//! Configuration module for Cutover
//!
//! A project is a deployment document (`deploy.yml` / `deploy.toml`) plus an
//! optional host inventory (`hosts.yml`) next to it:
//! 1. `-f <file>` when given
//! 2. The first of `deploy.yml`, `deploy.yaml`, `deploy.toml` in the working directory
//! 3. Built-in defaults (three local stages, no database)

mod inventory;
mod loader;
mod template;
mod types;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::entities::Inventory;
use crate::error::{CutoverError, CutoverResult};

pub use inventory::{load_inventory, parse_inventory, INVENTORY_FILES};
pub use loader::{load_with_warnings, parse_with_warnings, ConfigWarning, CONFIG_FILES};
pub use template::resolve_template;
pub use types::{
    keyed_base, Commands, Config, CustomTask, DbConfig, Keyed, VcsConfig, DEFAULT_BRANCH,
    DEFAULT_SOURCE, DEFAULT_STAGES, DEFAULT_TIMEOUT_SECS, KEYED_LISTS, KEYED_MAPS,
};

/// Everything read from disk before a run
#[derive(Debug, Clone)]
pub struct Project {
    /// The deployment document, if one was found
    pub config_file: Option<PathBuf>,
    /// Directory the document lives in (or the working directory)
    pub dir: PathBuf,
    pub config: Config,
    pub inventory: Inventory,
    pub warnings: Vec<ConfigWarning>,
}

impl Project {
    /// Locate and load the project rooted at `cwd`
    pub fn load(file: Option<&Path>, cwd: &Path) -> CutoverResult<Self> {
        let config_file = match file {
            Some(f) => {
                let f = if f.is_absolute() {
                    f.to_path_buf()
                } else {
                    cwd.join(f)
                };
                if !f.is_file() {
                    return Err(CutoverError::InvalidConfig {
                        file: f,
                        message: "file not found".to_string(),
                    });
                }
                Some(f)
            }
            None => loader::discover(cwd),
        };

        let (config, mut warnings) = match &config_file {
            Some(path) => {
                debug!(file = %path.display(), "loading configuration");
                load_with_warnings(path)?
            }
            None => {
                debug!(dir = %cwd.display(), "no configuration file, using defaults");
                (Config::default(), Vec::new())
            }
        };

        let dir = config_file
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());

        let inventory = match inventory::discover(&dir) {
            Some(path) => {
                debug!(file = %path.display(), "loading host inventory");
                let (inventory, inventory_warnings) = load_inventory(&path)?;
                warnings.extend(inventory_warnings);
                inventory
            }
            None => Inventory::local_for_stages(&config.stages),
        };

        Ok(Self {
            config_file,
            dir,
            config,
            inventory,
            warnings,
        })
    }
}

/// Expand a leading `~` against the operator's home directory
pub fn expand_home(path: &str) -> String {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => format!("{}{}", home.display(), rest),
            None => path.to_string(),
        },
        _ => path.to_string(),
    }
}
