//! Deployment context
//!
//! Every per-invocation value is derived once, in a fixed order
//! (stage, options, source, revision, commit, live commit, paths), before
//! any task runs. Tasks only read it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{
    expand_home, resolve_template, Project, DEFAULT_BRANCH, DEFAULT_SOURCE, DEFAULT_TIMEOUT_SECS,
};
use crate::domain::entities::{GenerationNames, Role};
use crate::domain::services::RevisionResolver;
use crate::domain::value_objects::Identifier;
use crate::error::{CutoverError, CutoverResult};

/// Directory layout under the deployment root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: String,
    pub cache: String,
    pub shares: String,
    pub stages: String,
    pub releases: String,
}

impl Paths {
    pub fn new(root: &str) -> Self {
        let root = match root.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        let join = |leaf: &str| format!("{}/{}", root.trim_end_matches('/'), leaf);
        Self {
            cache: join("cache"),
            shares: join("shares"),
            stages: join("stages"),
            releases: join("releases"),
            root,
        }
    }

    /// Root from `root:` (with `~` expanded, relative to the project) or the
    /// project directory
    pub fn for_project(project: &Project) -> Self {
        let root = match &project.config.root {
            Some(root) => {
                let root = expand_home(root);
                if Path::new(&root).is_absolute() {
                    root
                } else {
                    project.dir.join(root).to_string_lossy().into_owned()
                }
            }
            None => project.dir.to_string_lossy().into_owned(),
        };
        Self::new(&root)
    }

    pub fn stage_releases(&self, stage: &str) -> String {
        format!("{}/{}", self.releases, stage)
    }

    pub fn stage_shares(&self, stage: &str) -> String {
        format!("{}/{}", self.shares, stage)
    }

    pub fn release_dir(&self, stage: &str, commit: &str) -> String {
        format!("{}/{}/{}", self.releases, stage, commit)
    }

    pub fn pointer(&self, stage: &str) -> String {
        format!("{}/{}", self.stages, stage)
    }
}

/// What the operator asked for on the command line
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub stage: String,
    pub task: String,
    pub source: Option<String>,
    pub revision: Option<String>,
    pub force: bool,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Immutable per-invocation values
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub stage: String,
    pub source: String,
    /// Revision descriptor as given (or the configured branch)
    pub revision: String,
    commit: Option<String>,
    /// Commit live on `stage` when the run started
    pub live_commit: Option<String>,
    pub paths: Paths,
    pub force: bool,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Extra environment for build, migrate, release and custom commands
    pub env: BTreeMap<String, String>,
    pub shares: Vec<String>,
    pub syncs: Vec<String>,
    pub builds: Vec<String>,
    pub migrations: Vec<String>,
    pub release_commands: Vec<String>,
    pub db_name: Option<String>,
    pub vcs_remote: Option<String>,
}

impl DeploymentContext {
    /// Resolved commit, for tasks that cannot run without one
    pub fn commit(&self, task: &str) -> CutoverResult<&str> {
        self.commit
            .as_deref()
            .ok_or_else(|| CutoverError::RevisionRequired {
                task: task.to_string(),
            })
    }

    pub fn resolved_commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    pub fn release_dir(&self, task: &str) -> CutoverResult<String> {
        Ok(self.paths.release_dir(&self.stage, self.commit(task)?))
    }

    /// Database generation names for `stage`, `None` without `db.name`
    pub fn generations(&self, stage: &str) -> CutoverResult<Option<GenerationNames>> {
        self.db_name
            .as_deref()
            .map(|name| GenerationNames::new(stage, name))
            .transpose()
    }

    /// Context for tests and tooling that bypass resolution
    pub fn builder(stage: &str, root: &str) -> ContextBuilder {
        ContextBuilder {
            ctx: DeploymentContext {
                stage: stage.to_string(),
                source: DEFAULT_SOURCE.to_string(),
                revision: DEFAULT_BRANCH.to_string(),
                commit: None,
                live_commit: None,
                paths: Paths::new(root),
                force: false,
                input: None,
                output: None,
                env: BTreeMap::new(),
                shares: Vec::new(),
                syncs: Vec::new(),
                builds: Vec::new(),
                migrations: Vec::new(),
                release_commands: Vec::new(),
                db_name: None,
                vcs_remote: None,
            },
        }
    }
}

pub struct ContextBuilder {
    ctx: DeploymentContext,
}

impl ContextBuilder {
    pub fn source(mut self, source: &str) -> Self {
        self.ctx.source = source.to_string();
        self
    }

    pub fn commit(mut self, commit: &str) -> Self {
        self.ctx.commit = Some(commit.to_string());
        self
    }

    pub fn live_commit(mut self, commit: &str) -> Self {
        self.ctx.live_commit = Some(commit.to_string());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.ctx.force = force;
        self
    }

    pub fn db_name(mut self, name: &str) -> Self {
        self.ctx.db_name = Some(name.to_string());
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.ctx.input = Some(path.into());
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.ctx.output = Some(path.into());
        self
    }

    pub fn shares<S: Into<String>>(mut self, shares: impl IntoIterator<Item = S>) -> Self {
        self.ctx.shares = shares.into_iter().map(Into::into).collect();
        self
    }

    pub fn syncs<S: Into<String>>(mut self, syncs: impl IntoIterator<Item = S>) -> Self {
        self.ctx.syncs = syncs.into_iter().map(Into::into).collect();
        self
    }

    pub fn builds<S: Into<String>>(mut self, builds: impl IntoIterator<Item = S>) -> Self {
        self.ctx.builds = builds.into_iter().map(Into::into).collect();
        self
    }

    pub fn migrations<S: Into<String>>(mut self, commands: impl IntoIterator<Item = S>) -> Self {
        self.ctx.migrations = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn release_commands<S: Into<String>>(
        mut self,
        commands: impl IntoIterator<Item = S>,
    ) -> Self {
        self.ctx.release_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.ctx.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> DeploymentContext {
        self.ctx
    }
}

/// Builds the [`DeploymentContext`] for one run
pub struct ContextResolver<'a> {
    project: &'a Project,
    revisions: RevisionResolver<'a>,
}

impl<'a> ContextResolver<'a> {
    pub fn new(project: &'a Project, revisions: RevisionResolver<'a>) -> Self {
        Self { project, revisions }
    }

    /// `needs_commit` is true when any planned task works on a release
    pub fn resolve(
        &self,
        request: &RunRequest,
        needs_commit: bool,
    ) -> CutoverResult<DeploymentContext> {
        let config = &self.project.config;

        let stage = request.stage.trim().to_string();
        Identifier::new(stage.as_str())?;
        if self.project.inventory.select(&stage, &Role::ALL).is_empty() {
            return Err(CutoverError::NoHost {
                stage,
                role: "any".to_string(),
            });
        }

        let options = config.merged_map("options", &stage);

        let source = request
            .source
            .clone()
            .or_else(|| options.get("source").cloned())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        Identifier::new(source.as_str())?;

        let revision = request
            .revision
            .clone()
            .or_else(|| options.get("branch").cloned())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        let vcs_remote = config.vcs.path.clone().filter(|p| !p.trim().is_empty());
        let commit = if needs_commit {
            if vcs_remote.is_none() {
                return Err(CutoverError::MissingConfig { key: "vcs.path" });
            }
            let commit = self.revisions.resolve(&revision)?;
            info!(revision = %revision, commit = %commit, "resolved revision");
            Some(commit)
        } else {
            None
        };

        let live_commit = self.revisions.current_live_commit(&stage)?;
        debug!(stage = %stage, live = ?live_commit, "current live release");

        let paths = Paths::for_project(self.project);

        let vars: BTreeMap<&str, String> = BTreeMap::from([
            ("stage", stage.clone()),
            ("source", source.clone()),
            ("root", paths.root.clone()),
        ]);
        let list = |key: &str| -> Vec<String> {
            config
                .merged_list(key, &stage)
                .iter()
                .map(|item| resolve_template(item, &vars))
                .collect()
        };
        let env = config
            .merged_map("env", &stage)
            .into_iter()
            .map(|(k, v)| (k, resolve_template(&v, &vars)))
            .collect();

        let absolute = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(p))
                    .unwrap_or_else(|_| p.clone())
            }
        };

        Ok(DeploymentContext {
            shares: list("share"),
            syncs: list("sync"),
            builds: list("build"),
            migrations: list("migrate"),
            release_commands: list("release"),
            stage,
            source,
            revision,
            commit,
            live_commit,
            paths,
            force: request.force,
            input: request.input.as_ref().map(absolute),
            output: request.output.as_ref().map(absolute),
            env,
            db_name: config.db.as_ref().and_then(|db| db.name.clone()),
            vcs_remote,
        })
    }
}

/// `options.timeout` for `stage`, in seconds
pub fn stage_timeout(project: &Project, stage: &str) -> CutoverResult<Duration> {
    match project.config.merged_map("options", stage).get("timeout") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| CutoverError::InvalidConfig {
                file: project
                    .config_file
                    .clone()
                    .unwrap_or_else(|| project.dir.clone()),
                message: format!("options.timeout must be a number of seconds, got '{}'", raw),
            }),
        None => Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
    }
}
