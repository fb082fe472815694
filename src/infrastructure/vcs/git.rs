//! Git backend
//!
//! The remote is only queried for branch heads and tags from the operator
//! machine.
//! Everything else happens in a bare cache clone on each files host.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::Host;
use crate::domain::ports::{
    BranchRef, BranchSource, CommandSpec, Executor, ShellPipeline, VersionControl,
};
use crate::error::CutoverResult;

pub struct GitBackend {
    executor: Arc<dyn Executor>,
    remote: String,
    operator: Host,
}

impl GitBackend {
    pub fn new(executor: Arc<dyn Executor>, remote: impl Into<String>) -> Self {
        Self {
            executor,
            remote: remote.into(),
            operator: Host::local("local", ""),
        }
    }

    fn git(cache: &str) -> CommandSpec {
        CommandSpec::new("git").current_dir(cache)
    }
}

/// Parse `git ls-remote --heads` output (`<sha>\trefs/heads/<name>`)
pub fn parse_heads(output: &str) -> Vec<BranchRef> {
    output
        .lines()
        .filter_map(|line| {
            let (commit, reference) = line.split_once('\t')?;
            let name = reference.trim().strip_prefix("refs/heads/")?;
            Some(BranchRef {
                name: name.to_string(),
                commit: commit.trim().to_string(),
            })
        })
        .collect()
}

/// Parse `git ls-remote --tags` output
///
/// Annotated tags are listed twice; the peeled `<name>^{}` line carries the
/// commit and wins over the tag object.
pub fn parse_tags(output: &str) -> Vec<BranchRef> {
    let mut tags: BTreeMap<String, (bool, String)> = BTreeMap::new();
    for line in output.lines() {
        let Some((commit, reference)) = line.split_once('\t') else {
            continue;
        };
        let Some(name) = reference.trim().strip_prefix("refs/tags/") else {
            continue;
        };
        let (name, peeled) = match name.strip_suffix("^{}") {
            Some(name) => (name, true),
            None => (name, false),
        };
        let entry = tags
            .entry(name.to_string())
            .or_insert((peeled, commit.trim().to_string()));
        if peeled && !entry.0 {
            *entry = (true, commit.trim().to_string());
        }
    }
    tags.into_iter()
        .map(|(name, (_, commit))| BranchRef { name, commit })
        .collect()
}

impl BranchSource for GitBackend {
    fn branches(&self) -> CutoverResult<Vec<BranchRef>> {
        let out = self.executor.run(
            &self.operator,
            &CommandSpec::new("git").args(["ls-remote", "--heads", &self.remote]),
        )?;
        let heads = parse_heads(&out);
        debug!(remote = %self.remote, count = heads.len(), "listed branch heads");
        Ok(heads)
    }

    fn tags(&self) -> CutoverResult<Vec<BranchRef>> {
        let out = self.executor.run(
            &self.operator,
            &CommandSpec::new("git").args(["ls-remote", "--tags", &self.remote]),
        )?;
        let tags = parse_tags(&out);
        debug!(remote = %self.remote, count = tags.len(), "listed tags");
        Ok(tags)
    }
}

impl VersionControl for GitBackend {
    fn name(&self) -> &'static str {
        "git"
    }

    fn init_cache(&self, host: &Host, cache: &str) -> CutoverResult<()> {
        let head = format!("{}/HEAD", cache);
        if self
            .executor
            .test(host, &CommandSpec::new("test").args(["-f", &head]))?
        {
            debug!(host = %host, cache, "cache already cloned");
            return Ok(());
        }
        self.executor.run(
            host,
            &CommandSpec::new("git")
                .args(["clone", "--bare", &self.remote, cache])
                .unbounded(),
        )?;
        Ok(())
    }

    fn fetch(&self, host: &Host, cache: &str) -> CutoverResult<()> {
        self.executor.run(
            host,
            &Self::git(cache)
                .args([
                    "fetch",
                    "--prune",
                    "origin",
                    "+refs/heads/*:refs/heads/*",
                    "+refs/tags/*:refs/tags/*",
                ])
                .unbounded(),
        )?;
        Ok(())
    }

    fn has_commit(&self, host: &Host, cache: &str, revision: &str) -> CutoverResult<bool> {
        self.executor.test(
            host,
            &Self::git(cache).args(["cat-file", "-e", &format!("{}^{{commit}}", revision)]),
        )
    }

    fn has_path(
        &self,
        host: &Host,
        cache: &str,
        revision: &str,
        path: &str,
    ) -> CutoverResult<bool> {
        self.executor.test(
            host,
            &Self::git(cache).args(["cat-file", "-e", &format!("{}:{}", revision, path)]),
        )
    }

    fn export(
        &self,
        host: &Host,
        cache: &str,
        revision: &str,
        dest: &str,
        paths: &[&str],
    ) -> CutoverResult<()> {
        let mut archive = vec!["archive".to_string(), revision.to_string()];
        if !paths.is_empty() {
            archive.push("--".to_string());
            archive.extend(paths.iter().map(|p| p.to_string()));
        }
        let pipeline = ShellPipeline::new()
            .stage("git", archive)
            .stage("tar", ["-x", "--directory", dest]);
        self.executor.run(
            host,
            &CommandSpec::pipeline(pipeline)
                .current_dir(cache)
                .unbounded(),
        )?;
        Ok(())
    }

    fn log(&self, host: &Host, cache: &str, from: &str, to: &str) -> CutoverResult<String> {
        self.executor.run(
            host,
            &Self::git(cache).args(["log", "--oneline", &format!("{}...{}", from, to)]),
        )
    }
}
