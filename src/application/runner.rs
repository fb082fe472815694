//! Task execution
//!
//! A requested task is expanded once into its ordered leaves. Each leaf is a
//! barrier: it runs on every matching host of the stage (concurrently when
//! there are several) and must finish everywhere before the next one starts.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::entities::{Host, Inventory, Role};
use crate::domain::ports::{CommandSpec, DatabaseBackend};
use crate::domain::services::{Task, TaskGraph, TaskKind};
use crate::error::CutoverResult;

use super::context::DeploymentContext;
use super::services::Services;

type BodyFn = dyn Fn(&Step<'_>) -> CutoverResult<()> + Send + Sync;

/// What a leaf task does on one host
#[derive(Clone)]
pub struct Body {
    run: Arc<BodyFn>,
    needs_commit: bool,
}

impl Body {
    pub fn new(run: impl Fn(&Step<'_>) -> CutoverResult<()> + Send + Sync + 'static) -> Self {
        Self {
            run: Arc::new(run),
            needs_commit: false,
        }
    }

    /// A body that works on a release and therefore needs a resolved commit
    pub fn with_commit(
        run: impl Fn(&Step<'_>) -> CutoverResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            run: Arc::new(run),
            needs_commit: true,
        }
    }

    pub fn needs_commit(&self) -> bool {
        self.needs_commit
    }

    pub fn call(&self, step: &Step<'_>) -> CutoverResult<()> {
        (self.run)(step)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("needs_commit", &self.needs_commit)
            .finish_non_exhaustive()
    }
}

/// One leaf running on one host
pub struct Step<'a> {
    pub ctx: &'a DeploymentContext,
    pub services: &'a Services,
    pub host: &'a Host,
    pub task: &'a str,
    runner: &'a TaskRunner<'a>,
}

impl<'a> Step<'a> {
    pub fn run(&self, command: &CommandSpec) -> CutoverResult<String> {
        self.services.executor.run(self.host, command)
    }

    pub fn test(&self, command: &CommandSpec) -> CutoverResult<bool> {
        self.services.executor.test(self.host, command)
    }

    /// Run another task to completion from inside this one
    pub fn invoke(&self, name: &str) -> CutoverResult<()> {
        debug!(from = self.task, task = name, "invoking");
        self.runner.run(name)
    }

    pub fn commit(&self) -> CutoverResult<&'a str> {
        self.ctx.commit(self.task)
    }

    pub fn release_dir(&self) -> CutoverResult<String> {
        self.ctx.release_dir(self.task)
    }

    /// Database backend bound to this step's host
    pub fn database(&self) -> Box<dyn DatabaseBackend> {
        self.services.databases.backend(self.host)
    }

    pub fn inventory(&self) -> &'a Inventory {
        self.runner.inventory
    }

    /// The operator machine, for local orchestration
    pub fn operator(&self) -> &'a Host {
        &self.runner.operator
    }

    /// Same step on another host
    pub fn on(&self, host: &'a Host) -> Step<'a> {
        Step {
            ctx: self.ctx,
            services: self.services,
            host,
            task: self.task,
            runner: self.runner,
        }
    }
}

/// Runs tasks of one graph against one stage
pub struct TaskRunner<'a> {
    graph: &'a TaskGraph<Body>,
    inventory: &'a Inventory,
    services: &'a Services,
    ctx: &'a DeploymentContext,
    operator: Host,
}

impl<'a> TaskRunner<'a> {
    pub fn new(
        graph: &'a TaskGraph<Body>,
        inventory: &'a Inventory,
        services: &'a Services,
        ctx: &'a DeploymentContext,
    ) -> Self {
        Self {
            graph,
            inventory,
            services,
            ctx,
            operator: Host::local("local", ctx.stage.as_str()),
        }
    }

    /// Run `name` and everything it expands to; stops at the first failure
    pub fn run(&self, name: &str) -> CutoverResult<()> {
        for task in self.graph.execution_order(name)? {
            self.run_leaf(task)?;
        }
        Ok(())
    }

    fn run_leaf(&self, task: &Task<Body>) -> CutoverResult<()> {
        let TaskKind::Leaf { body, roles, once } = task.kind() else {
            return Ok(());
        };

        if roles.is_empty() {
            info!(task = task.name(), "running");
            return body.call(&self.step(task.name(), &self.operator));
        }

        let mut hosts = self.inventory.select(&self.ctx.stage, roles);
        if hosts.is_empty() {
            warn!(
                task = task.name(),
                stage = %self.ctx.stage,
                roles = %role_list(roles),
                "no matching host, skipping"
            );
            return Ok(());
        }
        if *once {
            hosts.truncate(1);
        }

        match hosts.as_slice() {
            [host] => self.run_on(task, body, host),
            _ => hosts
                .par_iter()
                .try_for_each(|host| self.run_on(task, body, host)),
        }
    }

    fn run_on(&self, task: &Task<Body>, body: &Body, host: &Host) -> CutoverResult<()> {
        info!(task = task.name(), host = %host, "running");
        body.call(&self.step(task.name(), host))
    }

    fn step<'s>(&'s self, task: &'s str, host: &'s Host) -> Step<'s> {
        Step {
            ctx: self.ctx,
            services: self.services,
            host,
            task,
            runner: self,
        }
    }
}

/// Whether any leaf of `name` works on a release
pub fn needs_commit(graph: &TaskGraph<Body>, name: &str) -> CutoverResult<bool> {
    Ok(graph
        .execution_order(name)?
        .iter()
        .any(|task| matches!(task.kind(), TaskKind::Leaf { body, .. } if body.needs_commit())))
}

/// Execution order of `name`, one line per leaf
pub fn render_plan(graph: &TaskGraph<Body>, name: &str) -> CutoverResult<String> {
    let order = graph.execution_order(name)?;
    let width = order.iter().map(|t| t.name().len()).max().unwrap_or(0);
    let mut out = String::new();
    for (i, task) in order.iter().enumerate() {
        let once = matches!(task.kind(), TaskKind::Leaf { once: true, .. });
        let target = if task.is_local() {
            "local".to_string()
        } else if once {
            format!("{} (once)", role_list(task.roles()))
        } else {
            role_list(task.roles())
        };
        let line = format!(
            "{:>2}. {:<width$}  {:<14} {}",
            i + 1,
            task.name(),
            target,
            task.description(),
            width = width
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

fn role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
