//! Project-defined tasks and hooks

use tracing::{debug, info, warn};

use crate::application::runner::{Body, Step};
use crate::config::{Config, CustomTask};
use crate::domain::services::{Task, TaskGraphBuilder};
use crate::error::CutoverResult;

use super::{render, script};

pub(super) fn register(builder: &mut TaskGraphBuilder<Body>, config: &Config) {
    for (name, task) in &config.tasks {
        if builder.contains(name) {
            warn!(task = %name, "custom task replaces the built-in task");
        }
        builder.register(custom_task(name, task));
    }

    for (task, prerequisites) in &config.before {
        for prerequisite in prerequisites {
            debug!(task = %task, before = %prerequisite, "hook");
            builder.declare_before(task.as_str(), prerequisite.as_str());
        }
    }
}

fn custom_task(name: &str, task: &CustomTask) -> Task<Body> {
    let commands = task.run.to_vec();
    let on_hosts = !task.roles.is_empty();
    let body = Body::new(move |step: &Step<'_>| run_commands(step, &commands, on_hosts));

    let mut leaf = Task::leaf(name, body).on_roles(task.roles.iter().copied());
    if task.once {
        leaf = leaf.once();
    }
    match &task.description {
        Some(description) => leaf.describe(description.as_str()),
        None => leaf,
    }
}

/// Host commands start in the deployment root, local ones where cutover runs
fn run_commands(step: &Step<'_>, commands: &[String], on_hosts: bool) -> CutoverResult<()> {
    for command in commands {
        let command = render(step.ctx, command);
        info!(task = step.task, host = %step.host, command = %command, "run");
        let mut spec = script(step.ctx, &command).streaming();
        if on_hosts {
            spec = spec.current_dir(&step.ctx.paths.root);
        }
        step.run(&spec)?;
    }
    Ok(())
}
