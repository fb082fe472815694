//! Standard task catalogue
//!
//! `standard_graph` registers every built-in task, the composites that chain
//! them, and then the project's own `tasks:` and `before:` entries. A custom
//! task with a built-in name replaces the built-in.

mod custom;
mod database;
mod guards;
mod release;
mod setup;
mod vcs;

use std::collections::BTreeMap;

use crate::config::{resolve_template, Config};
use crate::domain::ports::CommandSpec;
use crate::domain::services::{Task, TaskGraph, TaskGraphBuilder};
use crate::error::CutoverResult;

use super::context::DeploymentContext;
use super::runner::Body;

pub const SETUP: &[&str] = &[
    "test:setup",
    "setup:cache",
    "setup:releases",
    "setup:shares",
    "setup:stages",
    "vcs:persist",
    "db:create",
    "db:rollout",
];

pub const SYNC: &[&str] = &["sync:database", "sync:shares"];

pub const RELEASE: &[&str] = &[
    "release:migrate",
    "release:link",
    "db:rollout",
    "release:commands",
];

pub const TO: &[&str] = &[
    "test:release",
    "vcs:checkout",
    "share",
    "build",
    "sync",
    "release",
    "prune",
];

/// Built-in tasks plus the project's custom tasks and hooks
pub fn standard_graph(config: &Config) -> CutoverResult<TaskGraph<Body>> {
    let mut builder = TaskGraphBuilder::new();

    guards::register(&mut builder);
    setup::register(&mut builder);
    vcs::register(&mut builder);
    release::register(&mut builder);
    database::register(&mut builder);

    builder
        .register(
            Task::group("setup", SETUP.iter().copied())
                .describe("Prepare a stage for its first release"),
        )
        .register(
            Task::group("sync", SYNC.iter().copied())
                .describe("Copy the database and shares from the source stage"),
        )
        .register(
            Task::group("release", RELEASE.iter().copied())
                .describe("Migrate, switch the stage pointer, promote the database"),
        )
        .register(
            Task::group("to", TO.iter().copied()).describe("Deploy a revision to the stage"),
        )
        .declare_before("vcs:checkout", "test:revision");

    custom::register(&mut builder, config);

    builder.build()
}

/// Operator-configured shell command with the stage environment
fn script(ctx: &DeploymentContext, command: &str) -> CommandSpec {
    CommandSpec::script(command).envs(&ctx.env)
}

/// `{{ stage }}`, `{{ source }}` and `{{ root }}` filled in from the context
fn render(ctx: &DeploymentContext, text: &str) -> String {
    let vars = BTreeMap::from([
        ("stage", ctx.stage.clone()),
        ("source", ctx.source.clone()),
        ("root", ctx.paths.root.clone()),
    ]);
    resolve_template(text, &vars)
}
