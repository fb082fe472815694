//! Directory layout for a fresh stage

use crate::application::runner::{Body, Step};
use crate::domain::entities::Role;
use crate::domain::ports::CommandSpec;
use crate::domain::services::{Task, TaskGraphBuilder};
use crate::error::CutoverResult;

pub(super) fn register(builder: &mut TaskGraphBuilder<Body>) {
    builder
        .register(
            Task::leaf(
                "setup:cache",
                Body::new(|step: &Step<'_>| {
                    step.services
                        .vcs
                        .init_cache(step.host, &step.ctx.paths.cache)
                }),
            )
            .on_roles([Role::Files])
            .describe("Clone the bare repository cache"),
        )
        .register(
            Task::leaf(
                "setup:releases",
                Body::new(|step: &Step<'_>| {
                    mkdir(step, &step.ctx.paths.stage_releases(&step.ctx.stage))
                }),
            )
            .on_roles([Role::Files])
            .describe("Create the stage's release directory"),
        )
        .register(
            Task::leaf(
                "setup:shares",
                Body::new(|step: &Step<'_>| {
                    mkdir(step, &step.ctx.paths.stage_shares(&step.ctx.stage))
                }),
            )
            .on_roles([Role::Files])
            .describe("Create the stage's share directory"),
        )
        .register(
            Task::leaf(
                "setup:stages",
                Body::new(|step: &Step<'_>| mkdir(step, &step.ctx.paths.stages)),
            )
            .on_roles([Role::Serving])
            .describe("Create the directory holding stage pointers"),
        );
}

fn mkdir(step: &Step<'_>, dir: &str) -> CutoverResult<()> {
    step.run(&CommandSpec::new("mkdir").args(["-p", dir]))?;
    Ok(())
}
