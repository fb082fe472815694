//! Version control tasks against the bare cache

use tracing::{debug, info};

use crate::application::runner::{Body, Step};
use crate::domain::entities::Role;
use crate::domain::ports::CommandSpec;
use crate::domain::services::{Task, TaskGraphBuilder};
use crate::error::CutoverResult;

pub const NO_CHANGES: &str = "There are no changes between the deployed and requested revision.";

pub(super) fn register(builder: &mut TaskGraphBuilder<Body>) {
    builder
        .register(
            Task::leaf("vcs:checkout", Body::with_commit(checkout))
                .on_roles([Role::Files])
                .describe("Export the commit into its release directory"),
        )
        .register(
            Task::leaf("vcs:diff", Body::with_commit(diff))
                .on_roles([Role::Files])
                .once()
                .describe("Show commits between the live and requested revision"),
        )
        .register(
            Task::leaf("vcs:persist", Body::with_commit(persist))
                .on_roles([Role::Files])
                .describe("Seed the stage's shares from the commit"),
        );
}

fn checkout(step: &Step<'_>) -> CutoverResult<()> {
    let commit = step.commit()?;
    let release = step.release_dir()?;
    step.run(&CommandSpec::new("mkdir").args(["-p", &release]))?;
    step.services
        .vcs
        .export(step.host, &step.ctx.paths.cache, commit, &release, &[])?;
    info!(host = %step.host, release = %release, "checked out release");
    Ok(())
}

fn diff(step: &Step<'_>) -> CutoverResult<()> {
    let commit = step.commit()?;
    let Some(live) = step.ctx.live_commit.as_deref() else {
        println!("Nothing is deployed on {} yet.", step.ctx.stage);
        return Ok(());
    };
    let log = step
        .services
        .vcs
        .log(step.host, &step.ctx.paths.cache, live, commit)?;
    if log.trim().is_empty() {
        println!("{}", NO_CHANGES);
    } else {
        println!("{}", log.trim_end());
    }
    Ok(())
}

fn persist(step: &Step<'_>) -> CutoverResult<()> {
    let commit = step.commit()?;
    let cache = &step.ctx.paths.cache;
    let dest = step.ctx.paths.stage_shares(&step.ctx.stage);
    for share in &step.ctx.shares {
        if !step.services.vcs.has_path(step.host, cache, commit, share)? {
            debug!(share = %share, "not tracked in commit");
            continue;
        }
        step.services
            .vcs
            .export(step.host, cache, commit, &dest, &[share.as_str()])?;
        info!(host = %step.host, share = %share, "persisted share from commit");
    }
    Ok(())
}
