//! Preconditions that refuse to continue unless forced

use tracing::debug;

use crate::application::runner::{Body, Step};
use crate::domain::entities::Role;
use crate::domain::ports::CommandSpec;
use crate::domain::services::{Task, TaskGraphBuilder};
use crate::error::{CutoverError, CutoverResult};

pub(super) fn register(builder: &mut TaskGraphBuilder<Body>) {
    builder
        .register(
            Task::leaf("test:release", Body::with_commit(test_release))
                .on_roles([Role::Serving])
                .describe("Refuse to redeploy the live commit"),
        )
        .register(
            Task::leaf("test:revision", Body::with_commit(test_revision))
                .on_roles([Role::Files])
                .describe("Verify the commit exists in the cache"),
        )
        .register(
            Task::leaf("test:setup", Body::new(test_setup))
                .on_roles([Role::Files])
                .describe("Refuse to set up a stage twice"),
        );
}

fn test_release(step: &Step<'_>) -> CutoverResult<()> {
    let commit = step.commit()?;
    if step.ctx.live_commit.as_deref() == Some(commit) && !step.ctx.force {
        return Err(CutoverError::AlreadyDeployed {
            commit: commit.to_string(),
            stage: step.ctx.stage.clone(),
        });
    }
    Ok(())
}

fn test_revision(step: &Step<'_>) -> CutoverResult<()> {
    let commit = step.commit()?;
    let cache = &step.ctx.paths.cache;
    step.services.vcs.fetch(step.host, cache)?;
    if !step.services.vcs.has_commit(step.host, cache, commit)? {
        return Err(CutoverError::UnresolvedRevision {
            revision: step.ctx.revision.clone(),
        });
    }
    debug!(host = %step.host, commit, "commit present in cache");
    Ok(())
}

fn test_setup(step: &Step<'_>) -> CutoverResult<()> {
    let releases = step.ctx.paths.stage_releases(&step.ctx.stage);
    if !step.ctx.force && step.test(&CommandSpec::new("test").args(["-e", &releases]))? {
        return Err(CutoverError::AlreadySetUp {
            stage: step.ctx.stage.clone(),
        });
    }
    Ok(())
}
