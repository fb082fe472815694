//! Building, sharing and switching releases

use tracing::{debug, info};

use crate::application::runner::{Body, Step};
use crate::domain::entities::Role;
use crate::domain::ports::CommandSpec;
use crate::domain::services::{
    relative_link, ReleasePruner, ShareSynchronizer, Task, TaskGraphBuilder,
};
use crate::error::CutoverResult;

use super::script;

/// Tells migrations which generation to work on
pub const DB_TARGET_VAR: &str = "CUTOVER_DB_TARGET";

pub(super) fn register(builder: &mut TaskGraphBuilder<Body>) {
    builder
        .register(
            Task::leaf("share", Body::with_commit(share))
                .on_roles([Role::Files])
                .describe("Link shares into the release"),
        )
        .register(
            Task::leaf("build", Body::with_commit(build))
                .on_roles([Role::Files])
                .describe("Run build commands in the release"),
        )
        .register(
            Task::leaf("sync:shares", Body::new(sync_shares))
                .on_roles([Role::Files])
                .describe("Mirror shares from the source stage"),
        )
        .register(
            Task::leaf("release:migrate", Body::with_commit(migrate))
                .on_roles([Role::Serving])
                .once()
                .describe("Run migrations from the release"),
        )
        .register(
            Task::leaf("release:link", Body::with_commit(link))
                .on_roles([Role::Serving])
                .describe("Point the stage at the release"),
        )
        .register(
            Task::leaf("release:commands", Body::new(release_commands))
                .on_roles([Role::Serving])
                .describe("Run release commands in the live release"),
        )
        .register(
            Task::leaf("prune", Body::new(prune))
                .on_roles([Role::Files])
                .describe("Remove releases that are not live"),
        );
}

fn share(step: &Step<'_>) -> CutoverResult<()> {
    let release = step.release_dir()?;
    let sync = ShareSynchronizer::new(
        step.services.executor.as_ref(),
        step.host,
        step.ctx.paths.shares.as_str(),
    );
    let linked = sync.link(&step.ctx.stage, &release, &step.ctx.shares)?;
    debug!(host = %step.host, count = linked.len(), "linked shares");
    Ok(())
}

fn build(step: &Step<'_>) -> CutoverResult<()> {
    let release = step.release_dir()?;
    for command in &step.ctx.builds {
        info!(host = %step.host, command = %command, "build");
        step.run(
            &script(step.ctx, command)
                .current_dir(&release)
                .unbounded()
                .streaming(),
        )?;
    }
    Ok(())
}

fn sync_shares(step: &Step<'_>) -> CutoverResult<()> {
    let sync = ShareSynchronizer::new(
        step.services.executor.as_ref(),
        step.host,
        step.ctx.paths.shares.as_str(),
    );
    let report = sync.sync(&step.ctx.source, &step.ctx.stage, &step.ctx.syncs)?;
    info!(
        host = %step.host,
        mirrored = report.mirrored.len(),
        copied = report.copied.len(),
        excluded = report.excluded.len(),
        "synced shares from {}",
        step.ctx.source
    );
    Ok(())
}

fn migrate(step: &Step<'_>) -> CutoverResult<()> {
    if step.ctx.migrations.is_empty() {
        return Ok(());
    }
    let release = step.release_dir()?;
    // a synced database waits in NEW until db:rollout
    let target = if step.ctx.source != step.ctx.stage {
        "new"
    } else {
        "current"
    };
    for command in &step.ctx.migrations {
        info!(host = %step.host, command = %command, target, "migrate");
        step.run(
            &script(step.ctx, command)
                .env(DB_TARGET_VAR, target)
                .current_dir(&release)
                .unbounded()
                .streaming(),
        )?;
    }
    Ok(())
}

fn link(step: &Step<'_>) -> CutoverResult<()> {
    let release = step.release_dir()?;
    let paths = &step.ctx.paths;
    let target = relative_link(&paths.stages, &release);
    let pointer = paths.pointer(&step.ctx.stage);
    step.run(&CommandSpec::new("ln").args(["-sfn", &target, &pointer]))?;
    info!(host = %step.host, pointer = %pointer, target = %target, "switched stage pointer");
    Ok(())
}

fn release_commands(step: &Step<'_>) -> CutoverResult<()> {
    let pointer = step.ctx.paths.pointer(&step.ctx.stage);
    for command in &step.ctx.release_commands {
        info!(host = %step.host, command = %command, "release");
        step.run(
            &script(step.ctx, command)
                .current_dir(&pointer)
                .unbounded()
                .streaming(),
        )?;
    }
    Ok(())
}

fn prune(step: &Step<'_>) -> CutoverResult<()> {
    let pruner = ReleasePruner::new(
        step.services.executor.as_ref(),
        step.services.live.as_ref(),
    );
    let releases = step.ctx.paths.stage_releases(&step.ctx.stage);
    let removed = pruner.prune(step.host, &step.ctx.stage, &releases)?;
    debug!(host = %step.host, removed = removed.len(), "pruned releases");
    Ok(())
}
