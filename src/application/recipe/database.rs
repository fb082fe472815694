//! Blue-green database tasks
//!
//! Every mutating task runs `once`, on the first data host of the stage.
//! Dumps travel through `mktemp` scratch files in `/tmp` on the data hosts
//! and a temporary directory on the operator machine. Scratch files are
//! removed whether or not the dump or load succeeded.

use tracing::{debug, info, warn};

use crate::application::runner::{Body, Step};
use crate::domain::entities::{GenerationNames, Host, Role};
use crate::domain::ports::{CommandSpec, DatabaseBackend};
use crate::domain::services::{DatabaseSwapEngine, Rollout, Task, TaskGraphBuilder};
use crate::error::{CutoverError, CutoverResult};

pub(super) fn register(builder: &mut TaskGraphBuilder<Body>) {
    let data = |name: &str, body: fn(&Step<'_>) -> CutoverResult<()>, about: &str| {
        Task::leaf(name, Body::new(body))
            .on_roles([Role::Data])
            .once()
            .describe(about)
    };

    builder
        .register(data("db:drop", db_drop, "Drop the staged database"))
        .register(data("db:create", db_create, "Create an empty staged database"))
        .register(data(
            "db:duplicate",
            db_duplicate,
            "Copy the source stage's database into the staged slot",
        ))
        .register(data("db:export", db_export, "Dump the current database to --output"))
        .register(data("db:import", db_import, "Load --input into a new staged database"))
        .register(data("db:rollout", db_rollout, "Promote the staged database"))
        .register(data("db:rollback", db_rollback, "Restore the previous database"))
        .register(
            Task::leaf("sync:database", Body::new(sync_database))
                .describe("Copy the source stage's database into the staged slot"),
        );
}

/// Runs `work` against a fresh scratch file on `host`, then removes it
fn with_scratch<T>(
    step: &Step<'_>,
    host: &Host,
    stage: &str,
    label: &str,
    work: impl FnOnce(&str) -> CutoverResult<T>,
) -> CutoverResult<T> {
    let template = format!("/tmp/cutover-{}-{}.XXXXXX", stage, label);
    let path = step
        .services
        .executor
        .run(host, &CommandSpec::new("mktemp").arg(template))?;
    if path.is_empty() {
        return Err(CutoverError::CommandFailed {
            host: host.to_string(),
            command: "mktemp".to_string(),
            code: None,
            stderr: "no file name printed".to_string(),
        });
    }

    let outcome = work(&path);
    let removed = remove(step, host, &path);
    match outcome {
        Ok(value) => removed.map(|()| value),
        Err(err) => {
            if let Err(cleanup) = removed {
                warn!(host = %host, file = %path, error = %cleanup, "scratch dump left behind");
            }
            Err(err)
        }
    }
}

fn names(step: &Step<'_>, stage: &str) -> CutoverResult<GenerationNames> {
    step.ctx
        .generations(stage)?
        .ok_or(CutoverError::MissingConfig { key: "db.name" })
}

/// Engine for the step's stage, `None` when no database is managed
fn engine<'b>(
    step: &Step<'_>,
    backend: &'b dyn DatabaseBackend,
) -> CutoverResult<Option<DatabaseSwapEngine<'b>>> {
    if backend.is_noop() {
        debug!(task = step.task, "no database configured, skipping");
        return Ok(None);
    }
    let names = names(step, &step.ctx.stage)?;
    Ok(Some(DatabaseSwapEngine::new(backend, names)))
}

fn remove(step: &Step<'_>, host: &Host, file: &str) -> CutoverResult<()> {
    step.services
        .executor
        .run(host, &CommandSpec::new("rm").args(["-f", file]))?;
    Ok(())
}

fn db_drop(step: &Step<'_>) -> CutoverResult<()> {
    let backend = step.database();
    if let Some(engine) = engine(step, backend.as_ref())? {
        if !engine.drop_new()? {
            debug!(db = %engine.names().new_slot(), "nothing to drop");
        }
    }
    Ok(())
}

fn db_create(step: &Step<'_>) -> CutoverResult<()> {
    let backend = step.database();
    let Some(engine) = engine(step, backend.as_ref())? else {
        return Ok(());
    };
    if step.ctx.force {
        step.invoke("db:drop")?;
    }
    engine.create(step.ctx.force)
}

fn db_duplicate(step: &Step<'_>) -> CutoverResult<()> {
    let backend = step.database();
    let Some(engine) = engine(step, backend.as_ref())? else {
        return Ok(());
    };
    let source = names(step, &step.ctx.source)?;
    engine.duplicate(step.ctx.force, &source)
}

fn db_export(step: &Step<'_>) -> CutoverResult<()> {
    let output = step
        .ctx
        .output
        .as_deref()
        .ok_or_else(|| CutoverError::MissingOption {
            task: step.task.to_string(),
            option: "--output",
        })?;
    let backend = step.database();
    let Some(engine) = engine(step, backend.as_ref())? else {
        return Ok(());
    };

    if step.host.is_local() {
        return engine.export(&output.to_string_lossy());
    }

    with_scratch(step, step.host, &step.ctx.stage, "export", |scratch| {
        engine.export(scratch)?;
        step.services.transfer.download(step.host, scratch, output)
    })?;
    info!(file = %output.display(), "database exported");
    Ok(())
}

fn db_import(step: &Step<'_>) -> CutoverResult<()> {
    let input = step
        .ctx
        .input
        .as_deref()
        .ok_or_else(|| CutoverError::MissingOption {
            task: step.task.to_string(),
            option: "--input",
        })?;
    if !input.is_file() {
        return Err(CutoverError::InputNotFound {
            path: input.to_path_buf(),
        });
    }
    let backend = step.database();
    let Some(engine) = engine(step, backend.as_ref())? else {
        return Ok(());
    };

    step.invoke("db:create")?;

    if step.host.is_local() {
        return engine.load(&input.to_string_lossy());
    }

    with_scratch(step, step.host, &step.ctx.stage, "import", |scratch| {
        step.services.transfer.upload(step.host, input, scratch)?;
        engine.load(scratch)
    })
}

fn db_rollout(step: &Step<'_>) -> CutoverResult<()> {
    let backend = step.database();
    let Some(engine) = engine(step, backend.as_ref())? else {
        return Ok(());
    };
    match engine.rollout()? {
        Rollout::NothingToRollOut => {
            info!(db = %engine.names().new_slot(), "nothing to roll out")
        }
        Rollout::Promoted { retired } => {
            debug!(db = %engine.names().current(), retired, "rolled out")
        }
    }
    Ok(())
}

fn db_rollback(step: &Step<'_>) -> CutoverResult<()> {
    let backend = step.database();
    match engine(step, backend.as_ref())? {
        Some(engine) => engine.rollback(),
        None => Ok(()),
    }
}

/// Export the source stage's CURRENT and import it as this stage's NEW
fn sync_database(step: &Step<'_>) -> CutoverResult<()> {
    let ctx = step.ctx;
    if ctx.source == ctx.stage {
        debug!(stage = %ctx.stage, "source is the target stage, not syncing database");
        return Ok(());
    }

    let inventory = step.inventory();
    let Some(dest_host) = inventory.first(&ctx.stage, Role::Data) else {
        warn!(stage = %ctx.stage, "no data host, not syncing database");
        return Ok(());
    };
    let dest_backend = step.services.databases.backend(dest_host);
    if dest_backend.is_noop() {
        debug!("no database configured, skipping");
        return Ok(());
    }
    let source_host = inventory
        .first(&ctx.source, Role::Data)
        .ok_or_else(|| CutoverError::NoHost {
            stage: ctx.source.clone(),
            role: Role::Data.to_string(),
        })?;
    let source_backend = step.services.databases.backend(source_host);

    let source = DatabaseSwapEngine::new(source_backend.as_ref(), names(step, &ctx.source)?);
    let dest = DatabaseSwapEngine::new(dest_backend.as_ref(), names(step, &ctx.stage)?);

    let local = tempfile::tempdir()?;
    let dump = local.path().join(format!("{}.sql", source.names().current()));

    with_scratch(step, source_host, &ctx.source, "export", |exported| {
        source.export(exported)?;
        step.services.transfer.download(source_host, exported, &dump)
    })?;

    with_scratch(step, dest_host, &ctx.stage, "import", |imported| {
        step.services.transfer.upload(dest_host, &dump, imported)?;
        dest.import(imported, ctx.force)
    })?;

    info!(
        from = %source.names().current(),
        to = %dest.names().new_slot(),
        "database synced"
    );
    Ok(())
}
