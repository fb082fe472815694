//! PostgreSQL via `psql` / `pg_dump`

use std::sync::Arc;

use crate::domain::entities::Host;
use crate::domain::ports::{CommandSpec, DatabaseBackend, Executor};
use crate::domain::value_objects::Identifier;
use crate::error::CutoverResult;

use super::DbSettings;

/// Maintenance database used for server-level statements
const MAINTENANCE_DB: &str = "postgres";

pub struct Postgres {
    executor: Arc<dyn Executor>,
    host: Host,
    settings: DbSettings,
}

impl Postgres {
    pub fn new(executor: Arc<dyn Executor>, host: Host, settings: DbSettings) -> Self {
        Self {
            executor,
            host,
            settings,
        }
    }

    fn client(&self, program: &str) -> CommandSpec {
        let mut cmd = CommandSpec::new(program).args(["-U", &self.settings.user]);
        if let Some(server) = &self.settings.server {
            cmd = cmd.args(["-h", server]);
        }
        if let Some(pass) = &self.settings.pass {
            cmd = cmd.env("PGPASSWORD", pass);
        }
        cmd
    }

    fn psql(&self) -> CommandSpec {
        self.client("psql").args(["-v", "ON_ERROR_STOP=1"])
    }

    fn statement(&self, sql: &str) -> CutoverResult<()> {
        self.executor.run(
            &self.host,
            &self.psql().args(["-c", sql, MAINTENANCE_DB]),
        )?;
        Ok(())
    }

    fn grant(&self, db: &Identifier) -> CutoverResult<()> {
        if !self.settings.needs_grant() {
            return Ok(());
        }
        self.statement(&format!(
            "GRANT ALL PRIVILEGES ON DATABASE {} TO {}",
            db, self.settings.role
        ))
    }
}

impl DatabaseBackend for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn exists(&self, db: &Identifier) -> CutoverResult<bool> {
        self.executor
            .test(&self.host, &self.client("psql").args(["-c", "\\q", db.as_str()]))
    }

    fn create(&self, db: &Identifier) -> CutoverResult<()> {
        self.statement(&format!(
            "CREATE DATABASE {} OWNER {}",
            db, self.settings.role
        ))?;
        self.grant(db)
    }

    fn drop(&self, db: &Identifier) -> CutoverResult<()> {
        self.statement(&format!("DROP DATABASE {}", db))
    }

    fn rename(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
        self.statement(&format!("ALTER DATABASE {} RENAME TO {}", from, to))
    }

    fn duplicate(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
        let sql = format!(
            "CREATE DATABASE {} TEMPLATE {} OWNER {}",
            to, from, self.settings.role
        );
        self.executor.run(
            &self.host,
            &self.psql().args(["-c", &sql, MAINTENANCE_DB]).unbounded(),
        )?;
        self.grant(to)
    }

    fn export(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
        self.executor.run(
            &self.host,
            &self
                .client("pg_dump")
                .args(["-f", file, db.as_str()])
                .unbounded(),
        )?;
        Ok(())
    }

    fn import(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
        self.executor.run(
            &self.host,
            &self.psql().args(["-f", file, db.as_str()]).unbounded(),
        )?;
        Ok(())
    }
}
