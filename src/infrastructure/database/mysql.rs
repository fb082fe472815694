//! MySQL / MariaDB via `mysql` / `mysqldump`
//!
//! MySQL has no database rename. It is emulated by creating the target and
//! moving every base table across in one `RENAME TABLE` statement, which the
//! server applies atomically. Views cannot be renamed across schemas, so
//! their definitions are read up front and recreated in the target with
//! schema references rewritten.

use std::sync::Arc;

use crate::domain::entities::Host;
use crate::domain::ports::{CommandSpec, DatabaseBackend, Executor};
use crate::domain::value_objects::Identifier;
use crate::error::{CutoverError, CutoverResult};

use super::DbSettings;

pub struct MySql {
    executor: Arc<dyn Executor>,
    host: Host,
    settings: DbSettings,
}

/// Backtick-quote a table name as reported by the server
fn quote_table(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn names(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Second column of a `SHOW CREATE VIEW` row
///
/// Rows are `name, definition, charset, collation`; the definition may hold
/// tabs of its own, so the trailing two columns are cut from the right.
fn create_view_column(row: &str) -> Option<String> {
    let (_, rest) = row.trim_end_matches('\n').split_once('\t')?;
    let mut tail = rest.rsplitn(3, '\t');
    let (_collation, _charset) = (tail.next()?, tail.next()?);
    tail.next().map(String::from)
}

impl MySql {
    pub fn new(executor: Arc<dyn Executor>, host: Host, settings: DbSettings) -> Self {
        Self {
            executor,
            host,
            settings,
        }
    }

    fn client(&self, program: &str) -> CommandSpec {
        let mut cmd = CommandSpec::new(program).args(["-u", &self.settings.user]);
        if let Some(server) = &self.settings.server {
            cmd = cmd.args(["-h", server]);
        }
        if let Some(pass) = &self.settings.pass {
            cmd = cmd.env("MYSQL_PWD", pass);
        }
        cmd
    }

    fn query(&self, sql: &str) -> CutoverResult<String> {
        self.executor.run(
            &self.host,
            &self
                .client("mysql")
                .args(["--batch", "--skip-column-names", "-e", sql]),
        )
    }

    fn long_statement(&self, sql: &str) -> CutoverResult<()> {
        self.executor.run(
            &self.host,
            &self.client("mysql").args(["-e", sql]).unbounded(),
        )?;
        Ok(())
    }

    fn tables(&self, db: &Identifier) -> CutoverResult<Vec<String>> {
        let out = self.query(&format!(
            "SELECT TABLE_NAME FROM information_schema.TABLES WHERE TABLE_SCHEMA = '{}' AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME",
            db
        ))?;
        Ok(names(&out))
    }

    /// `CREATE VIEW` statements for every view in `from`, retargeted at `to`
    fn view_definitions(&self, from: &Identifier, to: &Identifier) -> CutoverResult<Vec<String>> {
        let out = self.query(&format!(
            "SELECT TABLE_NAME FROM information_schema.VIEWS WHERE TABLE_SCHEMA = '{}' ORDER BY TABLE_NAME",
            from
        ))?;
        let mut definitions = Vec::new();
        for view in names(&out) {
            let row = self.executor.run(
                &self.host,
                &self.client("mysql").args([
                    "--batch",
                    "--raw",
                    "--skip-column-names",
                    "-e",
                    &format!("SHOW CREATE VIEW {}.{}", from, quote_table(&view)),
                ]),
            )?;
            let ddl = create_view_column(&row).ok_or_else(|| CutoverError::CommandFailed {
                host: self.host.to_string(),
                command: format!("SHOW CREATE VIEW {}.{}", from, view),
                code: None,
                stderr: format!("unexpected output: {}", row),
            })?;
            definitions.push(ddl.replace(&format!("`{}`.", from), &format!("`{}`.", to)));
        }
        Ok(definitions)
    }

    /// Views may select from each other, so failures are retried while
    /// each pass still creates at least one
    fn create_views(&self, db: &Identifier, definitions: Vec<String>) -> CutoverResult<()> {
        let mut pending = definitions;
        while !pending.is_empty() {
            let before = pending.len();
            let mut last_error = None;
            let mut failed = Vec::new();
            for ddl in pending {
                let create = self.client("mysql").args([db.as_str(), "-e", &ddl]);
                if let Err(err) = self.executor.run(&self.host, &create) {
                    last_error = Some(err);
                    failed.push(ddl);
                }
            }
            if failed.len() == before {
                if let Some(err) = last_error {
                    return Err(err);
                }
            }
            pending = failed;
        }
        Ok(())
    }

    fn create_empty(&self, db: &Identifier) -> CutoverResult<()> {
        self.query(&format!("CREATE DATABASE {}", db))?;
        Ok(())
    }

    fn grant(&self, db: &Identifier) -> CutoverResult<()> {
        if !self.settings.needs_grant() {
            return Ok(());
        }
        self.query(&format!(
            "GRANT ALL PRIVILEGES ON {}.* TO '{}'",
            db, self.settings.role
        ))?;
        Ok(())
    }
}

impl DatabaseBackend for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn exists(&self, db: &Identifier) -> CutoverResult<bool> {
        let out = self.query(&format!(
            "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = '{}'",
            db
        ))?;
        Ok(out.lines().any(|l| l.trim() == db.as_str()))
    }

    fn create(&self, db: &Identifier) -> CutoverResult<()> {
        self.create_empty(db)?;
        self.grant(db)
    }

    fn drop(&self, db: &Identifier) -> CutoverResult<()> {
        self.query(&format!("DROP DATABASE {}", db))?;
        Ok(())
    }

    fn rename(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
        let tables = self.tables(from)?;
        let views = self.view_definitions(from, to)?;
        self.create_empty(to)?;
        if !tables.is_empty() {
            let moves: Vec<String> = tables
                .iter()
                .map(|t| {
                    let t = quote_table(t);
                    format!("{}.{} TO {}.{}", from, t, to, t)
                })
                .collect();
            self.long_statement(&format!("RENAME TABLE {}", moves.join(", ")))?;
        }
        self.create_views(to, views)?;
        self.drop(from)?;
        self.grant(to)
    }

    fn duplicate(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
        let tables = self.tables(from)?;
        let views = self.view_definitions(from, to)?;
        self.create_empty(to)?;
        for table in tables {
            let t = quote_table(&table);
            self.long_statement(&format!(
                "CREATE TABLE {to}.{t} LIKE {from}.{t}; INSERT INTO {to}.{t} SELECT * FROM {from}.{t}"
            ))?;
        }
        self.create_views(to, views)?;
        self.grant(to)
    }

    fn export(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
        self.executor.run(
            &self.host,
            &self
                .client("mysqldump")
                .args([
                    "--single-transaction".to_string(),
                    format!("--result-file={}", file),
                    db.to_string(),
                ])
                .unbounded(),
        )?;
        Ok(())
    }

    fn import(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
        self.executor.run(
            &self.host,
            &self
                .client("mysql")
                .args([db.as_str(), "-e", &format!("source {}", file)])
                .unbounded(),
        )?;
        Ok(())
    }
}
