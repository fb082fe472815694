//! Database backends
//!
//! Each backend is bound to one data host and drives the vendor CLI there.
//! Identifiers reaching SQL text are validated `Identifier`s; passwords only
//! travel through the environment.

mod mysql;
mod none;
mod postgres;

use std::str::FromStr;
use std::sync::Arc;

use crate::domain::entities::Host;
use crate::domain::ports::{DatabaseBackend, Executor};
use crate::error::CutoverError;

pub use mysql::MySql;
pub use none::NoDatabase;
pub use postgres::Postgres;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    MySql,
    None,
}

impl FromStr for DbKind {
    type Err = CutoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "none" | "" => Ok(Self::None),
            _ => Err(CutoverError::UnsupportedBackend {
                kind: "database",
                value: s.to_string(),
            }),
        }
    }
}

impl DbKind {
    /// User to connect as when none is configured
    pub fn default_user(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "root",
            Self::None => "",
        }
    }

    pub fn backend(
        self,
        executor: Arc<dyn Executor>,
        host: Host,
        settings: DbSettings,
    ) -> Box<dyn DatabaseBackend> {
        match self {
            Self::Postgres => Box::new(Postgres::new(executor, host, settings)),
            Self::MySql => Box::new(MySql::new(executor, host, settings)),
            Self::None => Box::new(NoDatabase),
        }
    }
}

/// Connection settings shared by the SQL backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    /// Connecting user
    pub user: String,
    /// Owner of created databases
    pub role: String,
    pub pass: Option<String>,
    /// Server address as seen from the data host; the client default when unset
    pub server: Option<String>,
}

impl DbSettings {
    /// Grants are only needed when the owner differs from the connecting user
    pub fn needs_grant(&self) -> bool {
        self.role != self.user
    }
}
