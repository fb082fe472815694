//! Collaborators shared by every task body

use std::sync::Arc;
use std::time::Duration;

use crate::config::Project;
use crate::domain::entities::Host;
use crate::domain::ports::{
    DatabaseBackend, Executor, FileTransfer, LiveReleaseLookup, VersionControl,
};
use crate::error::CutoverResult;
use crate::infrastructure::{
    DbKind, DbSettings, StagePointers, SystemExecutor, SystemTransfer, VcsKind,
};

use super::context::Paths;

/// Hands out a database backend bound to a data host
pub trait DatabaseFactory: Send + Sync {
    fn backend(&self, host: &Host) -> Box<dyn DatabaseBackend>;
}

pub struct SystemDatabases {
    kind: DbKind,
    executor: Arc<dyn Executor>,
    settings: DbSettings,
}

impl SystemDatabases {
    pub fn new(kind: DbKind, executor: Arc<dyn Executor>, settings: DbSettings) -> Self {
        Self {
            kind,
            executor,
            settings,
        }
    }
}

impl DatabaseFactory for SystemDatabases {
    fn backend(&self, host: &Host) -> Box<dyn DatabaseBackend> {
        self.kind
            .backend(self.executor.clone(), host.clone(), self.settings.clone())
    }
}

pub struct Services {
    pub executor: Arc<dyn Executor>,
    pub transfer: Arc<dyn FileTransfer>,
    pub vcs: Arc<dyn VersionControl>,
    pub live: Arc<dyn LiveReleaseLookup>,
    pub databases: Arc<dyn DatabaseFactory>,
}

impl Services {
    /// Real processes, ssh, scp and the configured backends
    pub fn system(project: &Project, default_timeout: Duration) -> CutoverResult<Self> {
        let config = &project.config;
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor::new(default_timeout));

        let vcs_kind: VcsKind = config.vcs.kind.parse()?;
        let vcs = vcs_kind.backend(
            executor.clone(),
            config.vcs.path.as_deref().unwrap_or_default(),
        );

        let (db_kind, settings) = match &config.db {
            Some(db) => {
                let kind: DbKind = db.kind.parse()?;
                let user = db
                    .user
                    .clone()
                    .unwrap_or_else(|| kind.default_user().to_string());
                (
                    kind,
                    DbSettings {
                        user,
                        role: db.role.clone(),
                        pass: db.pass.clone(),
                        server: db.host.clone(),
                    },
                )
            }
            None => (
                DbKind::None,
                DbSettings {
                    user: String::new(),
                    role: String::new(),
                    pass: None,
                    server: None,
                },
            ),
        };

        let paths = Paths::for_project(project);
        let live = StagePointers::new(
            executor.clone(),
            Arc::new(project.inventory.clone()),
            paths.stages,
        );

        Ok(Self {
            transfer: Arc::new(SystemTransfer::new()),
            vcs,
            live: Arc::new(live),
            databases: Arc::new(SystemDatabases::new(db_kind, executor.clone(), settings)),
            executor,
        })
    }
}
