//! In-memory collaborators for application tests

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::entities::Host;
use crate::domain::ports::{
    BranchRef, BranchSource, CommandSpec, DatabaseBackend, Executor, FileTransfer,
    LiveReleaseLookup, VersionControl,
};
use crate::domain::value_objects::Identifier;
use crate::error::{CutoverError, CutoverResult};

use super::services::{DatabaseFactory, Services};

/// Replies by substring match against the ssh rendering of each command
#[derive(Default)]
pub struct FakeExecutor {
    rules: Vec<(String, Result<String, i32>)>,
    seen: Mutex<Vec<(String, String)>>,
}

impl FakeExecutor {
    pub fn reply(mut self, needle: &str, out: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(out.to_string())));
        self
    }

    pub fn fail(mut self, needle: &str, code: i32) -> Self {
        self.rules.push((needle.to_string(), Err(code)));
        self
    }

    /// `host: command` in execution order
    pub fn commands(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(host, cmd)| format!("{}: {}", host, cmd))
            .collect()
    }

    pub fn commands_on(&self, host: &str) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }
}

impl Executor for FakeExecutor {
    fn run(&self, host: &Host, command: &CommandSpec) -> CutoverResult<String> {
        let line = command.to_shell();
        let count = {
            let mut seen = self.seen.lock().unwrap();
            seen.push((host.name().to_string(), line.clone()));
            seen.len()
        };
        for (needle, outcome) in &self.rules {
            if line.contains(needle.as_str()) {
                return outcome.clone().map_err(|code| CutoverError::CommandFailed {
                    host: host.to_string(),
                    command: command.display(),
                    code: Some(code),
                    stderr: String::new(),
                });
            }
        }
        // mktemp prints the file it created
        if let Some(template) = line.strip_prefix("mktemp ") {
            return Ok(template.replace("XXXXXX", &format!("{:06}", count)));
        }
        Ok(String::new())
    }
}

/// Version control with a fixed set of branches and commits
#[derive(Default)]
pub struct FakeVcs {
    pub branches: Vec<BranchRef>,
    pub tags: Vec<BranchRef>,
    pub commits: Vec<String>,
    /// `commit:path` entries present in trees
    pub paths: Vec<String>,
    pub log: String,
    pub calls: Mutex<Vec<String>>,
}

impl FakeVcs {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, host: &Host, call: String) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}: {}", host.name(), call));
    }
}

impl BranchSource for FakeVcs {
    fn branches(&self) -> CutoverResult<Vec<BranchRef>> {
        Ok(self.branches.clone())
    }

    fn tags(&self) -> CutoverResult<Vec<BranchRef>> {
        Ok(self.tags.clone())
    }
}

impl VersionControl for FakeVcs {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn init_cache(&self, host: &Host, cache: &str) -> CutoverResult<()> {
        self.record(host, format!("init {}", cache));
        Ok(())
    }

    fn fetch(&self, host: &Host, cache: &str) -> CutoverResult<()> {
        self.record(host, format!("fetch {}", cache));
        Ok(())
    }

    fn has_commit(&self, _host: &Host, _cache: &str, revision: &str) -> CutoverResult<bool> {
        Ok(self.commits.iter().any(|c| c == revision))
    }

    fn has_path(
        &self,
        _host: &Host,
        _cache: &str,
        revision: &str,
        path: &str,
    ) -> CutoverResult<bool> {
        Ok(self.paths.contains(&format!("{}:{}", revision, path)))
    }

    fn export(
        &self,
        host: &Host,
        _cache: &str,
        revision: &str,
        dest: &str,
        paths: &[&str],
    ) -> CutoverResult<()> {
        self.record(
            host,
            format!("export {} {} [{}]", revision, dest, paths.join(",")),
        );
        Ok(())
    }

    fn log(&self, host: &Host, _cache: &str, from: &str, to: &str) -> CutoverResult<String> {
        self.record(host, format!("log {}...{}", from, to));
        Ok(self.log.clone())
    }
}

/// Stage -> live commit
#[derive(Default)]
pub struct FakeLive(pub Mutex<BTreeMap<String, String>>);

impl FakeLive {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        Self(Mutex::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }
}

impl LiveReleaseLookup for FakeLive {
    fn live_commit(&self, stage: &str) -> CutoverResult<Option<String>> {
        Ok(self.0.lock().unwrap().get(stage).cloned())
    }
}

/// Files "on hosts", keyed by remote path
pub type RemoteFiles = Arc<Mutex<BTreeMap<String, String>>>;

/// Moves file content between the real local filesystem and [`RemoteFiles`]
#[derive(Default)]
pub struct FakeTransfer {
    pub remote: RemoteFiles,
}

impl FileTransfer for FakeTransfer {
    fn upload(&self, _host: &Host, local: &Path, remote: &str) -> CutoverResult<()> {
        let content = fs::read_to_string(local)?;
        self.remote
            .lock()
            .unwrap()
            .insert(remote.to_string(), content);
        Ok(())
    }

    fn download(&self, host: &Host, remote: &str, local: &Path) -> CutoverResult<()> {
        let content = self.remote.lock().unwrap().get(remote).cloned().ok_or_else(|| {
            CutoverError::CommandFailed {
                host: host.to_string(),
                command: format!("scp {}", remote),
                code: Some(1),
                stderr: "No such file or directory".to_string(),
            }
        })?;
        fs::write(local, content)?;
        Ok(())
    }
}

/// Every data host talks to one shared in-memory server
#[derive(Default)]
pub struct MemoryDatabases {
    pub noop: bool,
    /// Loading a dump fails, as with a corrupt file
    pub broken_loads: bool,
    pub dbs: Arc<Mutex<BTreeMap<String, String>>>,
    pub files: RemoteFiles,
}

impl MemoryDatabases {
    pub fn with(dbs: &[(&str, &str)]) -> Self {
        let db = Self::default();
        db.dbs
            .lock()
            .unwrap()
            .extend(dbs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        db
    }

    pub fn content(&self, name: &str) -> Option<String> {
        self.dbs.lock().unwrap().get(name).cloned()
    }
}

impl DatabaseFactory for MemoryDatabases {
    fn backend(&self, _host: &Host) -> Box<dyn DatabaseBackend> {
        Box::new(MemoryDb {
            noop: self.noop,
            broken_loads: self.broken_loads,
            dbs: self.dbs.clone(),
            files: self.files.clone(),
        })
    }
}

struct MemoryDb {
    noop: bool,
    broken_loads: bool,
    dbs: Arc<Mutex<BTreeMap<String, String>>>,
    files: RemoteFiles,
}

impl DatabaseBackend for MemoryDb {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_noop(&self) -> bool {
        self.noop
    }

    fn exists(&self, db: &Identifier) -> CutoverResult<bool> {
        Ok(self.dbs.lock().unwrap().contains_key(db.as_str()))
    }

    fn create(&self, db: &Identifier) -> CutoverResult<()> {
        self.dbs.lock().unwrap().insert(db.to_string(), String::new());
        Ok(())
    }

    fn drop(&self, db: &Identifier) -> CutoverResult<()> {
        self.dbs.lock().unwrap().remove(db.as_str());
        Ok(())
    }

    fn rename(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
        let mut dbs = self.dbs.lock().unwrap();
        if let Some(content) = dbs.remove(from.as_str()) {
            dbs.insert(to.to_string(), content);
        }
        Ok(())
    }

    fn duplicate(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
        let mut dbs = self.dbs.lock().unwrap();
        let content = dbs.get(from.as_str()).cloned().unwrap_or_default();
        dbs.insert(to.to_string(), content);
        Ok(())
    }

    fn export(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
        let content = self
            .dbs
            .lock()
            .unwrap()
            .get(db.as_str())
            .cloned()
            .unwrap_or_default();
        self.files.lock().unwrap().insert(file.to_string(), content);
        Ok(())
    }

    fn import(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
        if self.broken_loads {
            return Err(CutoverError::CommandFailed {
                host: "memory".to_string(),
                command: format!("load {} into {}", file, db),
                code: Some(1),
                stderr: "syntax error at line 1".to_string(),
            });
        }
        let content = self
            .files
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .unwrap_or_default();
        self.dbs.lock().unwrap().insert(db.to_string(), content);
        Ok(())
    }
}

/// Handles on every fake, so tests can inspect them after a run
pub struct Fakes {
    pub exec: Arc<FakeExecutor>,
    pub vcs: Arc<FakeVcs>,
    pub live: Arc<FakeLive>,
    pub dbs: Arc<MemoryDatabases>,
    pub transfer: Arc<FakeTransfer>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self::new(FakeExecutor::default())
    }
}

impl Fakes {
    pub fn new(exec: FakeExecutor) -> Self {
        let dbs = MemoryDatabases::default();
        let transfer = FakeTransfer {
            remote: dbs.files.clone(),
        };
        Self {
            exec: Arc::new(exec),
            vcs: Arc::new(FakeVcs::default()),
            live: Arc::new(FakeLive::default()),
            dbs: Arc::new(dbs),
            transfer: Arc::new(transfer),
        }
    }

    pub fn vcs(mut self, vcs: FakeVcs) -> Self {
        self.vcs = Arc::new(vcs);
        self
    }

    pub fn live(mut self, live: FakeLive) -> Self {
        self.live = Arc::new(live);
        self
    }

    /// Swap the database server; transfers keep sharing its file store
    pub fn databases(mut self, dbs: MemoryDatabases) -> Self {
        self.transfer = Arc::new(FakeTransfer {
            remote: dbs.files.clone(),
        });
        self.dbs = Arc::new(dbs);
        self
    }

    pub fn services(&self) -> Services {
        Services {
            executor: self.exec.clone(),
            transfer: self.transfer.clone(),
            vcs: self.vcs.clone(),
            live: self.live.clone(),
            databases: self.dbs.clone(),
        }
    }
}

pub fn fake_services(exec: FakeExecutor) -> Services {
    Fakes::new(exec).services()
}
