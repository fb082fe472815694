//! Blue-green database swap
//!
//! Each stage has up to three generations of one logical database: CURRENT
//! serves traffic, NEW is staged beside it, OLD is the previous CURRENT kept
//! for rollback. All transitions are renames, so promotion is as atomic as
//! the backend's rename.

use tracing::{info, warn};

use crate::domain::entities::GenerationNames;
use crate::domain::ports::DatabaseBackend;
use crate::error::{CutoverError, CutoverResult};

/// Result of [`DatabaseSwapEngine::rollout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollout {
    /// No staged generation existed
    NothingToRollOut,
    /// NEW became CURRENT; `retired` is true when a previous CURRENT became OLD
    Promoted { retired: bool },
}

pub struct DatabaseSwapEngine<'a> {
    backend: &'a dyn DatabaseBackend,
    names: GenerationNames,
}

impl<'a> DatabaseSwapEngine<'a> {
    pub fn new(backend: &'a dyn DatabaseBackend, names: GenerationNames) -> Self {
        Self { backend, names }
    }

    pub fn names(&self) -> &GenerationNames {
        &self.names
    }

    /// Make room for a fresh NEW, dropping a stale one only when forced
    fn clear_new(&self, force: bool) -> CutoverResult<()> {
        let new = self.names.new_slot();
        if self.backend.exists(new)? {
            if !force {
                return Err(CutoverError::DatabaseExists {
                    name: new.to_string(),
                });
            }
            info!(db = %new, "dropping existing staged database");
            self.backend.drop(new)?;
        }
        Ok(())
    }

    /// Create an empty NEW
    pub fn create(&self, force: bool) -> CutoverResult<()> {
        if self.backend.is_noop() {
            return Ok(());
        }
        self.clear_new(force)?;
        info!(db = %self.names.new_slot(), backend = self.backend.name(), "creating database");
        self.backend.create(self.names.new_slot())
    }

    /// Create NEW as a copy of `source`'s CURRENT
    pub fn duplicate(&self, force: bool, source: &GenerationNames) -> CutoverResult<()> {
        if self.backend.is_noop() {
            return Ok(());
        }
        self.clear_new(force)?;
        info!(
            from = %source.current(),
            to = %self.names.new_slot(),
            "duplicating database"
        );
        self.backend.duplicate(source.current(), self.names.new_slot())
    }

    /// Promote NEW to CURRENT, retiring CURRENT to OLD
    pub fn rollout(&self) -> CutoverResult<Rollout> {
        if self.backend.is_noop() {
            return Ok(Rollout::NothingToRollOut);
        }
        let (current, new, old) = (self.names.current(), self.names.new_slot(), self.names.old());

        if !self.backend.exists(new)? {
            info!(db = %new, "nothing to roll out");
            return Ok(Rollout::NothingToRollOut);
        }

        let retired = self.backend.exists(current)?;
        if retired {
            if self.backend.exists(old)? {
                self.backend.drop(old)?;
            }
            self.backend.rename(current, old)?;
        }
        self.backend.rename(new, current)?;

        info!(db = %current, retired, "rolled out staged database");
        Ok(Rollout::Promoted { retired })
    }

    /// Restore OLD as CURRENT; NEW is left alone
    pub fn rollback(&self) -> CutoverResult<()> {
        if self.backend.is_noop() {
            return Ok(());
        }
        let (current, old) = (self.names.current(), self.names.old());

        if !self.backend.exists(old)? {
            return Err(CutoverError::NothingToRollBack {
                name: old.to_string(),
            });
        }
        if self.backend.exists(current)? {
            self.backend.drop(current)?;
        }
        self.backend.rename(old, current)?;
        if self.backend.exists(self.names.new_slot())? {
            warn!(db = %self.names.new_slot(), "staged database still pending after rollback");
        }
        info!(db = %current, "rolled back to previous database");
        Ok(())
    }

    /// Drop NEW if present
    pub fn drop_new(&self) -> CutoverResult<bool> {
        if self.backend.is_noop() {
            return Ok(false);
        }
        let new = self.names.new_slot();
        if !self.backend.exists(new)? {
            return Ok(false);
        }
        self.backend.drop(new)?;
        info!(db = %new, "dropped staged database");
        Ok(true)
    }

    /// Dump CURRENT into `file` on the data host
    pub fn export(&self, file: &str) -> CutoverResult<()> {
        if self.backend.is_noop() {
            return Ok(());
        }
        info!(db = %self.names.current(), file, "exporting database");
        self.backend.export(self.names.current(), file)
    }

    /// Create NEW and load `file` (already on the data host) into it
    pub fn import(&self, file: &str, force: bool) -> CutoverResult<()> {
        if self.backend.is_noop() {
            return Ok(());
        }
        self.create(force)?;
        self.load(file)
    }

    /// Load `file` into an already created NEW
    pub fn load(&self, file: &str) -> CutoverResult<()> {
        if self.backend.is_noop() {
            return Ok(());
        }
        info!(db = %self.names.new_slot(), file, "importing database");
        self.backend.import(self.names.new_slot(), file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Identifier;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Databases as name -> content marker
    #[derive(Default)]
    struct MemoryBackend {
        dbs: Mutex<HashMap<String, String>>,
    }

    impl MemoryBackend {
        fn with(dbs: &[(&str, &str)]) -> Self {
            Self {
                dbs: Mutex::new(
                    dbs.iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
            }
        }

        fn content(&self, name: &str) -> Option<String> {
            self.dbs.lock().unwrap().get(name).cloned()
        }
    }

    impl DatabaseBackend for MemoryBackend {
        fn name(&self) -> &'static str {
            "memory"
        }

        fn exists(&self, db: &Identifier) -> CutoverResult<bool> {
            Ok(self.dbs.lock().unwrap().contains_key(db.as_str()))
        }

        fn create(&self, db: &Identifier) -> CutoverResult<()> {
            self.dbs
                .lock()
                .unwrap()
                .insert(db.to_string(), String::new());
            Ok(())
        }

        fn drop(&self, db: &Identifier) -> CutoverResult<()> {
            self.dbs.lock().unwrap().remove(db.as_str());
            Ok(())
        }

        fn rename(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
            let mut dbs = self.dbs.lock().unwrap();
            assert!(!dbs.contains_key(to.as_str()), "rename onto existing {to}");
            let content = dbs.remove(from.as_str()).expect("rename source exists");
            dbs.insert(to.to_string(), content);
            Ok(())
        }

        fn duplicate(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()> {
            let mut dbs = self.dbs.lock().unwrap();
            let content = dbs.get(from.as_str()).cloned().expect("duplicate source exists");
            dbs.insert(to.to_string(), content);
            Ok(())
        }

        fn export(&self, _db: &Identifier, _file: &str) -> CutoverResult<()> {
            Ok(())
        }

        fn import(&self, db: &Identifier, file: &str) -> CutoverResult<()> {
            self.dbs
                .lock()
                .unwrap()
                .insert(db.to_string(), format!("from {file}"));
            Ok(())
        }
    }

    fn names(stage: &str) -> GenerationNames {
        GenerationNames::new(stage, "app").unwrap()
    }

    #[test]
    fn create_twice_requires_force() {
        let backend = MemoryBackend::default();
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));

        engine.create(false).unwrap();
        let err = engine.create(false).unwrap_err();
        assert!(matches!(err, CutoverError::DatabaseExists { ref name } if name == "uat_app_new"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn forced_create_replaces_new_with_empty_database() {
        let backend = MemoryBackend::with(&[("uat_app_new", "stale")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        engine.create(true).unwrap();
        assert_eq!(backend.content("uat_app_new").as_deref(), Some(""));
    }

    #[test]
    fn rollout_then_rollback_round_trip() {
        let backend = MemoryBackend::with(&[("uat_app", "v1"), ("uat_app_new", "v2")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));

        assert_eq!(engine.rollout().unwrap(), Rollout::Promoted { retired: true });
        assert_eq!(backend.content("uat_app").as_deref(), Some("v2"));
        assert_eq!(backend.content("uat_app_old").as_deref(), Some("v1"));
        assert_eq!(backend.content("uat_app_new"), None);

        engine.rollback().unwrap();
        assert_eq!(backend.content("uat_app").as_deref(), Some("v1"));
        assert_eq!(backend.content("uat_app_old"), None);
    }

    #[test]
    fn rollout_replaces_previous_old() {
        let backend = MemoryBackend::with(&[
            ("uat_app", "v2"),
            ("uat_app_old", "v1"),
            ("uat_app_new", "v3"),
        ]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        engine.rollout().unwrap();
        assert_eq!(backend.content("uat_app").as_deref(), Some("v3"));
        assert_eq!(backend.content("uat_app_old").as_deref(), Some("v2"));
    }

    #[test]
    fn first_rollout_has_nothing_to_retire() {
        let backend = MemoryBackend::with(&[("uat_app_new", "v1")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        assert_eq!(engine.rollout().unwrap(), Rollout::Promoted { retired: false });
        assert_eq!(backend.content("uat_app_old"), None);
    }

    #[test]
    fn rollout_without_new_is_a_no_op() {
        let backend = MemoryBackend::with(&[("uat_app", "v1")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        assert_eq!(engine.rollout().unwrap(), Rollout::NothingToRollOut);
        assert_eq!(backend.content("uat_app").as_deref(), Some("v1"));
    }

    #[test]
    fn rollback_without_old_fails_and_keeps_state() {
        let backend = MemoryBackend::with(&[("uat_app", "v1"), ("uat_app_new", "v2")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        let err = engine.rollback().unwrap_err();
        assert!(matches!(err, CutoverError::NothingToRollBack { .. }));
        assert_eq!(backend.content("uat_app").as_deref(), Some("v1"));
        assert_eq!(backend.content("uat_app_new").as_deref(), Some("v2"));
    }

    #[test]
    fn rollback_leaves_pending_new_alone() {
        let backend = MemoryBackend::with(&[
            ("uat_app", "v2"),
            ("uat_app_old", "v1"),
            ("uat_app_new", "v3"),
        ]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        engine.rollback().unwrap();
        assert_eq!(backend.content("uat_app").as_deref(), Some("v1"));
        assert_eq!(backend.content("uat_app_new").as_deref(), Some("v3"));
    }

    #[test]
    fn duplicate_copies_source_current() {
        let backend = MemoryBackend::with(&[("prod_app", "live data")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        engine.duplicate(false, &names("prod")).unwrap();
        assert_eq!(backend.content("uat_app_new").as_deref(), Some("live data"));
    }

    #[test]
    fn import_creates_then_loads() {
        let backend = MemoryBackend::default();
        let engine = DatabaseSwapEngine::new(&backend, names("dev"));
        engine.import("/tmp/dump.sql", false).unwrap();
        assert_eq!(
            backend.content("dev_app_new").as_deref(),
            Some("from /tmp/dump.sql")
        );
        assert!(engine.import("/tmp/dump.sql", false).is_err());
        engine.import("/tmp/dump.sql", true).unwrap();
    }

    #[test]
    fn drop_new_reports_whether_anything_was_dropped() {
        let backend = MemoryBackend::with(&[("uat_app_new", "x")]);
        let engine = DatabaseSwapEngine::new(&backend, names("uat"));
        assert!(engine.drop_new().unwrap());
        assert!(!engine.drop_new().unwrap());
    }

    struct Nothing;

    impl DatabaseBackend for Nothing {
        fn name(&self) -> &'static str {
            "none"
        }
        fn is_noop(&self) -> bool {
            true
        }
        fn exists(&self, _: &Identifier) -> CutoverResult<bool> {
            panic!("noop backend must not be queried")
        }
        fn create(&self, _: &Identifier) -> CutoverResult<()> {
            panic!("noop backend must not be mutated")
        }
        fn drop(&self, _: &Identifier) -> CutoverResult<()> {
            panic!("noop backend must not be mutated")
        }
        fn rename(&self, _: &Identifier, _: &Identifier) -> CutoverResult<()> {
            panic!("noop backend must not be mutated")
        }
        fn duplicate(&self, _: &Identifier, _: &Identifier) -> CutoverResult<()> {
            panic!("noop backend must not be mutated")
        }
        fn export(&self, _: &Identifier, _: &str) -> CutoverResult<()> {
            panic!("noop backend must not be dumped")
        }
        fn import(&self, _: &Identifier, _: &str) -> CutoverResult<()> {
            panic!("noop backend must not be loaded")
        }
    }

    #[test]
    fn noop_backend_succeeds_without_touching_anything() {
        let engine = DatabaseSwapEngine::new(&Nothing, names("uat"));
        engine.create(false).unwrap();
        engine.duplicate(true, &names("prod")).unwrap();
        assert_eq!(engine.rollout().unwrap(), Rollout::NothingToRollOut);
        engine.rollback().unwrap();
        assert!(!engine.drop_new().unwrap());
        engine.export("out.sql").unwrap();
        engine.import("in.sql", false).unwrap();
    }
}
