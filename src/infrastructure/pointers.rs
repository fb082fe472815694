//! Stage pointer lookup
//!
//! `<root>/stages/<stage>` is a symlink into the live release; the last
//! component of its target is the live commit.

use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::{Inventory, Role};
use crate::domain::ports::{CommandSpec, Executor, LiveReleaseLookup};
use crate::error::CutoverResult;

pub struct StagePointers {
    executor: Arc<dyn Executor>,
    inventory: Arc<Inventory>,
    stages_dir: String,
}

impl StagePointers {
    pub fn new(
        executor: Arc<dyn Executor>,
        inventory: Arc<Inventory>,
        stages_dir: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            inventory,
            stages_dir: stages_dir.into(),
        }
    }

    pub fn pointer_path(&self, stage: &str) -> String {
        format!("{}/{}", self.stages_dir.trim_end_matches('/'), stage)
    }
}

/// Last non-empty segment of a link target
fn basename(target: &str) -> Option<&str> {
    target
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
}

impl LiveReleaseLookup for StagePointers {
    fn live_commit(&self, stage: &str) -> CutoverResult<Option<String>> {
        let Some(host) = self.inventory.first(stage, Role::Serving) else {
            debug!(stage, "no serving host, no live release");
            return Ok(None);
        };
        let pointer = self.pointer_path(stage);
        if !self
            .executor
            .test(host, &CommandSpec::new("test").args(["-L", &pointer]))?
        {
            return Ok(None);
        }
        let target = self
            .executor
            .run(host, &CommandSpec::new("readlink").arg(&pointer))?;
        Ok(basename(&target).map(String::from))
    }
}
