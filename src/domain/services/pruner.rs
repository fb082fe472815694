//! Release pruning

use tracing::{info, warn};

use crate::domain::entities::Host;
use crate::domain::ports::{CommandSpec, Executor, LiveReleaseLookup};
use crate::error::CutoverResult;

pub struct ReleasePruner<'a> {
    executor: &'a dyn Executor,
    live: &'a dyn LiveReleaseLookup,
}

impl<'a> ReleasePruner<'a> {
    pub fn new(executor: &'a dyn Executor, live: &'a dyn LiveReleaseLookup) -> Self {
        Self { executor, live }
    }

    /// Delete every release of `stage` in `releases_dir` except the live one
    ///
    /// Returns the removed entries. The live commit is read after listing so a
    /// pointer switched earlier in the same run is honored.
    pub fn prune(
        &self,
        host: &Host,
        stage: &str,
        releases_dir: &str,
    ) -> CutoverResult<Vec<String>> {
        let listing = self
            .executor
            .run(host, &CommandSpec::new("ls").args(["-1", releases_dir]))?;

        let Some(live) = self.live.live_commit(stage)? else {
            warn!(stage, "no live release, not pruning");
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        for entry in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if entry == live {
                continue;
            }
            let path = format!("{}/{}", releases_dir.trim_end_matches('/'), entry);
            self.executor
                .run(host, &CommandSpec::new("rm").args(["-rf", &path]).unbounded())?;
            info!(host = %host, release = entry, "pruned release");
            removed.push(entry.to_string());
        }

        Ok(removed)
    }
}
