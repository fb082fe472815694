//! Live release lookup port

use crate::error::CutoverResult;

/// Reads which commit a stage's pointer currently names
pub trait LiveReleaseLookup: Send + Sync {
    /// `None` when the stage has no serving host or no pointer yet
    fn live_commit(&self, stage: &str) -> CutoverResult<Option<String>>;
}
