//! Version control port

use crate::domain::entities::Host;
use crate::error::CutoverResult;

/// A branch head or tag as reported by the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub commit: String,
}

/// Lists branch heads and tags of the configured remote
pub trait BranchSource: Send + Sync {
    fn branches(&self) -> CutoverResult<Vec<BranchRef>>;

    /// Tags with the commit they point at (annotated tags peeled)
    fn tags(&self) -> CutoverResult<Vec<BranchRef>> {
        Ok(Vec::new())
    }
}

/// Operations against the bare cache on files hosts
///
/// `cache` is the absolute path of the bare repository on `host`.
pub trait VersionControl: BranchSource {
    fn name(&self) -> &'static str;

    /// Create the cache if it does not exist yet
    fn init_cache(&self, host: &Host, cache: &str) -> CutoverResult<()>;

    /// Bring the cache up to date with the remote
    fn fetch(&self, host: &Host, cache: &str) -> CutoverResult<()>;

    /// Whether `revision` names a commit known to the cache
    fn has_commit(&self, host: &Host, cache: &str, revision: &str) -> CutoverResult<bool>;

    /// Whether `path` exists in the tree of `revision`
    fn has_path(&self, host: &Host, cache: &str, revision: &str, path: &str)
        -> CutoverResult<bool>;

    /// Extract the tree of `revision` (or only `paths` of it) into `dest`
    fn export(
        &self,
        host: &Host,
        cache: &str,
        revision: &str,
        dest: &str,
        paths: &[&str],
    ) -> CutoverResult<()>;

    /// Human-readable log of commits between `from` and `to`
    fn log(&self, host: &Host, cache: &str, from: &str, to: &str) -> CutoverResult<String>;
}
