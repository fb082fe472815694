//! Database backend port
//!
//! Primitive operations the blue-green engine is built from. Implementations
//! are bound to a single data host and connection settings.

use crate::domain::value_objects::Identifier;
use crate::error::CutoverResult;

pub trait DatabaseBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Backends that manage nothing report trivial success everywhere
    fn is_noop(&self) -> bool {
        false
    }

    fn exists(&self, db: &Identifier) -> CutoverResult<bool>;

    /// Create an empty database owned by the application role
    fn create(&self, db: &Identifier) -> CutoverResult<()>;

    fn drop(&self, db: &Identifier) -> CutoverResult<()>;

    /// Rename, natively or by moving every table
    fn rename(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()>;

    /// Create `to` as a full copy of `from`
    fn duplicate(&self, from: &Identifier, to: &Identifier) -> CutoverResult<()>;

    /// Dump `db` into `file` on the data host
    fn export(&self, db: &Identifier, file: &str) -> CutoverResult<()>;

    /// Load `file` (on the data host) into `db`
    fn import(&self, db: &Identifier, file: &str) -> CutoverResult<()>;
}
