use crate::domain::ports::DatabaseBackend;
use crate::domain::value_objects::Identifier;
use crate::error::CutoverResult;

/// For applications without a database
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatabase;

impl DatabaseBackend for NoDatabase {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_noop(&self) -> bool {
        true
    }

    fn exists(&self, _db: &Identifier) -> CutoverResult<bool> {
        Ok(false)
    }

    fn create(&self, _db: &Identifier) -> CutoverResult<()> {
        Ok(())
    }

    fn drop(&self, _db: &Identifier) -> CutoverResult<()> {
        Ok(())
    }

    fn rename(&self, _from: &Identifier, _to: &Identifier) -> CutoverResult<()> {
        Ok(())
    }

    fn duplicate(&self, _from: &Identifier, _to: &Identifier) -> CutoverResult<()> {
        Ok(())
    }

    fn export(&self, _db: &Identifier, _file: &str) -> CutoverResult<()> {
        Ok(())
    }

    fn import(&self, _db: &Identifier, _file: &str) -> CutoverResult<()> {
        Ok(())
    }
}
