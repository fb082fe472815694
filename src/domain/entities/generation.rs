//! Database generation slots
//!
//! One logical database is kept in up to three physical databases per stage:
//! CURRENT (`<stage>_<name>`), NEW (`..._new`) and OLD (`..._old`).

use crate::domain::value_objects::Identifier;
use crate::error::CutoverResult;

/// Physical database names for one stage's generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationNames {
    current: Identifier,
    new: Identifier,
    old: Identifier,
}

impl GenerationNames {
    pub fn new(stage: &str, name: &str) -> CutoverResult<Self> {
        let base = format!("{}_{}", stage, name);
        Ok(Self {
            current: Identifier::new(base.clone())?,
            new: Identifier::new(format!("{}_new", base))?,
            old: Identifier::new(format!("{}_old", base))?,
        })
    }

    pub fn current(&self) -> &Identifier {
        &self.current
    }

    pub fn new_slot(&self) -> &Identifier {
        &self.new
    }

    pub fn old(&self) -> &Identifier {
        &self.old
    }
}
