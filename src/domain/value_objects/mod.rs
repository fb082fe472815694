//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod identifier;
mod ignore_patterns;
mod revision;

pub use identifier::Identifier;
pub use ignore_patterns::{IgnoreError, ShareExclusions, EXCLUSION_FILE};
pub use revision::RevisionDescriptor;
