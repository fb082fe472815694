//! Domain Entities
//!
//! Core domain objects with identity.

mod generation;
mod host;

pub use generation::GenerationNames;
pub use host::{Host, Inventory, Role};
