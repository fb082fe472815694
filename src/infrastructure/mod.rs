//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer spawns processes and touches the network.
//!
//! ## Structure
//!
//! - `exec/` - Local process and ssh execution
//! - `transfer` - scp / local copy
//! - `vcs/` - Git backend
//! - `database/` - Postgres, MySQL and no-op backends
//! - `pointers` - Live release lookup through stage symlinks

pub mod database;
pub mod exec;
pub mod pointers;
pub mod transfer;
pub mod vcs;

// Re-export for convenience
pub use database::{DbKind, DbSettings};
pub use exec::SystemExecutor;
pub use pointers::StagePointers;
pub use transfer::SystemTransfer;
pub use vcs::{GitBackend, VcsKind};
