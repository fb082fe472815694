//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod database;
pub mod executor;
pub mod live_release;
pub mod vcs;

pub use database::DatabaseBackend;
pub use executor::{
    shell_quote, CommandSpec, Executor, FileTransfer, Invocation, ShellPipeline, Timeout,
};
pub use live_release::LiveReleaseLookup;
pub use vcs::{BranchRef, BranchSource, VersionControl};
