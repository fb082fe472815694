//! Cutover - release promotion tool
//!
//! Cutover checks out a revision into a per-stage release directory, links
//! shared directories into it, copies content and the database from a source
//! stage, and swaps databases blue-green before repointing the live release.
//!
//! ## Layers
//!
//! - `domain` - task graph, revision resolution, link math, swap rules
//! - `infrastructure` - processes, ssh, rsync, git, database clients
//! - `application` - the standard recipe and the run use case
//! - `config` - deployment document and host inventory

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-exports for convenience
pub use application::{RunRequest, RunUseCase, Services};
pub use config::{Config, Project};
pub use error::{CutoverError, CutoverResult, ErrorKind};
