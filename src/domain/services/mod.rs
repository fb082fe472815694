//! Domain Services
//!
//! Deployment logic over the ports. Services borrow their collaborators and
//! hold no state beyond a single call.

pub mod db_swap;
pub mod pruner;
pub mod relative_link;
pub mod revision_resolver;
pub mod share_sync;
pub mod task_graph;

pub use db_swap::{DatabaseSwapEngine, Rollout};
pub use pruner::ReleasePruner;
pub use relative_link::{relative_link, share_link_target};
pub use revision_resolver::{is_release_name, RevisionResolver};
pub use share_sync::{validate_share_path, ShareSynchronizer, SyncReport};
pub use task_graph::{Task, TaskGraph, TaskGraphBuilder, TaskKind};
