//! Application Layer
//!
//! Use cases that orchestrate the deployment flow.
//! This layer:
//! - Depends on Domain layer (entities, services, ports)
//! - Does NOT contain deployment rules (those are in Domain)
//! - Wires Infrastructure adapters into the domain services
//!
//! ## Use Cases
//!
//! - `RunUseCase` - Resolve the context for a stage and run a task against it
//!
//! ## Building blocks
//!
//! - `context` - the immutable per-invocation `DeploymentContext`
//! - `recipe` - the standard task catalogue
//! - `runner` - host fan-out for leaf tasks

pub mod context;
pub mod recipe;
pub mod run;
pub mod runner;
pub mod services;
#[cfg(test)]
pub(crate) mod testing;

pub use context::{stage_timeout, ContextResolver, DeploymentContext, Paths, RunRequest};
pub use recipe::standard_graph;
pub use run::RunUseCase;
pub use runner::{needs_commit, render_plan, Body, Step, TaskRunner};
pub use services::{DatabaseFactory, Services, SystemDatabases};
