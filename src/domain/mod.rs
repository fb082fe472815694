//! Domain Layer
//!
//! Release, share and database lifecycle rules, free of process spawning and
//! file access. Everything that touches a host goes through `ports`.
//!
//! ## Structure
//!
//! - `entities/` - Hosts, inventory, database generations
//! - `value_objects/` - Identifiers, revision descriptors, share exclusions
//! - `services/` - Task graph, revision resolver, link computer, share sync, db swap, pruner
//! - `ports/` - Interface definitions for infrastructure

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
