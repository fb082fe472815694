//! Common test utilities for Cutover CLI and scenario tests.
//!
//! This module provides:
//! - `TestEnv`: an isolated project directory plus helpers to run the binary
//! - Fixtures: deployment documents shared between tests

#![allow(dead_code)]

pub mod env;
pub mod fixtures;

pub use env::*;
pub use fixtures::*;
