//! Version control backends

mod git;

use std::str::FromStr;
use std::sync::Arc;

use crate::domain::ports::{Executor, VersionControl};
use crate::error::CutoverError;

pub use git::{parse_heads, parse_tags, GitBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Git,
}

impl FromStr for VcsKind {
    type Err = CutoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            _ => Err(CutoverError::UnsupportedBackend {
                kind: "vcs",
                value: s.to_string(),
            }),
        }
    }
}

impl VcsKind {
    pub fn backend(self, executor: Arc<dyn Executor>, remote: &str) -> Arc<dyn VersionControl> {
        match self {
            Self::Git => Arc::new(GitBackend::new(executor, remote)),
        }
    }
}
