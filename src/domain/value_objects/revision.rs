//! Revision descriptor
//!
//! What the operator typed for `--revision`: a branch, tag or commit, or
//! `=<stage>` meaning "whatever is live on that stage".

use std::fmt;

/// Prefix marking stage indirection
pub const INDIRECTION_MARKER: char = '=';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionDescriptor {
    /// Branch, tag or commit hash
    CommitIsh(String),
    /// Live commit of another stage
    LiveOf(String),
}

impl RevisionDescriptor {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.strip_prefix(INDIRECTION_MARKER) {
            Some(stage) => Self::LiveOf(stage.trim().to_string()),
            None => Self::CommitIsh(input.to_string()),
        }
    }
}

impl fmt::Display for RevisionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommitIsh(rev) => f.write_str(rev),
            Self::LiveOf(stage) => write!(f, "{}{}", INDIRECTION_MARKER, stage),
        }
    }
}
