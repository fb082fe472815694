//! Error types for Cutover
//!
//! Uses `thiserror` for library errors. The binary wraps these in `anyhow`
//! and maps them back to process exit codes via [`CutoverError::exit_code`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Cutover operations
pub type CutoverResult<T> = Result<T, CutoverError>;

/// Broad failure category, used for exit codes and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A precondition check refused to continue (bypassable with `--force` where noted)
    Guard,
    /// No commit could be determined for the requested revision
    Resolution,
    /// A command exited non-zero, timed out, or could not be spawned
    Execution,
    /// Unsupported backend, bad config document, broken task graph
    Configuration,
    /// A configured sync path does not exist in the source stage
    Sync,
}

/// Main error type for Cutover operations
#[derive(Error, Debug)]
pub enum CutoverError {
    /// Revision descriptor did not resolve to a commit
    #[error("invalid revision \"{revision}\" specified")]
    UnresolvedRevision { revision: String },

    /// Requested commit is already live on the stage
    #[error("commit {commit} is already deployed on {stage}, use -F to force")]
    AlreadyDeployed { commit: String, stage: String },

    /// Stage directories already exist
    #[error("stage {stage} appears to already be set up, use -F to force")]
    AlreadySetUp { stage: String },

    /// The staged database generation already exists
    #[error("database {name} already exists, use -F to force")]
    DatabaseExists { name: String },

    /// No retired generation to restore
    #[error("database {name} does not exist, nothing to roll back")]
    NothingToRollBack { name: String },

    /// A task needs a CLI option that was not given
    #[error("{task} requires {option}")]
    MissingOption { task: String, option: &'static str },

    /// Import file does not exist locally
    #[error("unable to import database, input file {} does not exist", path.display())]
    InputNotFound { path: PathBuf },

    /// Backend identifier not recognised
    #[error("unsupported {kind} \"{value}\"")]
    UnsupportedBackend { kind: &'static str, value: String },

    /// Required configuration key is missing
    #[error("missing configuration value: {key}")]
    MissingConfig { key: &'static str },

    /// Configuration or inventory document could not be parsed
    #[error("invalid configuration in {}: {message}", file.display())]
    InvalidConfig { file: PathBuf, message: String },

    /// A name that would be interpolated into SQL is not a plain identifier
    #[error("invalid identifier \"{0}\" (only letters, digits and '_' are allowed)")]
    InvalidIdentifier(String),

    /// Task graph references a task that was never registered
    #[error("unknown task \"{name}\"")]
    UnknownTask { name: String },

    /// Task graph contains a cycle
    #[error("task dependency cycle: {}", path.join(" -> "))]
    TaskCycle { path: Vec<String> },

    /// Task needs a resolved commit but the context has none
    #[error("task {task} needs a resolved revision")]
    RevisionRequired { task: String },

    /// No host with the required role exists for a stage
    #[error("no host with role {role} found for stage {stage}")]
    NoHost { stage: String, role: String },

    /// Sync source is neither a file nor a directory
    #[error("could not sync {path} from {source_stage}, file or directory does not exist")]
    SyncSourceMissing { path: String, source_stage: String },

    /// A command exited with a non-zero status
    #[error("command failed on {host}: {command} (exit {}): {}", display_code(*code), stderr.trim())]
    CommandFailed {
        host: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A command exceeded its timeout and was killed
    #[error("command timed out on {host} after {after:?}: {command}")]
    CommandTimeout {
        host: String,
        command: String,
        after: Duration,
    },

    /// A command could not be started at all
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_code(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

impl CutoverError {
    /// Category of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyDeployed { .. }
            | Self::AlreadySetUp { .. }
            | Self::DatabaseExists { .. }
            | Self::NothingToRollBack { .. }
            | Self::MissingOption { .. }
            | Self::InputNotFound { .. } => ErrorKind::Guard,
            Self::UnresolvedRevision { .. } | Self::RevisionRequired { .. } => {
                ErrorKind::Resolution
            }
            Self::UnsupportedBackend { .. }
            | Self::MissingConfig { .. }
            | Self::InvalidConfig { .. }
            | Self::InvalidIdentifier(_)
            | Self::UnknownTask { .. }
            | Self::TaskCycle { .. }
            | Self::NoHost { .. } => ErrorKind::Configuration,
            Self::SyncSourceMissing { .. } => ErrorKind::Sync,
            Self::CommandFailed { .. }
            | Self::CommandTimeout { .. }
            | Self::Spawn { .. }
            | Self::Io(_) => ErrorKind::Execution,
        }
    }

    /// Process exit code for this failure
    ///
    /// 1 = unresolved revision (and anything without a more specific code),
    /// 2 = guard or configuration failure, 3 = sync source missing.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Guard | ErrorKind::Configuration => 2,
            ErrorKind::Sync => 3,
            ErrorKind::Resolution | ErrorKind::Execution => 1,
        }
    }

    /// True when the command exited with one of the given codes
    pub fn is_exit_code(&self, codes: &[i32]) -> bool {
        matches!(self, Self::CommandFailed { code: Some(c), .. } if codes.contains(c))
    }
}
