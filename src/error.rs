//! Error types for grapheus modules using thiserror.

use std::fmt;

use thiserror::Error;

/// Classification of a provider-call failure.
///
/// Exactly one kind per error. The kind decides how the error is reported
/// and whether the retry loop gives it another attempt (`Config` never is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    Timeout,
    Connection,
    Model,
    Config,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection",
            ErrorKind::Model => "model",
            ErrorKind::Config => "config",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized provider error: one kind, one message.
///
/// Every transport, HTTP, and parsing failure from any backend is converted
/// into this type before it leaves the provider layer, so callers see a
/// single taxonomy regardless of which of the ~24 backends was used.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct AiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Model, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }
}

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository. Run grapheus from within a git repository.")]
    NotARepository(#[source] git2::Error),

    #[error("No staged changes. Stage files with 'git add' or pass --add-all.")]
    NoStagedChanges,

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to stage changes: {0}")]
    StagingFailed(#[source] git2::Error),

    #[error("Failed to reset index: {0}")]
    ResetFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),

    #[error("Failed to push: {0}")]
    PushFailed(String),

    #[error("Failed to restore staged changes: {0}")]
    RestoreFailed(String),
}

/// Errors from the grouped-commit partitioner.
#[derive(Error, Debug)]
pub enum GroupingError {
    #[error("Backend call failed during grouping: {0}")]
    Generation(#[from] AiError),

    #[error("Grouping plan could not be parsed: {0}")]
    ParseFailed(String),

    #[error("Grouping plan is empty (no commit groups)")]
    EmptyPlan,

    #[error("Grouping plan group {index} ('{message}') has no files")]
    EmptyGroup { index: usize, message: String },

    #[error("Grouping plan omitted staged files: {}", .0.join(", "))]
    MissingFiles(Vec<String>),

    #[error("Grouping plan invented files not in the staged set: {}", .0.join(", "))]
    UnknownFiles(Vec<String>),

    #[error("File appears in more than one commit group: {0}")]
    DuplicateFile(String),

    #[error("Grouping plan still invalid after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GroupingError>,
    },

    #[error(
        "Grouped commit stopped after {completed}/{total} commits. \
         Commit for '{failed_message}' failed: {source}"
    )]
    ExecutionFailed {
        completed: usize,
        total: usize,
        failed_message: String,
        #[source]
        source: GitError,
    },
}
