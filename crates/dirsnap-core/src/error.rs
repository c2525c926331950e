//! Error types for snapshot runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while planning or running snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A directory could not be opened for listing.
    #[error("Cannot open directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot artifact could not be created or written.
    #[error("Cannot write snapshot {path}: {source}")]
    ArtifactUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path exceeds the configured length limit.
    #[error("Path exceeds {limit} bytes: {path}")]
    PathTooLong { path: PathBuf, limit: usize },

    /// Path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No input directories were given.
    #[error("No directories to snapshot")]
    NoDirectories,

    /// More input directories than the configured limit.
    #[error("Too many directories ({count}), limit is {limit}")]
    TooManyDirectories { count: usize, limit: usize },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A snapshot line could not be parsed.
    #[error("Malformed snapshot line: {line:?}")]
    MalformedRecord { line: String },

    /// A worker panicked or was cancelled before reporting.
    #[error("Worker for task {index} was lost: {message}")]
    WorkerLost { index: usize, message: String },
}

impl SnapshotError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a directory-unreadable error.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Create an artifact-unwritable error.
    pub fn unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ArtifactUnwritable {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Classify this error for a task outcome.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::DirectoryUnreadable { .. }
            | Self::NotADirectory { .. }
            | Self::PermissionDenied { .. }
            | Self::NotFound { .. }
            | Self::PathTooLong { .. } => FailureKind::DirectoryUnreadable,
            Self::ArtifactUnwritable { .. } => FailureKind::ArtifactUnwritable,
            Self::WorkerLost { .. } => FailureKind::WorkerLost,
            _ => FailureKind::Other,
        }
    }
}

/// Why a task ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The source directory could not be opened.
    DirectoryUnreadable,
    /// The snapshot artifact could not be created or written.
    ArtifactUnwritable,
    /// The worker running the task panicked or was cancelled.
    WorkerLost,
    /// Anything else.
    Other,
}

/// Captured failure reason of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable message.
    pub message: String,
}

impl From<&SnapshotError> for TaskFailure {
    fn from(err: &SnapshotError) -> Self {
        Self {
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Kind of snapshot warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Path longer than the configured limit.
    PathTooLong,
    /// A followed symbolic link points back to one of its ancestors.
    SymlinkLoop,
}

/// Non-fatal warning encountered during a walk or scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl SnapshotWarning {
    /// Create a new snapshot warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning for a directory that could not be listed.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = if error.kind() == std::io::ErrorKind::PermissionDenied {
            WarningKind::PermissionDenied
        } else {
            WarningKind::ReadError
        };
        Self {
            message: format!("Cannot open directory: {error}"),
            path,
            kind,
        }
    }

    /// Create a warning for an entry that could not be stat'ed.
    pub fn metadata_error(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: format!("Cannot read metadata: {error}"),
            kind: WarningKind::MetadataError,
        }
    }

    /// Create a warning for a link that would re-enter an ancestor.
    pub fn symlink_loop(path: impl Into<PathBuf>, ancestor: &std::path::Path) -> Self {
        Self {
            path: path.into(),
            message: format!("Symlink loop back to {}, not followed", ancestor.display()),
            kind: WarningKind::SymlinkLoop,
        }
    }

    /// Create a warning for a path over the length limit.
    pub fn path_too_long(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        Self {
            message: format!("Path exceeds {limit} bytes, skipped"),
            path,
            kind: WarningKind::PathTooLong,
        }
    }
}

impl std::fmt::Display for SnapshotWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
