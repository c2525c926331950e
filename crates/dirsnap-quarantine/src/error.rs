//! Error types for classification and quarantine moves.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the classifier and the mover.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// The suspicion rule failed to compile.
    #[error("Invalid suspicion pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The rename into the safe directory failed.
    #[error("Cannot move {} -> {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination name is already taken and the policy is to skip.
    #[error("Not moving {}: {} already exists", from.display(), to.display())]
    NameTaken { from: PathBuf, to: PathBuf },

    /// The source path has no file name component.
    #[error("Not a file path: {}", path.display())]
    NoFileName { path: PathBuf },
}

impl QuarantineError {
    /// The source vanished between the scan and the move.
    pub fn is_vanished(&self) -> bool {
        match self {
            Self::MoveFailed { from, source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound && from.symlink_metadata().is_err()
            }
            _ => false,
        }
    }

    /// The safe directory is on another filesystem.
    pub fn is_cross_device(&self) -> bool {
        matches!(
            self,
            Self::MoveFailed { source, .. } if source.kind() == std::io::ErrorKind::CrossesDevices
        )
    }
}
