//! Moves suspicious files into the safe directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use dirsnap_core::ConflictPolicy;

use crate::conflict::{resolve_destination, Destination};
use crate::QuarantineError;

/// What happened to a suspicious file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The file now lives in the safe directory.
    Moved { from: PathBuf, to: PathBuf },
    /// No safe directory is configured; the file stays where it is.
    Skipped { path: PathBuf },
}

impl MoveOutcome {
    /// New location, if the file was moved.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Moved { to, .. } => Some(to),
            Self::Skipped { .. } => None,
        }
    }
}

/// Relocates files into an optional safe directory.
#[derive(Debug, Clone, Default)]
pub struct Quarantine {
    safe_dir: Option<PathBuf>,
    policy: ConflictPolicy,
}

impl Quarantine {
    /// Create a mover. `None` means report-only.
    pub fn new(safe_dir: Option<PathBuf>, policy: ConflictPolicy) -> Self {
        Self { safe_dir, policy }
    }

    /// The configured safe directory.
    pub fn safe_dir(&self) -> Option<&Path> {
        self.safe_dir.as_deref()
    }

    /// Move `source` to `<safe_dir>/<file name>`.
    ///
    /// Only a same-filesystem rename is attempted; a cross-device move
    /// fails with [`QuarantineError::MoveFailed`].
    pub fn quarantine(&self, source: &Path) -> Result<MoveOutcome, QuarantineError> {
        let Some(safe_dir) = &self.safe_dir else {
            info!(path = %source.display(), "suspicious file left in place, no safe directory");
            return Ok(MoveOutcome::Skipped {
                path: source.to_path_buf(),
            });
        };

        let file_name = source.file_name().ok_or_else(|| QuarantineError::NoFileName {
            path: source.to_path_buf(),
        })?;

        let dest = match resolve_destination(safe_dir.join(file_name), self.policy) {
            Destination::Use(dest) => dest,
            Destination::Taken(dest) => {
                return Err(QuarantineError::NameTaken {
                    from: source.to_path_buf(),
                    to: dest,
                });
            }
        };

        fs::rename(source, &dest).map_err(|e| QuarantineError::MoveFailed {
            from: source.to_path_buf(),
            to: dest.clone(),
            source: e,
        })?;

        info!(from = %source.display(), to = %dest.display(), "suspicious file moved");
        Ok(MoveOutcome::Moved {
            from: source.to_path_buf(),
            to: dest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_into_safe_dir() {
        let src = TempDir::new().unwrap();
        let safe = TempDir::new().unwrap();
        let file = src.path().join("attack_vector.bin");
        fs::write(&file, "payload").unwrap();

        let quarantine = Quarantine::new(Some(safe.path().to_path_buf()), ConflictPolicy::Overwrite);
        let outcome = quarantine.quarantine(&file).unwrap();

        let moved = safe.path().join("attack_vector.bin");
        assert_eq!(outcome.destination(), Some(moved.as_path()));
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(moved).unwrap(), "payload");
    }

    #[test]
    fn test_no_safe_dir_leaves_file() {
        let src = TempDir::new().unwrap();
        let file = src.path().join("malware_report");
        fs::write(&file, "").unwrap();

        let outcome = Quarantine::default().quarantine(&file).unwrap();
        assert_eq!(outcome, MoveOutcome::Skipped { path: file.clone() });
        assert!(file.exists());
    }

    #[test]
    fn test_missing_safe_dir_fails() {
        let src = TempDir::new().unwrap();
        let file = src.path().join("risk.txt");
        fs::write(&file, "").unwrap();

        let quarantine = Quarantine::new(Some(src.path().join("missing")), ConflictPolicy::Overwrite);
        let err = quarantine.quarantine(&file).unwrap_err();
        assert!(matches!(err, QuarantineError::MoveFailed { .. }));
        assert!(!err.is_vanished());
        assert!(file.exists());
    }

    #[test]
    fn test_vanished_source() {
        let src = TempDir::new().unwrap();
        let safe = TempDir::new().unwrap();
        let quarantine = Quarantine::new(Some(safe.path().to_path_buf()), ConflictPolicy::Overwrite);

        let err = quarantine.quarantine(&src.path().join("malicious.sh")).unwrap_err();
        assert!(err.is_vanished());
    }
}
