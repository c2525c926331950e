//! Metadata records and their line format.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// One entry of a snapshot: base name plus modification time.
///
/// Serialized to the artifact as `<name> <mtime>` where `mtime` is whole
/// seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Base name of the entry, never a full path.
    pub name: CompactString,
    /// Last modification time.
    pub modified: SystemTime,
}

impl MetadataRecord {
    /// Create a new record.
    pub fn new(name: impl Into<CompactString>, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            modified,
        }
    }

    /// Modification time in seconds since the epoch (negative before 1970).
    ///
    /// Rounds toward negative infinity and saturates at the `i64` range, so
    /// any timestamp a filesystem can store is representable.
    pub fn mtime_secs(&self) -> i64 {
        match self.modified.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
            Err(err) => {
                let before = err.duration();
                let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                let floor = i64::from(before.subsec_nanos() > 0);
                secs.saturating_neg().saturating_sub(floor)
            }
        }
    }

    /// Parse one artifact line.
    ///
    /// The timestamp is taken after the last space, so names that contain
    /// spaces survive.
    pub fn parse_line(line: &str) -> Result<Self, SnapshotError> {
        let malformed = || SnapshotError::MalformedRecord {
            line: line.to_string(),
        };
        let line = line.strip_suffix('\n').unwrap_or(line);
        let (name, secs) = line.rsplit_once(' ').ok_or_else(malformed)?;
        let secs: i64 = secs.parse().map_err(|_| malformed())?;
        let offset = Duration::from_secs(secs.unsigned_abs());
        let modified = if secs >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
        .ok_or_else(malformed)?;
        Ok(Self::new(name, modified))
    }
}

impl std::fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.mtime_secs())
    }
}
