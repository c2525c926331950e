//! JWalk-based metadata recorder.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use jwalk::{DirEntry, Parallelism, WalkDir};
use tracing::{debug, trace, warn};

use dirsnap_core::{MetadataRecord, SnapshotConfig, SnapshotError, SnapshotWarning, WarningKind};

type WalkItem = Result<DirEntry<((), ())>, jwalk::Error>;

/// Walks directory trees and records entry metadata.
#[derive(Debug, Clone)]
pub struct Recorder {
    max_path_len: usize,
    follow_symlinks: bool,
}

/// Counters for one written snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStats {
    /// Number of records written.
    pub records: u64,
    /// Warnings raised during the walk.
    pub warnings: Vec<SnapshotWarning>,
}

impl Recorder {
    /// Create a recorder from the run configuration.
    pub fn new(config: &SnapshotConfig) -> Self {
        Self {
            max_path_len: config.max_path_len,
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Start a fresh walk of `root`.
    ///
    /// Fails if `root` itself cannot be opened. Problems below the root are
    /// yielded as warnings by the returned iterator.
    pub fn records(&self, root: &Path) -> Result<RecordIter, SnapshotError> {
        if root.as_os_str().len() > self.max_path_len {
            return Err(SnapshotError::PathTooLong {
                path: root.to_path_buf(),
                limit: self.max_path_len,
            });
        }

        let metadata = fs::metadata(root).map_err(|e| SnapshotError::unreadable(root, e))?;
        if !metadata.is_dir() {
            return Err(SnapshotError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        // Probe once so an unlistable root fails here instead of as a warning.
        fs::read_dir(root).map_err(|e| SnapshotError::unreadable(root, e))?;

        // Each task already runs on its own worker, so walk serially.
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(self.follow_symlinks)
            .sort(false)
            .min_depth(1);

        Ok(RecordIter {
            inner: Box::new(walker.into_iter()),
            max_path_len: self.max_path_len,
            pruned: Vec::new(),
            pending: None,
        })
    }

    /// Write a snapshot of `root` to `artifact`, replacing any previous one.
    ///
    /// The artifact handle is flushed and closed before this returns, on
    /// success and on failure alike.
    pub fn write_snapshot(&self, root: &Path, artifact: &Path) -> Result<SnapshotStats, SnapshotError> {
        let records = self.records(root)?;

        let file = File::create(artifact).map_err(|e| SnapshotError::unwritable(artifact, e))?;
        let mut writer = BufWriter::new(file);
        let mut stats = SnapshotStats::default();

        for item in records {
            match item {
                Ok(record) => {
                    trace!(name = %record.name, mtime = record.mtime_secs(), "record");
                    writeln!(writer, "{record}").map_err(|e| SnapshotError::unwritable(artifact, e))?;
                    stats.records += 1;
                }
                Err(warning) => {
                    warn!(path = %warning.path.display(), "{}", warning.message);
                    stats.warnings.push(warning);
                }
            }
        }

        writer
            .flush()
            .map_err(|e| SnapshotError::unwritable(artifact, e))?;

        debug!(
            artifact = %artifact.display(),
            records = stats.records,
            warnings = stats.warnings.len(),
            "snapshot written"
        );
        Ok(stats)
    }
}

/// Lazy depth-first sequence of records for one walk.
pub struct RecordIter {
    inner: Box<dyn Iterator<Item = WalkItem>>,
    max_path_len: usize,
    /// Directories whose contents must not be reported.
    pruned: Vec<PathBuf>,
    /// Listing failure of the directory just yielded.
    pending: Option<SnapshotWarning>,
}

impl RecordIter {
    fn is_pruned(&self, path: &Path) -> bool {
        self.pruned
            .iter()
            .any(|dir| path != dir.as_path() && path.starts_with(dir))
    }
}

/// Warning for an entry jwalk could not produce at all.
///
/// These are per-entry stat failures (a dangling link being followed, say)
/// or a followed link that loops back to an ancestor.
fn entry_warning(err: &jwalk::Error) -> SnapshotWarning {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    if let Some(ancestor) = err.loop_ancestor() {
        return SnapshotWarning::symlink_loop(path, ancestor);
    }
    match err.io_error() {
        Some(io) => SnapshotWarning::metadata_error(path, io),
        None => SnapshotWarning::metadata_error(path, err),
    }
}

/// Warning for a directory that was recorded but could not be listed.
fn listing_warning(dir: &Path, err: &jwalk::Error) -> SnapshotWarning {
    match err.io_error() {
        Some(io) => SnapshotWarning::read_error(dir, io),
        None => SnapshotWarning::new(dir, err.to_string(), WarningKind::ReadError),
    }
}

/// Pair a name with its mtime. An unavailable mtime skips the entry.
fn to_record(
    path: &Path,
    name: &str,
    modified: io::Result<SystemTime>,
) -> Result<MetadataRecord, SnapshotWarning> {
    modified
        .map(|modified| MetadataRecord::new(name, modified))
        .map_err(|err| SnapshotWarning::metadata_error(path, &err))
}

impl Iterator for RecordIter {
    type Item = Result<MetadataRecord, SnapshotWarning>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(warning) = self.pending.take() {
            return Some(Err(warning));
        }

        loop {
            let mut entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let warning = entry_warning(&err);
                    if self.is_pruned(&warning.path) {
                        continue;
                    }
                    return Some(Err(warning));
                }
            };

            let path = entry.path();
            if self.is_pruned(&path) {
                continue;
            }

            if path.as_os_str().len() > self.max_path_len {
                let warning = SnapshotWarning::path_too_long(&path, self.max_path_len);
                self.pruned.push(path);
                return Some(Err(warning));
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    let warning = SnapshotWarning::metadata_error(&path, &err);
                    // No stat means no descent, matching a skipped entry.
                    if entry.file_type().is_dir() {
                        self.pruned.push(path);
                    }
                    return Some(Err(warning));
                }
            };

            self.pending = entry
                .read_children_error
                .take()
                .map(|err| listing_warning(&path, &err));

            let name = entry.file_name().to_string_lossy();
            return Some(to_record(&path, &name, metadata.modified()));
        }
    }
}
