//! Name conflicts inside the quarantine directory.

use std::path::{Path, PathBuf};

use dirsnap_core::ConflictPolicy;

/// Upper bound on numbered candidates tried by [`numbered_path`].
const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// Final destination for a file, given what is already in the safe directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Move to this path.
    Use(PathBuf),
    /// The name is taken and the policy says leave the source alone.
    Taken(PathBuf),
}

/// Apply `policy` to the planned destination `dest`.
pub fn resolve_destination(dest: PathBuf, policy: ConflictPolicy) -> Destination {
    if dest.symlink_metadata().is_err() {
        return Destination::Use(dest);
    }

    match policy {
        ConflictPolicy::Overwrite => Destination::Use(dest),
        ConflictPolicy::Skip => Destination::Taken(dest),
        ConflictPolicy::Rename => Destination::Use(numbered_path(&dest)),
    }
}

/// First free sibling of `path` of the form `stem (N).ext`.
///
/// Falls back to a `stem_<unix seconds>.ext` name once the numbered range
/// is exhausted.
pub fn numbered_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let with_suffix = |suffix: String| match &extension {
        Some(ext) => parent.join(format!("{stem}{suffix}.{ext}")),
        None => parent.join(format!("{stem}{suffix}")),
    };

    for i in 1..MAX_RENAME_ATTEMPTS {
        let candidate = with_suffix(format!(" ({i})"));
        if candidate.symlink_metadata().is_err() {
            return candidate;
        }
    }

    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    with_suffix(format!("_{secs}"))
}
