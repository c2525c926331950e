//! Snapshot artifact naming.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Suffix appended to a source directory's base name.
pub const SNAPSHOT_SUFFIX: &str = "_snapshot.txt";

/// Derives artifact paths for a batch of source directories.
///
/// Sources with a unique base name map to `<output_dir>/<base>_snapshot.txt`.
/// Sources sharing a base name get a short BLAKE3 tag of the path as given,
/// `<output_dir>/<base>_<tag>_snapshot.txt`, so concurrent tasks never write
/// the same file.
#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    output_dir: PathBuf,
}

impl ArtifactNamer {
    /// Create a namer for the given output directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Base name used for a source directory.
    ///
    /// Paths without a final component (`.`, `..`, `/`) fall back to the
    /// canonical path's name, and to `root` for the filesystem root.
    pub fn base_name(source: &Path) -> String {
        if let Some(name) = source.file_name() {
            return name.to_string_lossy().into_owned();
        }
        source
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "root".to_string())
    }

    /// Artifact path for a single source, ignoring collisions.
    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        self.output_dir
            .join(format!("{}{SNAPSHOT_SUFFIX}", Self::base_name(source)))
    }

    /// Artifact paths for every source, in input order.
    pub fn plan(&self, sources: &[PathBuf]) -> Vec<PathBuf> {
        let names: Vec<String> = sources.iter().map(|s| Self::base_name(s)).collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for name in &names {
            *counts.entry(name.as_str()).or_default() += 1;
        }

        sources
            .iter()
            .zip(&names)
            .map(|(source, name)| {
                if counts[name.as_str()] > 1 {
                    let tag = path_tag(source);
                    self.output_dir
                        .join(format!("{name}_{tag}{SNAPSHOT_SUFFIX}"))
                } else {
                    self.output_dir.join(format!("{name}{SNAPSHOT_SUFFIX}"))
                }
            })
            .collect()
    }
}

/// First 8 hex characters of the BLAKE3 hash of a path.
fn path_tag(path: &Path) -> String {
    let hash = blake3::hash(path.as_os_str().as_encoded_bytes());
    hash.to_hex()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(ArtifactNamer::base_name(Path::new("/home/user/docs")), "docs");
        assert_eq!(ArtifactNamer::base_name(Path::new("docs/")), "docs");
        assert_eq!(ArtifactNamer::base_name(Path::new("/")), "root");
    }

    #[test]
    fn test_artifact_path() {
        let namer = ArtifactNamer::new("/out");
        assert_eq!(
            namer.artifact_path(Path::new("/data/photos")),
            PathBuf::from("/out/photos_snapshot.txt")
        );
    }

    #[test]
    fn test_plan_unique_names() {
        let namer = ArtifactNamer::new("/out");
        let plan = namer.plan(&[PathBuf::from("/a/x"), PathBuf::from("/b/y")]);
        assert_eq!(
            plan,
            vec![
                PathBuf::from("/out/x_snapshot.txt"),
                PathBuf::from("/out/y_snapshot.txt")
            ]
        );
    }

    #[test]
    fn test_plan_disambiguates_duplicates() {
        let namer = ArtifactNamer::new("/out");
        let sources = [
            PathBuf::from("/a/src"),
            PathBuf::from("/b/src"),
            PathBuf::from("/c/lib"),
        ];
        let plan = namer.plan(&sources);

        assert_ne!(plan[0], plan[1]);
        assert_eq!(plan[2], PathBuf::from("/out/lib_snapshot.txt"));

        let first = plan[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(first.starts_with("src_"));
        assert!(first.ends_with(SNAPSHOT_SUFFIX));
        // src_ + 8 hex + suffix
        assert_eq!(first.len(), 4 + 8 + SNAPSHOT_SUFFIX.len());

        // Stable across runs.
        assert_eq!(namer.plan(&sources), plan);
    }
}
