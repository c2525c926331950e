//! Snapshot run configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Default number of snapshot tasks allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Default limit on the number of input directories per run.
pub const DEFAULT_MAX_DIRECTORIES: usize = 10;

/// Default limit on the byte length of any path the recorder builds.
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// What to do when a quarantined file's name is already taken in the safe directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Leave the source in place and report the conflict.
    Skip,
    /// Pick a free name such as `name (1).ext`.
    Rename,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "rename" => Ok(Self::Rename),
            other => Err(format!("unknown conflict policy: {other}")),
        }
    }
}

/// Configuration for a snapshot run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SnapshotConfig {
    /// Directory receiving the `<name>_snapshot.txt` artifacts.
    pub output_dir: PathBuf,

    /// Quarantine directory for suspicious files (None = report only).
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub safe_dir: Option<PathBuf>,

    /// Maximum number of snapshot tasks running at once.
    #[builder(default = "DEFAULT_MAX_CONCURRENT")]
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Maximum number of input directories (None or 0 = unlimited).
    #[builder(default = "Some(DEFAULT_MAX_DIRECTORIES)")]
    #[serde(default = "default_max_directories")]
    pub max_directories: Option<usize>,

    /// Maximum byte length of a constructed entry path.
    #[builder(default = "DEFAULT_MAX_PATH_LEN")]
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,

    /// Stat through symbolic links and descend into linked directories.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Conflict handling in the quarantine directory.
    #[builder(default)]
    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

fn default_max_directories() -> Option<usize> {
    Some(DEFAULT_MAX_DIRECTORIES)
}

fn default_max_path_len() -> usize {
    DEFAULT_MAX_PATH_LEN
}

impl SnapshotConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.output_dir {
            Some(ref dir) if dir.as_os_str().is_empty() => {
                return Err("Output directory cannot be empty".to_string());
            }
            None => return Err("Output directory is required".to_string()),
            Some(_) => {}
        }
        if self.max_concurrent == Some(0) {
            return Err("max_concurrent must be at least 1".to_string());
        }
        if self.max_path_len == Some(0) {
            return Err("max_path_len must be at least 1".to_string());
        }
        if let Some(Some(ref safe)) = self.safe_dir {
            if safe.as_os_str().is_empty() {
                return Err("Safe directory cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl From<SnapshotConfigBuilderError> for SnapshotError {
    fn from(err: SnapshotConfigBuilderError) -> Self {
        SnapshotError::invalid_config(err.to_string())
    }
}

impl SnapshotConfig {
    /// Create a new snapshot config builder.
    pub fn builder() -> SnapshotConfigBuilder {
        SnapshotConfigBuilder::default()
    }

    /// Create a simple config writing artifacts to `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            safe_dir: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_directories: Some(DEFAULT_MAX_DIRECTORIES),
            max_path_len: DEFAULT_MAX_PATH_LEN,
            follow_symlinks: false,
            on_conflict: ConflictPolicy::Overwrite,
        }
    }

    /// Effective input limit. Zero is how TOML and the CLI spell "unlimited".
    pub fn directory_limit(&self) -> Option<usize> {
        self.max_directories.filter(|&n| n > 0)
    }

    /// Check values that serde cannot enforce.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(SnapshotError::invalid_config("Output directory cannot be empty"));
        }
        if self.max_concurrent == 0 {
            return Err(SnapshotError::invalid_config("max_concurrent must be at least 1"));
        }
        if self.max_path_len == 0 {
            return Err(SnapshotError::invalid_config("max_path_len must be at least 1"));
        }
        Ok(())
    }

    /// Parse a complete config from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, SnapshotError> {
        let config: Self =
            toml::from_str(s).map_err(|e| SnapshotError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a complete config from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_toml_str(&content)
    }
}

/// Partial configuration read from a file; command-line values win over it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub output_dir: Option<PathBuf>,
    pub safe_dir: Option<PathBuf>,
    pub max_concurrent: Option<usize>,
    pub max_directories: Option<usize>,
    pub max_path_len: Option<usize>,
    pub follow_symlinks: Option<bool>,
    pub on_conflict: Option<ConflictPolicy>,
}

impl ConfigFile {
    /// Parse a partial config from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, SnapshotError> {
        toml::from_str(s).map_err(|e| SnapshotError::invalid_config(e.to_string()))
    }

    /// Read a partial config file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Seed a builder with the values present in this file.
    pub fn into_builder(self) -> SnapshotConfigBuilder {
        let mut builder = SnapshotConfig::builder();
        if let Some(dir) = self.output_dir {
            builder.output_dir(dir);
        }
        if let Some(dir) = self.safe_dir {
            builder.safe_dir(dir);
        }
        if let Some(n) = self.max_concurrent {
            builder.max_concurrent(n);
        }
        if let Some(n) = self.max_directories {
            builder.max_directories(Some(n));
        }
        if let Some(n) = self.max_path_len {
            builder.max_path_len(n);
        }
        if let Some(follow) = self.follow_symlinks {
            builder.follow_symlinks(follow);
        }
        if let Some(policy) = self.on_conflict {
            builder.on_conflict(policy);
        }
        builder
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
