//! Core types and configuration for dirsnap.
//!
//! This crate provides the data model shared by the recorder, the quarantine
//! stage and the dispatcher: metadata records, run configuration, task
//! outcomes, and artifact naming.

mod artifact;
mod config;
mod error;
mod outcome;
mod record;

pub use artifact::{ArtifactNamer, SNAPSHOT_SUFFIX};
pub use config::{
    ConfigFile, ConflictPolicy, SnapshotConfig, SnapshotConfigBuilder, SnapshotConfigBuilderError,
    DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_DIRECTORIES, DEFAULT_MAX_PATH_LEN,
};
pub use error::{FailureKind, SnapshotError, SnapshotWarning, TaskFailure, WarningKind};
pub use outcome::{QuarantineRecord, RunSummary, TaskOutcome, TaskState};
pub use record::MetadataRecord;
