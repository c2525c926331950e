//! Directory metadata recorder for dirsnap.
//!
//! This crate walks a directory tree and writes one `<name> <mtime>` line per
//! entry to a snapshot artifact.
//!
//! # Overview
//!
//! - **Depth-first pre-order**: a directory's own record precedes its contents
//! - **Lazy**: [`Recorder::records`] yields records as the walk proceeds
//! - **Recoverable**: unreadable subdirectories, stat failures and over-long
//!   paths become warnings and the walk carries on
//!
//! # Example
//!
//! ```rust,no_run
//! use dirsnap_scan::{Recorder, SnapshotConfig};
//! use std::path::Path;
//!
//! let config = SnapshotConfig::new("/tmp/snapshots");
//! let recorder = Recorder::new(&config);
//! let stats = recorder
//!     .write_snapshot(Path::new("/home/user/docs"), Path::new("/tmp/snapshots/docs_snapshot.txt"))
//!     .unwrap();
//!
//! println!("{} records, {} warnings", stats.records, stats.warnings.len());
//! ```

mod recorder;

pub use recorder::{RecordIter, Recorder, SnapshotStats};

// Re-export core types for convenience
pub use dirsnap_core::{MetadataRecord, SnapshotConfig, SnapshotError, SnapshotWarning, WarningKind};
