//! Snapshot tasks and bounded concurrent dispatch for dirsnap.
//!
//! A [`SnapshotTask`] writes one directory's snapshot artifact and then runs
//! the quarantine scan over the directory's immediate children. The
//! [`Dispatcher`] runs many tasks on blocking worker threads, never more than
//! `max_concurrent` at once, launching them in input order.
//!
//! # Example
//!
//! ```rust,no_run
//! use dirsnap_engine::{Dispatcher, SnapshotConfig};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), dirsnap_engine::SnapshotError> {
//! let config = SnapshotConfig::builder()
//!     .output_dir("/tmp/snapshots")
//!     .max_concurrent(2usize)
//!     .build()?;
//! let dispatcher = Dispatcher::new(config)?;
//! let summary = dispatcher
//!     .run_dirs(&[PathBuf::from("/srv/a"), PathBuf::from("/srv/b")])
//!     .await?;
//! println!("{}", summary.summary());
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod dispatcher;
mod task;

pub use dispatch::dispatch;
pub use dispatcher::{DispatchEvent, Dispatcher, EVENT_CHANNEL_SIZE};
pub use task::{SnapshotTask, TaskContext};

// Re-export core types for convenience
pub use dirsnap_core::{
    RunSummary, SnapshotConfig, SnapshotError, TaskFailure, TaskOutcome, TaskState,
};
