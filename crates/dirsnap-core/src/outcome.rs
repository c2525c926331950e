//! Task outcomes and run summaries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::{SnapshotError, SnapshotWarning, TaskFailure};

/// Lifecycle of a snapshot task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskState {
    /// Queued, not yet handed to a worker.
    #[default]
    Pending,
    /// Running on a worker.
    Running,
    /// Artifact written; quarantine scan attempted.
    Completed,
    /// Artifact could not be produced.
    Failed,
}

impl TaskState {
    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A suspicious file found by the quarantine scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    /// Original location.
    pub path: PathBuf,
    /// New location, or None if the file was left in place.
    pub moved_to: Option<PathBuf>,
}

/// Result of one snapshot task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Position of the task in the input list.
    pub index: usize,
    /// Directory that was snapshotted.
    pub source: PathBuf,
    /// Artifact path.
    pub artifact: PathBuf,
    /// Terminal state.
    pub state: TaskState,
    /// Failure reason when `state` is `Failed`.
    pub failure: Option<TaskFailure>,
    /// Whether no artifact existed before this run.
    pub first_snapshot: bool,
    /// Number of records written.
    pub records: u64,
    /// Non-fatal walk and scan warnings.
    pub warnings: Vec<SnapshotWarning>,
    /// Suspicious files, moved or left in place.
    pub suspicious: Vec<QuarantineRecord>,
    /// Quarantine moves that failed.
    pub quarantine_errors: Vec<String>,
    /// Wall time spent in the task.
    pub elapsed: Duration,
}

impl TaskOutcome {
    /// Create an outcome for a task that has not produced anything yet.
    pub fn new(index: usize, source: &Path, artifact: &Path) -> Self {
        Self {
            index,
            source: source.to_path_buf(),
            artifact: artifact.to_path_buf(),
            state: TaskState::Pending,
            failure: None,
            first_snapshot: false,
            records: 0,
            warnings: Vec::new(),
            suspicious: Vec::new(),
            quarantine_errors: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Outcome for a task whose worker never reported back.
    pub fn lost(index: usize, source: &Path, artifact: &Path, err: &SnapshotError) -> Self {
        let mut outcome = Self::new(index, source, artifact);
        outcome.fail(err);
        outcome
    }

    /// Mark the outcome as failed with the given error.
    pub fn fail(&mut self, err: &SnapshotError) {
        self.state = TaskState::Failed;
        self.failure = Some(TaskFailure::from(err));
    }

    /// Whether the task reached `Completed`.
    pub fn is_success(&self) -> bool {
        self.state == TaskState::Completed
    }

    /// Number of suspicious files actually moved.
    pub fn moved_count(&self) -> usize {
        self.suspicious.iter().filter(|s| s.moved_to.is_some()).count()
    }
}

/// Aggregate result of a dispatcher run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the run started.
    pub started_at: DateTime<Local>,
    /// Per-task outcomes in input order.
    pub results: Vec<TaskOutcome>,
    /// Total wall time.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Create a summary from finished outcomes.
    pub fn new(started_at: DateTime<Local>, results: Vec<TaskOutcome>, elapsed: Duration) -> Self {
        Self {
            started_at,
            results,
            elapsed,
        }
    }

    /// Number of tasks that completed.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of tasks that failed.
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Whether every task completed.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(TaskOutcome::is_success)
    }

    /// Outcomes of failed tasks.
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        if self.failed() == 0 {
            format!("Snapshotted {} directories", self.succeeded())
        } else {
            format!(
                "Snapshotted {} directories, {} failed",
                self.succeeded(),
                self.failed()
            )
        }
    }
}
