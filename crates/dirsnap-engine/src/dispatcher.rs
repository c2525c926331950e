//! Snapshot job dispatcher.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::sync::broadcast;
use tracing::{info, warn};

use dirsnap_core::{ArtifactNamer, RunSummary, SnapshotConfig, SnapshotError, TaskOutcome, TaskState};

use crate::dispatch::dispatch;
use crate::task::{SnapshotTask, TaskContext};

/// Minimum channel buffer size for dispatch events.
pub const EVENT_CHANNEL_SIZE: usize = 100;

/// Buffer large enough for every event of a run within the directory limit.
fn event_capacity(config: &SnapshotConfig) -> usize {
    match config.directory_limit() {
        Some(limit) => EVENT_CHANNEL_SIZE.max(limit.saturating_mul(2).saturating_add(1)),
        None => EVENT_CHANNEL_SIZE,
    }
}

/// Progress notifications from a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A worker picked up the task.
    Started { index: usize, source: PathBuf },
    /// The task reached a terminal state.
    Finished { index: usize, state: TaskState },
    /// Every task has finished.
    Drained { succeeded: usize, failed: usize },
}

/// Plans snapshot tasks and runs them with bounded concurrency.
pub struct Dispatcher {
    config: SnapshotConfig,
    context: Arc<TaskContext>,
    events: broadcast::Sender<DispatchEvent>,
    event_capacity: usize,
}

impl Dispatcher {
    /// Create a dispatcher for the given configuration.
    pub fn new(config: SnapshotConfig) -> Result<Self, SnapshotError> {
        config.validate()?;
        let context = Arc::new(TaskContext::new(&config)?);
        let event_capacity = event_capacity(&config);
        let (events, _) = broadcast::channel(event_capacity);
        Ok(Self {
            config,
            context,
            events,
            event_capacity,
        })
    }

    /// Replace the event channel with one holding `capacity` events.
    ///
    /// Receivers obtained earlier stop receiving, so call this before
    /// [`subscribe`](Self::subscribe).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        self.events = broadcast::channel(capacity).0;
        self.event_capacity = capacity;
        self
    }

    /// Number of events the channel buffers per receiver.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Use a custom task context.
    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = Arc::new(context);
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Subscribe to dispatch events.
    ///
    /// A run emits `2 * tasks + 1` events. A receiver more than
    /// [`event_capacity`](Self::event_capacity) events behind gets
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    /// Validate the input directories and build one task per directory.
    ///
    /// Nothing is launched if this fails. Repeated paths are collapsed.
    pub fn plan(&self, dirs: &[PathBuf]) -> Result<Vec<SnapshotTask>, SnapshotError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if dir.as_os_str().is_empty() {
                return Err(SnapshotError::invalid_config("Empty directory path"));
            }
            if seen.insert(dir) {
                unique.push(dir.clone());
            } else {
                warn!(path = %dir.display(), "directory listed twice, snapshotting once");
            }
        }

        if unique.is_empty() {
            return Err(SnapshotError::NoDirectories);
        }
        if let Some(limit) = self.config.directory_limit() {
            if unique.len() > limit {
                return Err(SnapshotError::TooManyDirectories {
                    count: unique.len(),
                    limit,
                });
            }
        }

        require_dir(&self.config.output_dir)?;
        if let Some(safe_dir) = &self.config.safe_dir {
            require_dir(safe_dir)?;
        }

        let artifacts = ArtifactNamer::new(&self.config.output_dir).plan(&unique);
        Ok(unique
            .into_iter()
            .zip(artifacts)
            .enumerate()
            .map(|(index, (source, artifact))| SnapshotTask::new(index, source, artifact))
            .collect())
    }

    /// Run every task and wait for all of them to finish.
    pub async fn run(&self, tasks: Vec<SnapshotTask>) -> RunSummary {
        let started_at = Local::now();
        let start = Instant::now();
        info!(
            tasks = tasks.len(),
            max_concurrent = self.config.max_concurrent,
            "starting snapshot run"
        );

        let identities: Vec<(usize, PathBuf, PathBuf)> = tasks
            .iter()
            .map(|t| (t.index(), t.source().to_path_buf(), t.artifact().to_path_buf()))
            .collect();

        let context = Arc::clone(&self.context);
        let events = self.events.clone();
        let results = dispatch(tasks, self.config.max_concurrent, move |_, task: SnapshotTask| {
            info!(task = task.index(), source = %task.source().display(), "worker started");
            let _ = events.send(DispatchEvent::Started {
                index: task.index(),
                source: task.source().to_path_buf(),
            });
            let outcome = task.run(&context);
            let _ = events.send(DispatchEvent::Finished {
                index: outcome.index,
                state: outcome.state,
            });
            outcome
        })
        .await;

        let outcomes: Vec<TaskOutcome> = results
            .into_iter()
            .zip(identities)
            .map(|(result, (index, source, artifact))| match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(task = index, source = %source.display(), error = %err, "worker lost");
                    let _ = self.events.send(DispatchEvent::Finished {
                        index,
                        state: TaskState::Failed,
                    });
                    TaskOutcome::lost(index, &source, &artifact, &err)
                }
            })
            .collect();

        let summary = RunSummary::new(started_at, outcomes, start.elapsed());
        let _ = self.events.send(DispatchEvent::Drained {
            succeeded: summary.succeeded(),
            failed: summary.failed(),
        });
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "snapshot run finished"
        );
        summary
    }

    /// Plan and run in one step.
    pub async fn run_dirs(&self, dirs: &[PathBuf]) -> Result<RunSummary, SnapshotError> {
        let tasks = self.plan(dirs)?;
        Ok(self.run(tasks).await)
    }
}

fn require_dir(path: &Path) -> Result<(), SnapshotError> {
    let metadata = fs::metadata(path).map_err(|e| SnapshotError::io(path, e))?;
    if !metadata.is_dir() {
        return Err(SnapshotError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
