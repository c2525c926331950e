//! Per-directory snapshot task.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use dirsnap_core::{
    QuarantineRecord, SnapshotConfig, SnapshotError, SnapshotWarning, TaskOutcome, TaskState,
};
use dirsnap_quarantine::{MoveOutcome, Quarantine, SuspicionRule};
use dirsnap_scan::Recorder;

/// Shared, read-only collaborators of every task in a run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    recorder: Recorder,
    quarantine: Quarantine,
    rule: SuspicionRule,
    max_path_len: usize,
}

impl TaskContext {
    /// Build the context for a run.
    ///
    /// Fails if the suspicion rule cannot be compiled.
    pub fn new(config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        let rule = SuspicionRule::builtin()
            .map_err(|e| SnapshotError::invalid_config(e.to_string()))?
            .clone();
        Ok(Self {
            recorder: Recorder::new(config),
            quarantine: Quarantine::new(config.safe_dir.clone(), config.on_conflict),
            rule,
            max_path_len: config.max_path_len,
        })
    }

    /// Replace the suspicion rule.
    pub fn with_rule(mut self, rule: SuspicionRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Snapshot of one directory plus the follow-up quarantine scan.
#[derive(Debug, Clone)]
pub struct SnapshotTask {
    index: usize,
    source: PathBuf,
    artifact: PathBuf,
    state: TaskState,
}

impl SnapshotTask {
    /// Create a pending task.
    pub fn new(index: usize, source: impl Into<PathBuf>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            index,
            source: source.into(),
            artifact: artifact.into(),
            state: TaskState::Pending,
        }
    }

    /// Position in the input list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Directory to snapshot.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination artifact.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run the task to a terminal state.
    ///
    /// Only a failure to produce the artifact fails the task. Problems in the
    /// quarantine scan are recorded on the outcome.
    pub fn run(mut self, ctx: &TaskContext) -> TaskOutcome {
        let span = info_span!("snapshot", task = self.index, source = %self.source.display());
        let _guard = span.enter();

        let start = Instant::now();
        self.state = TaskState::Running;
        let mut outcome = TaskOutcome::new(self.index, &self.source, &self.artifact);
        outcome.state = self.state;
        outcome.first_snapshot = self.artifact.symlink_metadata().is_err();

        if outcome.first_snapshot {
            info!(artifact = %self.artifact.display(), "creating snapshot for the first time");
        } else {
            debug!(artifact = %self.artifact.display(), "updating snapshot");
        }

        match ctx.recorder.write_snapshot(&self.source, &self.artifact) {
            Ok(stats) => {
                outcome.records = stats.records;
                outcome.warnings = stats.warnings;
                info!(records = outcome.records, "snapshot updated");
            }
            Err(err) => {
                warn!(error = %err, "snapshot failed");
                self.state = TaskState::Failed;
                outcome.fail(&err);
                outcome.elapsed = start.elapsed();
                return outcome;
            }
        }

        self.scan_children(ctx, &mut outcome);

        self.state = TaskState::Completed;
        outcome.state = self.state;
        outcome.elapsed = start.elapsed();
        outcome
    }

    /// Classify the immediate regular-file children and quarantine matches.
    fn scan_children(&self, ctx: &TaskContext, outcome: &mut TaskOutcome) {
        let entries = match fs::read_dir(&self.source) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "quarantine scan could not list directory");
                outcome
                    .warnings
                    .push(SnapshotWarning::read_error(&self.source, &err));
                return;
            }
        };

        // The output directory may be the source under another spelling.
        let artifact_name = self.artifact.file_name();
        let artifact_real = fs::canonicalize(&self.artifact).ok();
        let is_own_artifact = |path: &Path| {
            path == self.artifact
                || artifact_real
                    .as_deref()
                    .is_some_and(|real| fs::canonicalize(path).is_ok_and(|p| p == real))
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    outcome
                        .warnings
                        .push(SnapshotWarning::read_error(&self.source, &err));
                    continue;
                }
            };

            let path = entry.path();
            if Some(entry.file_name().as_os_str()) == artifact_name && is_own_artifact(&path) {
                continue;
            }
            if path.as_os_str().len() > ctx.max_path_len {
                outcome
                    .warnings
                    .push(SnapshotWarning::path_too_long(&path, ctx.max_path_len));
                continue;
            }

            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cannot stat entry");
                    outcome
                        .warnings
                        .push(SnapshotWarning::metadata_error(&path, &err));
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name();
            if !ctx.rule.matches(&name.to_string_lossy()) {
                continue;
            }

            warn!(path = %path.display(), "potentially malicious file");
            let moved_to = match ctx.quarantine.quarantine(&path) {
                Ok(MoveOutcome::Moved { to, .. }) => Some(to),
                Ok(MoveOutcome::Skipped { .. }) => None,
                Err(err) => {
                    if err.is_vanished() {
                        debug!(path = %path.display(), "file disappeared before quarantine");
                    } else if err.is_cross_device() {
                        warn!(error = %err, "safe directory is on another filesystem");
                    } else {
                        warn!(error = %err, "quarantine failed");
                    }
                    outcome.quarantine_errors.push(err.to_string());
                    None
                }
            };
            outcome.suspicious.push(QuarantineRecord { path, moved_to });
        }
    }
}
