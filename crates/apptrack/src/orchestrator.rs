use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::connectors::{ClassificationOracle, Mailbox, MailboxError, MailboxQuery};
use crate::metrics::{self as run_metrics, FailureStage};
use crate::tracking::{
    ReconciliationEngine, ReconciliationOutcome, RecordStore, SkipReason, StatusHistory,
    StatusTransition, StoreError, UpsertOutcome,
};

/// Per-run tallies reported after the table is saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ReconciliationOutcome) {
        match outcome {
            ReconciliationOutcome::Reconciled { outcome, .. } => match outcome {
                UpsertOutcome::Created => self.created += 1,
                UpsertOutcome::Updated => self.updated += 1,
                UpsertOutcome::Unchanged => self.unchanged += 1,
            },
            ReconciliationOutcome::Skipped {
                reason: SkipReason::MalformedAnswer(_),
                ..
            } => self.malformed += 1,
            ReconciliationOutcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("another run holds the lock at {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("failed to manage run lock {}: {}", .path.display(), .source)]
    Lock { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unable to list candidate messages: {0}")]
    Mailbox(#[from] MailboxError),
}

/// Exclusive marker file guarding a tracking table against concurrent runs.
/// Removed when dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn lock_path_for(store_path: &Path) -> PathBuf {
        let mut name = store_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        store_path.with_file_name(name)
    }

    pub fn acquire(store_path: &Path) -> Result<Self, RunError> {
        let path = Self::lock_path_for(store_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RunError::Lock {
                path: path.clone(),
                source,
            })?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(RunError::AlreadyRunning(path))
            }
            Err(source) => return Err(RunError::Lock { path, source }),
        };
        // Best effort: the pid only helps an operator clear a stale lock.
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release run lock");
        }
    }
}

/// Drives one full pass: candidates are processed in mailbox order, the table
/// is saved once at the end, then history is appended.
pub struct TrackerRun<'a, M, O> {
    mailbox: &'a M,
    engine: &'a ReconciliationEngine<O>,
    history: Option<&'a StatusHistory>,
}

impl<'a, M, O> TrackerRun<'a, M, O>
where
    M: Mailbox,
    O: ClassificationOracle,
{
    pub fn new(mailbox: &'a M, engine: &'a ReconciliationEngine<O>) -> Self {
        Self {
            mailbox,
            engine,
            history: None,
        }
    }

    pub fn with_history(mut self, history: &'a StatusHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Locks, loads, reconciles, and saves the table at `store_path`.
    pub fn execute(&self, store_path: &Path, query: &MailboxQuery) -> Result<RunSummary, RunError> {
        let _lock = RunLock::acquire(store_path)?;
        let mut store = RecordStore::load(store_path)?;
        self.reconcile_into(&mut store, query)
    }

    /// Reconciles every candidate into an already loaded store and persists
    /// it. Per-message failures are logged and counted; listing and storage
    /// failures abort the run.
    pub fn reconcile_into(
        &self,
        store: &mut RecordStore,
        query: &MailboxQuery,
    ) -> Result<RunSummary, RunError> {
        let candidates = self.mailbox.list_candidates(query)?;
        let mut summary = RunSummary {
            candidates: candidates.len(),
            ..RunSummary::default()
        };
        let mut transitions: Vec<StatusTransition> = Vec::new();
        info!(candidates = candidates.len(), "starting reconciliation pass");

        for candidate in &candidates {
            run_metrics::record_seen();

            let message = match self.mailbox.fetch_message(candidate) {
                Ok(message) => message,
                Err(err) => {
                    warn!(message_id = %candidate, error = %err, "skipping message that could not be fetched");
                    run_metrics::record_failure(FailureStage::Fetch);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.engine.process(store, &message) {
                Ok(outcome) => {
                    run_metrics::record_outcome(&outcome);
                    summary.record(&outcome);
                    if let ReconciliationOutcome::Reconciled {
                        transition: Some(transition),
                        ..
                    } = outcome
                    {
                        transitions.push(transition);
                    }
                }
                Err(err) => {
                    warn!(message_id = %candidate, error = %err, "classification failed");
                    run_metrics::record_failure(FailureStage::Classify);
                    summary.failed += 1;
                }
            }
        }

        store.save()?;
        if let Some(history) = self.history {
            history.append(&transitions)?;
        }

        info!(
            candidates = summary.candidates,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            malformed = summary.malformed,
            failed = summary.failed,
            rows = store.len(),
            "reconciliation pass complete"
        );
        Ok(summary)
    }
}
