//! Run counters reported through the `metrics` facade. Without an installed
//! recorder every call is a no-op.

use metrics::counter;

use crate::tracking::{ReconciliationOutcome, SkipReason};

pub const MESSAGES_SEEN: &str = "apptrack_messages_seen_total";
pub const MESSAGES_RECONCILED: &str = "apptrack_messages_reconciled_total";
pub const MESSAGES_SKIPPED: &str = "apptrack_messages_skipped_total";
pub const MESSAGES_FAILED: &str = "apptrack_messages_failed_total";

/// Stage at which a message was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Fetch,
    Classify,
}

impl FailureStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Classify => "classify",
        }
    }
}

pub fn record_seen() {
    counter!(MESSAGES_SEEN).increment(1);
}

pub fn record_outcome(outcome: &ReconciliationOutcome) {
    match outcome {
        ReconciliationOutcome::Reconciled { outcome, .. } => {
            counter!(MESSAGES_RECONCILED, "outcome" => outcome.label()).increment(1);
        }
        ReconciliationOutcome::Skipped { reason, .. } => record_skip(reason),
    }
}

fn record_skip(reason: &SkipReason) {
    counter!(MESSAGES_SKIPPED, "reason" => reason.label()).increment(1);
}

pub fn record_failure(stage: FailureStage) {
    counter!(MESSAGES_FAILED, "stage" => stage.label()).increment(1);
}
