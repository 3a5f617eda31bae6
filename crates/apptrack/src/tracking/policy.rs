use super::domain::{ApplicationStatus, ClassificationEvent, TrackingRecord};

/// Precedence rules applied when an observation meets an existing record.
///
/// Processing order is authoritative: a later event overwrites an earlier one
/// even when its timestamp is older. The only exception is `Unknown`, which
/// never erases a known status.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusPolicy;

impl StatusPolicy {
    pub fn should_update(existing: Option<&TrackingRecord>, incoming: &ClassificationEvent) -> bool {
        match existing {
            None => true,
            Some(_) => incoming.status.is_actionable(),
        }
    }

    pub fn merged_status(
        existing: Option<&TrackingRecord>,
        incoming: &ClassificationEvent,
    ) -> ApplicationStatus {
        match existing {
            Some(record) if !incoming.status.is_actionable() => record.status,
            _ => incoming.status,
        }
    }
}
