use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{format_timestamp, ApplicationStatus, MessageRef, TrackingRecord};
use super::store::StoreError;

/// One status change applied to the tracking table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub employer: String,
    pub role: String,
    pub observed_at: NaiveDateTime,
    pub previous: Option<ApplicationStatus>,
    pub status: ApplicationStatus,
    pub message_id: MessageRef,
}

impl StatusTransition {
    pub fn new(
        previous: Option<ApplicationStatus>,
        current: &TrackingRecord,
        message_id: MessageRef,
    ) -> Self {
        Self {
            employer: current.employer.clone(),
            role: current.role.clone(),
            observed_at: current.last_observed_at,
            previous,
            status: current.status,
            message_id,
        }
    }
}

/// Append-only CSV log of status transitions.
#[derive(Debug, Clone)]
pub struct StatusHistory {
    path: PathBuf,
}

#[derive(Serialize)]
struct HistoryRow<'a> {
    #[serde(rename = "Employer")]
    employer: &'a str,
    #[serde(rename = "Role")]
    role: &'a str,
    #[serde(rename = "ObservedAt")]
    observed_at: String,
    #[serde(rename = "PreviousStatus")]
    previous: &'static str,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "MessageId")]
    message_id: &'a str,
}

impl StatusHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the transitions, writing the header first when the log is new.
    pub fn append(&self, transitions: &[StatusTransition]) -> Result<(), StoreError> {
        if transitions.is_empty() {
            return Ok(());
        }

        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let csv_error = |source| StoreError::Csv {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let needs_header = fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for transition in transitions {
            writer
                .serialize(HistoryRow {
                    employer: &transition.employer,
                    role: &transition.role,
                    observed_at: format_timestamp(&transition.observed_at),
                    previous: transition.previous.map(|s| s.label()).unwrap_or(""),
                    status: transition.status.label(),
                    message_id: &transition.message_id.0,
                })
                .map_err(csv_error)?;
        }
        writer.flush().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn transition(previous: Option<ApplicationStatus>, status: ApplicationStatus, id: &str) -> StatusTransition {
        let record = TrackingRecord {
            employer: "Acme".to_string(),
            role: "Engineer".to_string(),
            last_observed_at: NaiveDate::from_ymd_opt(2025, 8, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            status,
        };
        StatusTransition::new(previous, &record, MessageRef(id.to_string()))
    }

    #[test]
    fn append_writes_header_once_and_keeps_prior_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = StatusHistory::new(dir.path().join("history.csv"));

        history
            .append(&[transition(None, ApplicationStatus::Applied, "m-1")])
            .expect("first append");
        history
            .append(&[transition(
                Some(ApplicationStatus::Applied),
                ApplicationStatus::Advancing,
                "m-2",
            )])
            .expect("second append");

        let contents = fs::read_to_string(history.path()).expect("log written");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Employer,Role,ObservedAt,PreviousStatus,Status,MessageId",
                "Acme,Engineer,2025-08-01 10:00:00,,Applied,m-1",
                "Acme,Engineer,2025-08-01 10:00:00,Applied,Advancing,m-2",
            ]
        );
    }

    #[test]
    fn empty_batch_does_not_create_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = StatusHistory::new(dir.path().join("history.csv"));
        history.append(&[]).expect("noop");
        assert!(!history.path().exists());
    }
}
