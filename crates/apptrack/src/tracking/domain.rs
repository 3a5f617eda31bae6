use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder employer recorded when the oracle answer cannot be decomposed.
pub const UNKNOWN_EMPLOYER: &str = "Unknown Employer";
/// Placeholder role recorded when the oracle answer cannot be decomposed.
pub const UNKNOWN_ROLE: &str = "Unknown Role";

/// Human readable timestamp layout used by the persisted table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Closed status vocabulary every classification maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Rejected,
    Advancing,
    Unknown,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Rejected,
        ApplicationStatus::Advancing,
        ApplicationStatus::Unknown,
    ];

    /// Maps an oracle status code onto the vocabulary. Unrecognized codes
    /// degrade to `Unknown` rather than failing.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "t" | "applied" | "received" | "submitted" => Self::Applied,
            "f" | "rejected" | "declined" | "rejection" => Self::Rejected,
            "i" | "advancing" | "advanced" | "interview" | "next phase" | "next step" => {
                Self::Advancing
            }
            _ => Self::Unknown,
        }
    }

    /// Strict variant used when reading persisted rows: accepts labels and the
    /// single letter codes, rejects anything else.
    pub fn from_stored(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .or(match trimmed {
                "T" => Some(Self::Applied),
                "F" => Some(Self::Rejected),
                "I" => Some(Self::Advancing),
                "None" | "" => Some(Self::Unknown),
                _ => None,
            })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::Rejected => "Rejected",
            Self::Advancing => "Advancing",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized output of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationEvent {
    pub status: ApplicationStatus,
    pub employer: String,
    pub role: String,
    pub observed_at: NaiveDateTime,
}

impl ClassificationEvent {
    pub fn new(
        status: ApplicationStatus,
        employer: impl Into<String>,
        role: impl Into<String>,
        observed_at: NaiveDateTime,
    ) -> Self {
        Self {
            status,
            employer: employer.into(),
            role: role.into(),
            observed_at: truncate_to_seconds(observed_at),
        }
    }

    /// Event substituted when the oracle answer has the wrong shape.
    pub fn unclassified(observed_at: NaiveDateTime) -> Self {
        Self::new(
            ApplicationStatus::Unknown,
            UNKNOWN_EMPLOYER,
            UNKNOWN_ROLE,
            observed_at,
        )
    }

    pub fn matches(&self, record: &TrackingRecord) -> bool {
        record.employer == self.employer && record.role == self.role
    }
}

/// One row of the persistent table, keyed by `(employer, role)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingRecord {
    pub employer: String,
    pub role: String,
    pub last_observed_at: NaiveDateTime,
    pub status: ApplicationStatus,
}

impl TrackingRecord {
    pub fn from_event(event: &ClassificationEvent) -> Self {
        Self {
            employer: event.employer.clone(),
            role: event.role.clone(),
            last_observed_at: event.observed_at,
            status: event.status,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.employer, &self.role)
    }
}

/// Opaque handle for a message the mailbox reported as a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef(pub String);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message as produced by the mailbox connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub message_id: MessageRef,
    pub subject: String,
    /// Plain text body; empty when the message had no plain text part.
    pub body: String,
    pub received_at: Option<DateTime<Utc>>,
}

impl RawMessage {
    pub fn new(message_id: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: MessageRef(message_id.into()),
            subject: subject.into(),
            body: body.into(),
            received_at: None,
        }
    }
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// The table stores whole seconds, so events are truncated on creation to
/// keep in-memory and reloaded state identical.
pub(crate) fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}
