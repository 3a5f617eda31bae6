//! Classification-output handling and reconciliation into the tracking table.

pub mod domain;
pub mod engine;
pub mod history;
pub mod parser;
pub mod policy;
pub mod store;

pub use domain::{
    format_timestamp, parse_timestamp, ApplicationStatus, ClassificationEvent, MessageRef,
    RawMessage, TrackingRecord, TIMESTAMP_FORMAT, UNKNOWN_EMPLOYER, UNKNOWN_ROLE,
};
pub use engine::{ReconciliationEngine, ReconciliationOutcome, SkipReason};
pub use history::{StatusHistory, StatusTransition};
pub use parser::{AnswerParser, ParseError};
pub use policy::StatusPolicy;
pub use store::{RecordStore, StoreError, UpsertOutcome, TABLE_HEADERS};
