use crate::config::ConfigError;
use crate::connectors::{MailboxError, OracleError};
use crate::orchestrator::RunError;
use crate::telemetry::TelemetryError;
use crate::tracking::StoreError;
use std::fmt;

/// Run-fatal failures surfaced by the command line.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Store(StoreError),
    Mailbox(MailboxError),
    Oracle(OracleError),
    Run(RunError),
    Metrics(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Store(err) => write!(f, "tracking table error: {}", err),
            AppError::Mailbox(err) => write!(f, "mailbox error: {}", err),
            AppError::Oracle(err) => write!(f, "classification error: {}", err),
            AppError::Run(err) => write!(f, "run aborted: {}", err),
            AppError::Metrics(err) => write!(f, "metrics error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Mailbox(err) => Some(err),
            AppError::Oracle(err) => Some(err),
            AppError::Run(err) => Some(err),
            AppError::Metrics(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<MailboxError> for AppError {
    fn from(value: MailboxError) -> Self {
        Self::Mailbox(value)
    }
}

impl From<OracleError> for AppError {
    fn from(value: OracleError) -> Self {
        Self::Oracle(value)
    }
}

impl From<RunError> for AppError {
    fn from(value: RunError) -> Self {
        Self::Run(value)
    }
}
