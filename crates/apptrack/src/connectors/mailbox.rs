use std::fmt::Debug;

use chrono::{Duration, NaiveDate};

use crate::tracking::{MessageRef, RawMessage};

/// Search window and subject filter used to enumerate candidate messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxQuery {
    pub window_days: u32,
    pub subject_terms: Vec<String>,
}

impl MailboxQuery {
    pub fn new(window_days: u32, subject_terms: Vec<String>) -> Self {
        Self {
            window_days,
            subject_terms,
        }
    }

    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.window_days))
    }

    /// Renders the Gmail search expression, e.g.
    /// `after:2025/03/01 subject:application OR subject:status`.
    pub fn search_expression(&self, today: NaiveDate) -> String {
        let mut expression = format!("after:{}", self.window_start(today).format("%Y/%m/%d"));
        let subjects: Vec<String> = self
            .subject_terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(|term| {
                if term.contains(char::is_whitespace) {
                    format!("subject:\"{term}\"")
                } else {
                    format!("subject:{term}")
                }
            })
            .collect();

        if !subjects.is_empty() {
            expression.push(' ');
            expression.push_str(&subjects.join(" OR "));
        }
        expression
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    #[error("mailbox authentication failed: {0}")]
    Authentication(String),
    #[error("mailbox operation failed: {0}")]
    Backend(String),
    #[error("mailbox runtime unavailable: {0}")]
    Runtime(String),
    #[error("message {0} not found")]
    NotFound(MessageRef),
}

/// Source of candidate messages.
pub trait Mailbox: Debug {
    fn list_candidates(&self, query: &MailboxQuery) -> Result<Vec<MessageRef>, MailboxError>;
    fn fetch_message(&self, message: &MessageRef) -> Result<RawMessage, MailboxError>;
}

impl<T: Mailbox + ?Sized> Mailbox for Box<T> {
    fn list_candidates(&self, query: &MailboxQuery) -> Result<Vec<MessageRef>, MailboxError> {
        (**self).list_candidates(query)
    }

    fn fetch_message(&self, message: &MessageRef) -> Result<RawMessage, MailboxError> {
        (**self).fetch_message(message)
    }
}
