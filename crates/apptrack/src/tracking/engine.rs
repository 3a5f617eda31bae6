use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use super::domain::{ApplicationStatus, ClassificationEvent, RawMessage};
use super::history::StatusTransition;
use super::parser::{AnswerParser, ParseError};
use super::store::{RecordStore, UpsertOutcome};
use crate::connectors::oracle::{classification_prompt, ClassificationOracle, OracleError};

/// Why a message did not touch the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The oracle found no actionable status.
    Unactionable,
    /// The oracle answer had the wrong shape and was replaced by the
    /// unclassified event.
    MalformedAnswer(ParseError),
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unactionable => "unactionable",
            Self::MalformedAnswer(_) => "malformed_answer",
        }
    }
}

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Skipped {
        event: ClassificationEvent,
        reason: SkipReason,
    },
    Reconciled {
        event: ClassificationEvent,
        outcome: UpsertOutcome,
        /// Present when the table changed.
        transition: Option<StatusTransition>,
    },
}

impl ReconciliationOutcome {
    pub fn event(&self) -> &ClassificationEvent {
        match self {
            Self::Skipped { event, .. } | Self::Reconciled { event, .. } => event,
        }
    }
}

/// Classifies messages through the oracle and merges actionable results into
/// a [`RecordStore`], one message at a time.
#[derive(Debug)]
pub struct ReconciliationEngine<O> {
    oracle: O,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl<O: ClassificationOracle> ReconciliationEngine<O> {
    pub fn new(oracle: O) -> Self {
        Self::with_clock(oracle, local_now)
    }

    /// Overrides the source of `observed_at` timestamps.
    pub fn with_clock(oracle: O, clock: fn() -> NaiveDateTime) -> Self {
        Self { oracle, clock }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Asks the oracle about `body` and parses the answer without touching any
    /// store. Malformed answers come back as the unclassified event.
    pub fn classify(
        &self,
        body: &str,
    ) -> Result<(ClassificationEvent, Option<ParseError>), OracleError> {
        let answer = self.oracle.classify(&classification_prompt(body))?;
        Ok(AnswerParser::parse_or_fallback(&answer, (self.clock)()))
    }

    pub fn process(
        &self,
        store: &mut RecordStore,
        message: &RawMessage,
    ) -> Result<ReconciliationOutcome, OracleError> {
        let (event, parse_error) = self.classify(&message.body)?;

        if let Some(err) = parse_error {
            warn!(message_id = %message.message_id, error = %err, "discarding malformed oracle answer");
            return Ok(ReconciliationOutcome::Skipped {
                event,
                reason: SkipReason::MalformedAnswer(err),
            });
        }

        if event.status == ApplicationStatus::Unknown {
            debug!(
                message_id = %message.message_id,
                employer = %event.employer,
                role = %event.role,
                "no actionable status"
            );
            return Ok(ReconciliationOutcome::Skipped {
                event,
                reason: SkipReason::Unactionable,
            });
        }

        let previous = store
            .find(&event.employer, &event.role)
            .map(|record| record.status);
        let outcome = store.upsert(&event);
        let transition = match outcome {
            UpsertOutcome::Unchanged => None,
            UpsertOutcome::Created | UpsertOutcome::Updated => store
                .find(&event.employer, &event.role)
                .map(|record| StatusTransition::new(previous, record, message.message_id.clone())),
        };

        info!(
            message_id = %message.message_id,
            employer = %event.employer,
            role = %event.role,
            status = %event.status,
            outcome = outcome.label(),
            "reconciled application status"
        );

        Ok(ReconciliationOutcome::Reconciled {
            event,
            outcome,
            transition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct ScriptedOracle {
        answers: Mutex<VecDeque<Result<String, OracleError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(answers: Vec<Result<&str, OracleError>>) -> Self {
            Self {
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .map(|answer| answer.map(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl ClassificationOracle for ScriptedOracle {
        fn classify(&self, prompt: &str) -> Result<String, OracleError> {
            self.prompts.lock().expect("prompt mutex").push(prompt.to_string());
            self.answers
                .lock()
                .expect("answer mutex")
                .pop_front()
                .unwrap_or_else(|| Ok("None".to_string()))
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 1)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn engine(answers: Vec<Result<&str, OracleError>>) -> ReconciliationEngine<ScriptedOracle> {
        ReconciliationEngine::with_clock(ScriptedOracle::new(answers), fixed_clock)
    }

    #[test]
    fn actionable_answer_creates_record() {
        let engine = engine(vec![Ok("[T, Acme Corp, Backend Engineer]")]);
        let mut store = RecordStore::empty("unused.csv");

        let outcome = engine
            .process(&mut store, &RawMessage::new("m-1", "Application received", "Thanks"))
            .expect("processed");

        match outcome {
            ReconciliationOutcome::Reconciled {
                outcome,
                transition,
                ..
            } => {
                assert_eq!(outcome, UpsertOutcome::Created);
                let transition = transition.expect("transition recorded");
                assert_eq!(transition.previous, None);
                assert_eq!(transition.status, ApplicationStatus::Applied);
            }
            other => panic!("expected reconciliation, got {other:?}"),
        }
        let record = store.find("Acme Corp", "Backend Engineer").expect("row");
        assert_eq!(record.last_observed_at, fixed_clock());
        let prompts = engine.oracle().prompts.lock().expect("prompts");
        assert!(prompts[0].contains("Thanks"));
    }

    #[test]
    fn unknown_status_skips_without_touching_store() {
        let engine = engine(vec![Ok("[None, Acme Corp, Backend Engineer]")]);
        let mut store = RecordStore::empty("unused.csv");
        store.upsert(&ClassificationEvent::new(
            ApplicationStatus::Applied,
            "Acme Corp",
            "Backend Engineer",
            fixed_clock(),
        ));
        let before = store.records().to_vec();

        let outcome = engine
            .process(&mut store, &RawMessage::new("m-2", "Newsletter", "Hello"))
            .expect("processed");

        assert!(matches!(
            outcome,
            ReconciliationOutcome::Skipped {
                reason: SkipReason::Unactionable,
                ..
            }
        ));
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn malformed_answer_falls_back_and_skips() {
        let engine = engine(vec![Ok("T, OnlyCompany")]);
        let mut store = RecordStore::empty("unused.csv");

        let outcome = engine
            .process(&mut store, &RawMessage::new("m-3", "Status", ""))
            .expect("processed");

        match outcome {
            ReconciliationOutcome::Skipped { event, reason } => {
                assert_eq!(reason, SkipReason::MalformedAnswer(ParseError::MalformedShape { found: 2 }));
                assert_eq!(event.employer, "Unknown Employer");
                assert_eq!(event.role, "Unknown Role");
            }
            other => panic!("expected skip, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn oracle_errors_surface_to_caller() {
        let engine = engine(vec![Err(OracleError::RateLimited)]);
        let mut store = RecordStore::empty("unused.csv");

        let error = engine
            .process(&mut store, &RawMessage::new("m-4", "Status", "body"))
            .expect_err("oracle failure");
        assert_eq!(error, OracleError::RateLimited);
        assert!(store.is_empty());
    }

    #[test]
    fn reclassification_updates_existing_row() {
        let engine = engine(vec![
            Ok("[T, Acme Corp, Backend Engineer]"),
            Ok("[F, Acme Corp, Backend Engineer]"),
        ]);
        let mut store = RecordStore::empty("unused.csv");

        engine
            .process(&mut store, &RawMessage::new("m-5", "Received", "a"))
            .expect("first");
        let outcome = engine
            .process(&mut store, &RawMessage::new("m-6", "Update", "b"))
            .expect("second");

        match outcome {
            ReconciliationOutcome::Reconciled {
                outcome,
                transition: Some(transition),
                ..
            } => {
                assert_eq!(outcome, UpsertOutcome::Updated);
                assert_eq!(transition.previous, Some(ApplicationStatus::Applied));
                assert_eq!(transition.status, ApplicationStatus::Rejected);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(store.len(), 1);
    }
}
