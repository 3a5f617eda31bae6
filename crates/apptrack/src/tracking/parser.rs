use chrono::NaiveDateTime;

use super::domain::{ApplicationStatus, ClassificationEvent, UNKNOWN_EMPLOYER, UNKNOWN_ROLE};

const FIELD_DELIMITER: char = ',';
const EXPECTED_FIELDS: usize = 3;

/// Structural failure of an oracle answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {EXPECTED_FIELDS} fields in oracle answer, found {found}")]
    MalformedShape { found: usize },
}

/// Turns the oracle's `[status, company, role]` answer into an event.
pub struct AnswerParser;

impl AnswerParser {
    pub fn parse(
        raw_answer: &str,
        observed_at: NaiveDateTime,
    ) -> Result<ClassificationEvent, ParseError> {
        let body = raw_answer.trim().trim_matches(|c| c == '[' || c == ']');
        let fields: Vec<&str> = body.split(FIELD_DELIMITER).map(clean_field).collect();

        let [code, employer, role] = fields.as_slice() else {
            return Err(ParseError::MalformedShape {
                found: fields.len(),
            });
        };

        Ok(ClassificationEvent::new(
            ApplicationStatus::from_code(code),
            or_sentinel(employer, UNKNOWN_EMPLOYER),
            or_sentinel(role, UNKNOWN_ROLE),
            observed_at,
        ))
    }

    /// Like [`AnswerParser::parse`] but substitutes the unclassified event on
    /// malformed input, so every message yields some event.
    pub fn parse_or_fallback(
        raw_answer: &str,
        observed_at: NaiveDateTime,
    ) -> (ClassificationEvent, Option<ParseError>) {
        match Self::parse(raw_answer, observed_at) {
            Ok(event) => (event, None),
            Err(err) => (ClassificationEvent::unclassified(observed_at), Some(err)),
        }
    }
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches(|c| c == '\'' || c == '"').trim()
}

fn or_sentinel(value: &str, sentinel: &str) -> String {
    if value.is_empty() {
        sentinel.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 2)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test]
    fn parses_bracketed_answer() {
        let event =
            AnswerParser::parse("[T, Acme Corp, Backend Engineer]", now()).expect("parses");
        assert_eq!(event.status, ApplicationStatus::Applied);
        assert_eq!(event.employer, "Acme Corp");
        assert_eq!(event.role, "Backend Engineer");
        assert_eq!(event.observed_at, now());
    }

    #[test]
    fn strips_quotes_around_fields() {
        let event = AnswerParser::parse("['F', \"Globex\", 'Data Analyst']\n", now())
            .expect("parses");
        assert_eq!(event.status, ApplicationStatus::Rejected);
        assert_eq!(event.employer, "Globex");
        assert_eq!(event.role, "Data Analyst");
    }

    #[test]
    fn unrecognized_code_degrades_to_unknown() {
        let event = AnswerParser::parse("[None, Initech, Tester]", now()).expect("parses");
        assert_eq!(event.status, ApplicationStatus::Unknown);
        assert_eq!(event.employer, "Initech");

        let event = AnswerParser::parse("[Q, Initech, Tester]", now()).expect("parses");
        assert_eq!(event.status, ApplicationStatus::Unknown);
    }

    #[test]
    fn empty_fields_use_sentinels() {
        let event = AnswerParser::parse("[I, '', ]", now()).expect("parses");
        assert_eq!(event.status, ApplicationStatus::Advancing);
        assert_eq!(event.employer, UNKNOWN_EMPLOYER);
        assert_eq!(event.role, UNKNOWN_ROLE);
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        assert_eq!(
            AnswerParser::parse("T, OnlyCompany", now()),
            Err(ParseError::MalformedShape { found: 2 })
        );
        assert_eq!(
            AnswerParser::parse("[T, Acme, Inc., Engineer]", now()),
            Err(ParseError::MalformedShape { found: 4 })
        );
        assert_eq!(
            AnswerParser::parse("", now()),
            Err(ParseError::MalformedShape { found: 1 })
        );
    }

    #[test]
    fn fallback_substitutes_unclassified_event() {
        let (event, error) = AnswerParser::parse_or_fallback("T, OnlyCompany", now());
        assert_eq!(error, Some(ParseError::MalformedShape { found: 2 }));
        assert_eq!(event.status, ApplicationStatus::Unknown);
        assert_eq!(event.employer, UNKNOWN_EMPLOYER);
        assert_eq!(event.role, UNKNOWN_ROLE);

        let (event, error) = AnswerParser::parse_or_fallback("[I, Acme, SRE]", now());
        assert!(error.is_none());
        assert_eq!(event.status, ApplicationStatus::Advancing);
    }
}
