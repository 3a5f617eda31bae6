use std::fmt::Debug;

/// Instruction sent alongside every classification prompt.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant. Classify the email and extract details.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle rejected credentials")]
    Authentication,
    #[error("oracle rate limit exceeded")]
    RateLimited,
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle rejected request: {0}")]
    Rejected(String),
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle returned an unusable response: {0}")]
    InvalidResponse(String),
    #[error("oracle runtime unavailable: {0}")]
    Runtime(String),
}

/// Text classification capability used by the reconciliation engine.
pub trait ClassificationOracle: Debug {
    fn classify(&self, prompt: &str) -> Result<String, OracleError>;
}

impl<T: ClassificationOracle + ?Sized> ClassificationOracle for Box<T> {
    fn classify(&self, prompt: &str) -> Result<String, OracleError> {
        (**self).classify(prompt)
    }
}

/// Builds the user prompt embedding the e-mail body.
pub fn classification_prompt(body: &str) -> String {
    format!(
        "Given the following email body:\n\n\
{body}\n\n\
- Classify the email into one of these categories: 'T' for received, 'F' for rejected, \
'I' for moving on to the next phase, or 'None' if none apply.\n\
- Identify the company mentioned in the email.\n\
- Identify the role being applied for.\n\n\
Return the output as a list in the format: [status, company, role]."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_body_and_answer_shape() {
        let prompt = classification_prompt("Thanks for applying to Acme.");
        assert!(prompt.contains("Thanks for applying to Acme."));
        assert!(prompt.contains("[status, company, role]"));
        assert!(prompt.contains("'None' if none apply"));
    }

    #[test]
    fn prompt_accepts_empty_body() {
        let prompt = classification_prompt("");
        assert!(prompt.starts_with("Given the following email body:"));
    }
}
