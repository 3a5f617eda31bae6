pub mod gmail;
pub mod mailbox;
pub mod openai;
pub mod oracle;

pub use gmail::{GmailConnector, GmailMailbox, GmailSession};
pub use mailbox::{Mailbox, MailboxError, MailboxQuery};
pub use openai::OpenAiOracle;
pub use oracle::{classification_prompt, ClassificationOracle, OracleError, SYSTEM_INSTRUCTION};
