use chrono::{DateTime, Local, Utc};
use google_gmail1::api::{Message, MessagePart, Scope};
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use tokio::runtime::Runtime;
use tracing::debug;

use super::mailbox::{Mailbox, MailboxError, MailboxQuery};
use crate::config::MailboxConfig;
use crate::tracking::{MessageRef, RawMessage};

/// HTTPS connector used by the default authenticated session.
pub type GmailConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Authenticated Gmail access for one mailbox user.
///
/// Created by the caller and handed to [`GmailMailbox::new`]; nothing about
/// the session is cached in process-wide state.
pub struct GmailSession<C>
where
    C: google_gmail1::common::Connector + Send + Sync + 'static,
{
    hub: Gmail<C>,
    user_id: String,
}

impl<C> GmailSession<C>
where
    C: google_gmail1::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Gmail<C>, user_id: impl Into<String>) -> Self {
        Self {
            hub,
            user_id: user_id.into(),
        }
    }
}

impl GmailSession<GmailConnector> {
    /// Runs the installed-application OAuth flow, reusing tokens cached at
    /// `token_cache_path` when they are still valid.
    pub fn authenticate(runtime: &Runtime, config: &MailboxConfig) -> Result<Self, MailboxError> {
        let hub = runtime.block_on(async {
            let secret = yup_oauth2::read_application_secret(&config.client_secret_path)
                .await
                .map_err(|err| {
                    MailboxError::Authentication(format!(
                        "cannot read client secret {}: {err}",
                        config.client_secret_path.display()
                    ))
                })?;

            let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
                secret,
                yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
            )
            .persist_tokens_to_disk(config.token_cache_path.clone())
            .build()
            .await
            .map_err(|err| MailboxError::Authentication(err.to_string()))?;

            let connector = hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|err| MailboxError::Authentication(err.to_string()))?
                .https_or_http()
                .enable_http1()
                .build();
            let client =
                hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                    .build(connector);

            Ok::<_, MailboxError>(Gmail::new(client, auth))
        })?;

        Ok(Self::new(hub, config.user_id.clone()))
    }
}

/// Gmail-backed [`Mailbox`] exposing a synchronous interface.
pub struct GmailMailbox<C>
where
    C: google_gmail1::common::Connector + Send + Sync + 'static,
{
    session: GmailSession<C>,
    runtime: Runtime,
}

impl<C> GmailMailbox<C>
where
    C: google_gmail1::common::Connector + Send + Sync + 'static,
{
    pub fn new(session: GmailSession<C>, runtime: Runtime) -> Self {
        Self { session, runtime }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> MailboxError {
        MailboxError::Backend(err.to_string())
    }

    async fn list_all(&self, search: &str) -> Result<Vec<MessageRef>, MailboxError> {
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut call = self
                .session
                .hub
                .users()
                .messages_list(&self.session.user_id)
                .q(search)
                .add_scope(Scope::Readonly);
            if let Some(token) = page_token.as_deref() {
                call = call.page_token(token);
            }

            let (_, page) = call.doit().await.map_err(Self::map_error)?;
            refs.extend(
                page.messages
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|message| message.id)
                    .map(MessageRef),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(refs)
    }
}

impl<C> std::fmt::Debug for GmailMailbox<C>
where
    C: google_gmail1::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailMailbox")
            .field("user_id", &self.session.user_id)
            .finish_non_exhaustive()
    }
}

impl<C> Mailbox for GmailMailbox<C>
where
    C: google_gmail1::common::Connector + Send + Sync + 'static,
{
    fn list_candidates(&self, query: &MailboxQuery) -> Result<Vec<MessageRef>, MailboxError> {
        let search = query.search_expression(Local::now().date_naive());
        debug!(%search, "listing candidate messages");
        self.runtime.block_on(self.list_all(&search))
    }

    fn fetch_message(&self, message: &MessageRef) -> Result<RawMessage, MailboxError> {
        let result = self.runtime.block_on(async {
            self.session
                .hub
                .users()
                .messages_get(&self.session.user_id, &message.0)
                .format("full")
                .add_scope(Scope::Readonly)
                .doit()
                .await
        });

        let (_, fetched) = result.map_err(Self::map_error)?;
        Ok(raw_message_from(message.clone(), fetched))
    }
}

pub(crate) fn raw_message_from(message_id: MessageRef, message: Message) -> RawMessage {
    let payload = message.payload.unwrap_or_default();
    let subject = header_value(&payload, "Subject").unwrap_or_default();
    let body = plain_text_body(&payload).unwrap_or_default();
    let received_at = message
        .internal_date
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    RawMessage {
        message_id,
        subject,
        body,
        received_at,
    }
}

fn header_value(part: &MessagePart, name: &str) -> Option<String> {
    part.headers
        .iter()
        .flatten()
        .find(|header| {
            header
                .name
                .as_deref()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
        })
        .and_then(|header| header.value.clone())
}

/// First `text/plain` part, depth first.
fn plain_text_body(part: &MessagePart) -> Option<String> {
    let is_plain = part
        .mime_type
        .as_deref()
        .is_some_and(|mime| mime.eq_ignore_ascii_case("text/plain"));

    if is_plain {
        if let Some(data) = part.body.as_ref().and_then(|body| body.data.as_ref()) {
            return Some(String::from_utf8_lossy(data).into_owned());
        }
    }

    part.parts.iter().flatten().find_map(plain_text_body)
}
