use std::collections::HashMap;

use log::{debug, error, info, warn};

use crate::domain::message::{Label, Message, MessageFormat, MessageId};
use crate::mail::batch::MAX_BATCH_SIZE;
use crate::mail::error::{MailError, MailResult};
use crate::mail::transport::MailTransport;

/// Result of a batched detail fetch, with every id accounted for.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub messages: Vec<Message>,
    pub failed: Vec<(MessageId, MailError)>,
}

impl BatchOutcome {
    /// Successful messages only; failures are logged and dropped.
    pub fn into_messages(self) -> Vec<Message> {
        for (id, e) in &self.failed {
            debug!("dropping message {id} from batch result: {e}");
        }
        self.messages
    }
}

/// Remote mailbox access: listing, batched fetch, raw fetch and label
/// mutation. Owns the transport and the label-name cache.
pub struct MailStore {
    transport: Box<dyn MailTransport>,
    labels: HashMap<String, Label>,
    connected: bool,
    max_connect_attempts: Option<u32>,
}

impl MailStore {
    pub fn new(transport: Box<dyn MailTransport>) -> Self {
        Self {
            transport,
            labels: HashMap::new(),
            connected: false,
            max_connect_attempts: None,
        }
    }

    pub fn with_max_connect_attempts(mut self, max: Option<u32>) -> Self {
        self.max_connect_attempts = max;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Establish the session, retrying transient failures.
    ///
    /// `on_retry` is called after each failed attempt with the attempt number;
    /// it shows status and waits, returning `false` if the user interrupted.
    /// The label list is fetched once connected; failing that leaves the
    /// cache empty but still connects.
    pub fn connect(&mut self, on_retry: &mut dyn FnMut(u32, &MailError) -> bool) -> MailResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.profile() {
                Ok(profile) => {
                    info!(
                        "connected as {} after {attempt} attempt(s)",
                        profile.email_address.as_deref().unwrap_or("<unknown>")
                    );
                    break;
                }
                Err(e) if e.is_transient() => {
                    warn!("connect attempt {attempt} failed: {e}");
                    if self.max_connect_attempts.is_some_and(|max| attempt >= max) {
                        return Err(e);
                    }
                    if !on_retry(attempt, &e) {
                        return Err(MailError::Interrupted);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        self.labels = match self.transport.list_labels() {
            Ok(labels) => labels
                .into_iter()
                .map(|l| (l.id.clone(), Label { id: l.id, name: l.name }))
                .collect(),
            Err(e) => {
                warn!("could not fetch labels: {e}");
                HashMap::new()
            }
        };
        self.connected = true;
        Ok(())
    }

    pub fn label_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.labels.get(id).map(|l| l.name.as_str()).unwrap_or(id)
    }

    /// First page of messages carrying all of `label_filter`, as metadata
    /// stubs in server listing order. API failures yield an empty listing.
    pub fn list_messages(&self, max_results: u32, label_filter: &[String]) -> Vec<Message> {
        let max = max_results.clamp(1, MAX_BATCH_SIZE as u32);
        let listing = match self.transport.list_messages(label_filter, max, None) {
            Ok(l) => l,
            Err(e) => {
                error!("listing messages failed: {e}");
                return vec![];
            }
        };
        if listing.next_page_token.is_some() {
            debug!("listing has further pages; only the first is used");
        }

        let ids: Vec<MessageId> = listing
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.id)
            .collect();

        let mut by_id: HashMap<MessageId, Message> = self
            .fetch_details(&ids, MessageFormat::Metadata)
            .into_messages()
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        ids.iter().filter_map(|id| by_id.remove(id)).collect()
    }

    /// Fetch `ids` in one batch call (one per `MAX_BATCH_SIZE` ids).
    /// Messages come back in completion order; match them by id.
    pub fn fetch_details(&self, ids: &[MessageId], format: MessageFormat) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for chunk in ids.chunks(MAX_BATCH_SIZE) {
            match self.transport.batch_get(chunk, format) {
                Ok(results) => {
                    for (id, result) in results {
                        match result {
                            Ok(m) => outcome.messages.push(Message::from(m)),
                            Err(e) => outcome.failed.push((id, e)),
                        }
                    }
                }
                Err(e) => {
                    error!("batch fetch of {} message(s) failed: {e}", chunk.len());
                    let reason = e.to_string();
                    outcome.failed.extend(
                        chunk
                            .iter()
                            .map(|id| (id.clone(), MailError::Batch(reason.clone()))),
                    );
                }
            }
        }
        outcome
    }

    /// Base64url-encoded RFC 822 document for one message.
    pub fn fetch_raw(&self, id: &str) -> MailResult<String> {
        self.transport
            .get_message(id, MessageFormat::Raw)?
            .raw
            .ok_or_else(|| MailError::Decode(format!("message {id} has no raw content")))
    }

    /// Apply label changes remotely. Failures are logged; returns whether it succeeded.
    pub fn mutate_labels(&self, id: &str, add: &[String], remove: &[String]) -> bool {
        match self.transport.modify(id, add, remove) {
            Ok(()) => true,
            Err(e) => {
                error!("modify labels on {id} failed: {e}");
                false
            }
        }
    }

    /// Move a message to trash. Failures are logged; returns whether it succeeded.
    pub fn trash(&self, id: &str) -> bool {
        match self.transport.trash(id) {
            Ok(()) => true,
            Err(e) => {
                error!("trash {id} failed: {e}");
                false
            }
        }
    }
}
