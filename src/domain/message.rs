use std::collections::{BTreeSet, HashMap};

use crate::mail::api::GmailMessage;

pub type MessageId = String;

pub const UNREAD: &str = "UNREAD";
pub const INBOX: &str = "INBOX";

/// A message as the session sees it. Metadata fetches leave `raw` empty;
/// it is only filled by a `Raw` format fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: String,
    pub label_ids: BTreeSet<String>,
    pub headers: HashMap<String, String>,
    pub raw: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label_ids.insert(label.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header lookup is exact: names are kept as the API supplied them.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn is_unread(&self) -> bool {
        self.label_ids.contains(UNREAD)
    }

    pub fn remove_label(&mut self, label: &str) -> bool {
        self.label_ids.remove(label)
    }
}

impl From<GmailMessage> for Message {
    fn from(m: GmailMessage) -> Self {
        let headers = m
            .payload
            .and_then(|p| p.headers)
            .unwrap_or_default()
            .into_iter()
            .map(|h| (h.name, h.value))
            .collect();

        Self {
            id: m.id,
            thread_id: m.thread_id.unwrap_or_default(),
            label_ids: m.label_ids.unwrap_or_default().into_iter().collect(),
            headers,
            raw: m.raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Representation requested from `messages.get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Metadata,
    Raw,
}

impl MessageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageFormat::Metadata => "metadata",
            MessageFormat::Raw => "raw",
        }
    }
}
