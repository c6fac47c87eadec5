//! In-memory doubles for the transport and the display surface.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;

use crate::domain::message::MessageFormat;
use crate::mail::api::{
    ApiLabel, GmailMessage, Header, ListMessagesResponse, MessagePayload, MessageRef, Profile,
};
use crate::mail::error::{MailError, MailResult};
use crate::mail::transport::MailTransport;
use crate::terminal::cursor::Cursor;
use crate::terminal::surface::{DisplaySurface, Key, Region};

pub fn api_message(id: &str, labels: &[&str], subject: &str) -> GmailMessage {
    let header = |name: &str, value: &str| Header {
        name: name.to_string(),
        value: value.to_string(),
    };
    GmailMessage {
        id: id.to_string(),
        thread_id: Some(format!("t-{id}")),
        label_ids: Some(labels.iter().map(|l| l.to_string()).collect()),
        payload: Some(MessagePayload {
            headers: Some(vec![
                header("From", "John Doe <j@x.com>"),
                header("To", "me@example.com"),
                header("Date", "Fri, 5 Jan 2024 10:00:00 +0000"),
                header("Subject", subject),
            ]),
            mime_type: Some("text/plain".into()),
        }),
        raw: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Profile,
    Labels,
    List { labels: Vec<String>, max_results: u32 },
    Batch(Vec<String>),
    Get(String, MessageFormat),
    Modify { id: String, add: Vec<String>, remove: Vec<String> },
    Trash(String),
}

#[derive(Debug)]
pub struct FakeMailbox {
    /// Listing order.
    pub messages: Vec<GmailMessage>,
    pub raw: HashMap<String, String>,
    pub labels: Vec<ApiLabel>,
    /// Transient failures returned by `profile` before it succeeds.
    pub connect_failures: u32,
    pub fail_labels: bool,
    pub fail_list: bool,
    pub fail_batch: bool,
    pub fail_mutations: bool,
    pub calls: Vec<Call>,
}

impl Default for FakeMailbox {
    fn default() -> Self {
        let label = |id: &str, name: &str| ApiLabel {
            id: id.into(),
            name: name.into(),
        };
        Self {
            messages: vec![],
            raw: HashMap::new(),
            labels: vec![
                label("INBOX", "Inbox"),
                label("UNREAD", "Unread"),
                label("TRASH", "Trash"),
            ],
            connect_failures: 0,
            fail_labels: false,
            fail_list: false,
            fail_batch: false,
            fail_mutations: false,
            calls: vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeTransport(Rc<RefCell<FakeMailbox>>);

impl FakeTransport {
    pub fn new(mailbox: FakeMailbox) -> Self {
        Self(Rc::new(RefCell::new(mailbox)))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    pub fn has_label(&self, id: &str, label: &str) -> bool {
        self.0
            .borrow()
            .messages
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.label_ids.as_ref())
            .is_some_and(|l| l.iter().any(|x| x == label))
    }

    pub fn set_fail_mutations(&self, fail: bool) {
        self.0.borrow_mut().fail_mutations = fail;
    }

    fn record(&self, call: Call) {
        self.0.borrow_mut().calls.push(call);
    }
}

impl MailTransport for FakeTransport {
    fn profile(&self) -> MailResult<Profile> {
        self.record(Call::Profile);
        let mut mb = self.0.borrow_mut();
        if mb.connect_failures > 0 {
            mb.connect_failures -= 1;
            return Err(MailError::Connection("server not found".into()));
        }
        Ok(Profile {
            email_address: Some("me@example.com".into()),
            messages_total: Some(mb.messages.len() as u64),
        })
    }

    fn list_labels(&self) -> MailResult<Vec<ApiLabel>> {
        self.record(Call::Labels);
        let mb = self.0.borrow();
        if mb.fail_labels {
            return Err(MailError::api(500, "backend error"));
        }
        Ok(mb.labels.clone())
    }

    fn list_messages(
        &self,
        label_ids: &[String],
        max_results: u32,
        _page_token: Option<&str>,
    ) -> MailResult<ListMessagesResponse> {
        self.record(Call::List {
            labels: label_ids.to_vec(),
            max_results,
        });
        let mb = self.0.borrow();
        if mb.fail_list {
            return Err(MailError::api(500, "backend error"));
        }
        let matching: Vec<MessageRef> = mb
            .messages
            .iter()
            .filter(|m| {
                let labels = m.label_ids.clone().unwrap_or_default();
                label_ids.iter().all(|l| labels.contains(l))
            })
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: m.thread_id.clone(),
            })
            .collect();
        let more = matching.len() > max_results as usize;
        Ok(ListMessagesResponse {
            messages: Some(matching.into_iter().take(max_results as usize).collect()),
            next_page_token: more.then(|| "next".to_string()),
            result_size_estimate: None,
        })
    }

    fn batch_get(
        &self,
        ids: &[String],
        _format: MessageFormat,
    ) -> MailResult<Vec<(String, MailResult<GmailMessage>)>> {
        self.record(Call::Batch(ids.to_vec()));
        let mb = self.0.borrow();
        if mb.fail_batch {
            return Err(MailError::Connection("batch endpoint unreachable".into()));
        }
        // completion order differs from request order
        Ok(ids
            .iter()
            .rev()
            .map(|id| {
                let found = mb.messages.iter().find(|m| &m.id == id).cloned();
                (
                    id.clone(),
                    found.ok_or_else(|| MailError::api(404, "Requested entity was not found.")),
                )
            })
            .collect())
    }

    fn get_message(&self, id: &str, format: MessageFormat) -> MailResult<GmailMessage> {
        self.record(Call::Get(id.to_string(), format));
        let mb = self.0.borrow();
        let mut msg = mb
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| MailError::api(404, "Requested entity was not found."))?;
        if format == MessageFormat::Raw {
            msg.payload = None;
            msg.raw = mb.raw.get(id).cloned();
        }
        Ok(msg)
    }

    fn modify(&self, id: &str, add: &[String], remove: &[String]) -> MailResult<()> {
        self.record(Call::Modify {
            id: id.to_string(),
            add: add.to_vec(),
            remove: remove.to_vec(),
        });
        apply_labels(&mut self.0.borrow_mut(), id, add, remove)
    }

    fn trash(&self, id: &str) -> MailResult<()> {
        self.record(Call::Trash(id.to_string()));
        apply_labels(
            &mut self.0.borrow_mut(),
            id,
            &["TRASH".to_string()],
            &["INBOX".to_string()],
        )
    }
}

fn apply_labels(mb: &mut FakeMailbox, id: &str, add: &[String], remove: &[String]) -> MailResult<()> {
    if mb.fail_mutations {
        return Err(MailError::api(500, "backend error"));
    }
    let msg = mb
        .messages
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| MailError::api(404, "Requested entity was not found."))?;
    let labels = msg.label_ids.get_or_insert_with(Vec::new);
    labels.retain(|l| !remove.contains(l));
    for l in add {
        if !labels.contains(l) {
            labels.push(l.clone());
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct SurfaceState {
    pub header: String,
    pub main: Vec<String>,
    pub status: String,
    pub keys: VecDeque<Key>,
    pub cursor: Cursor,
    pub cursor_visible: bool,
    pub height: usize,
    pub width: usize,
    pub scroll: isize,
    pub interrupt_on_poll: bool,
    pub polls: usize,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct FakeSurface(Rc<RefCell<SurfaceState>>);

impl FakeSurface {
    pub fn new(height: usize, keys: impl IntoIterator<Item = Key>) -> Self {
        Self(Rc::new(RefCell::new(SurfaceState {
            header: String::new(),
            main: vec![String::new()],
            status: String::new(),
            keys: keys.into_iter().collect(),
            cursor: Cursor::new(1, 80),
            cursor_visible: false,
            height,
            width: 80,
            scroll: 0,
            interrupt_on_poll: false,
            polls: 0,
            closed: false,
        })))
    }

    pub fn state(&self) -> std::cell::Ref<'_, SurfaceState> {
        self.0.borrow()
    }

    pub fn push_keys(&self, keys: impl IntoIterator<Item = Key>) {
        self.0.borrow_mut().keys.extend(keys);
    }

    pub fn set_interrupt_on_poll(&self, on: bool) {
        self.0.borrow_mut().interrupt_on_poll = on;
    }

    /// Main region lines with the trailing empty line dropped.
    pub fn rows(&self) -> Vec<String> {
        let s = self.0.borrow();
        let mut rows = s.main.clone();
        if rows.last().is_some_and(String::is_empty) {
            rows.pop();
        }
        rows
    }

    pub fn main_text(&self) -> String {
        self.0.borrow().main.join("\n")
    }
}

impl DisplaySurface for FakeSurface {
    fn clear(&mut self, region: Region) -> Result<()> {
        let mut s = self.0.borrow_mut();
        match region {
            Region::Header => s.header.clear(),
            Region::Status => s.status.clear(),
            Region::Main => {
                s.main = vec![String::new()];
                s.cursor.reset();
                let w = s.width;
                s.cursor.resize(1, w);
            }
        }
        Ok(())
    }

    fn print(&mut self, region: Region, text: &str) -> Result<()> {
        let mut s = self.0.borrow_mut();
        match region {
            Region::Header => s.header.push_str(text),
            Region::Status => s.status.push_str(text),
            Region::Main => {
                for (i, piece) in text.split('\n').enumerate() {
                    if i > 0 {
                        s.main.push(String::new());
                    }
                    if let Some(last) = s.main.last_mut() {
                        last.push_str(piece);
                    }
                }
                let (rows, w) = (s.main.len(), s.width);
                s.cursor.resize(rows, w);
            }
        }
        Ok(())
    }

    fn read_key(&mut self) -> Result<Key> {
        Ok(self.0.borrow_mut().keys.pop_front().unwrap_or(Key::Interrupt))
    }

    fn poll_interrupt(&mut self, _timeout: Duration) -> Result<bool> {
        let mut s = self.0.borrow_mut();
        s.polls += 1;
        Ok(s.interrupt_on_poll)
    }

    fn viewport_height(&self) -> usize {
        self.0.borrow().height
    }

    fn cursor(&self) -> (usize, usize) {
        self.0.borrow().cursor.position()
    }

    fn move_cursor_to(&mut self, row: usize, col: usize) -> Result<bool> {
        Ok(self.0.borrow_mut().cursor.move_to(row, col))
    }

    fn move_cursor_by(&mut self, delta: isize) -> Result<bool> {
        Ok(self.0.borrow_mut().cursor.move_by(delta))
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.0.borrow_mut().cursor_visible = visible;
        Ok(())
    }

    fn mark(&mut self, row: usize, col: usize, glyph: char) -> Result<()> {
        let mut s = self.0.borrow_mut();
        if let Some(line) = s.main.get_mut(row) {
            let mut chars: Vec<char> = line.chars().collect();
            if chars.len() <= col {
                chars.resize(col + 1, ' ');
            }
            chars[col] = glyph;
            *line = chars.into_iter().collect();
        }
        Ok(())
    }

    fn scroll(&mut self, delta: isize) -> Result<()> {
        self.0.borrow_mut().scroll += delta;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.0.borrow_mut().closed = true;
        Ok(())
    }
}
