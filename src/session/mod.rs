pub mod actions;
pub mod rows;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use crate::domain::message::{INBOX, Message, MessageId, UNREAD};
use crate::logging::DebugSink;
use crate::mail::body;
use crate::mail::error::MailError;
use crate::mail::store::MailStore;
use crate::mail::transport::MailTransport;
use crate::terminal::surface::{DisplaySurface, Key, Region};

use actions::{Action, HOME_HINT, MESSAGE_HINT, home_action, message_action};

/// Produces a freshly authorized transport; called on every bootstrap.
pub trait Authorizer {
    fn authorize(&mut self) -> Result<Box<dyn MailTransport>>;
}

impl<F> Authorizer for F
where
    F: FnMut() -> Result<Box<dyn MailTransport>>,
{
    fn authorize(&mut self) -> Result<Box<dyn MailTransport>> {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Listing filter.
    pub labels: Vec<String>,
    pub retry_interval: Duration,
    pub max_connect_attempts: Option<u32>,
    pub debug: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            labels: vec![INBOX.to_string()],
            retry_interval: Duration::from_secs(5),
            max_connect_attempts: None,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Message { id: MessageId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Key-driven controller tying the mail store to the display surface.
pub struct Session {
    surface: Box<dyn DisplaySurface>,
    authorizer: Box<dyn Authorizer>,
    settings: SessionSettings,
    store: Option<MailStore>,
    view: View,
    messages: Vec<Message>,
    cursor: usize,
    trashed: HashSet<MessageId>,
    debug: DebugSink,
}

impl Session {
    pub fn new(
        surface: Box<dyn DisplaySurface>,
        authorizer: Box<dyn Authorizer>,
        settings: SessionSettings,
    ) -> Self {
        let debug = DebugSink::new(settings.debug);
        Self {
            surface,
            authorizer,
            settings,
            store: None,
            view: View::Home,
            messages: vec![],
            cursor: 0,
            trashed: HashSet::new(),
            debug,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_connected(&self) -> bool {
        self.store.as_ref().is_some_and(MailStore::is_connected)
    }

    /// Authorize, connect, list and draw the Home view.
    ///
    /// Authorization or connection failures leave the session disconnected
    /// (only reconnect and quit respond); an interrupt while retrying is
    /// returned as `MailError::Interrupted`.
    pub fn bootstrap(&mut self) -> Result<()> {
        self.draw_header()?;
        self.surface.clear(Region::Main)?;
        self.surface.print(Region::Main, "Connecting...\n")?;

        let transport = match self.authorizer.authorize() {
            Ok(t) => t,
            Err(e) => {
                error!("authorization failed: {e:#}");
                return self.status(&format!("Authorization failed: {e:#}. Press R to retry."));
            }
        };

        let mut store =
            MailStore::new(transport).with_max_connect_attempts(self.settings.max_connect_attempts);
        let interval = self.settings.retry_interval;
        let surface = &mut self.surface;
        let connected = store.connect(&mut |attempt, _err| {
            let shown = surface.print(
                Region::Main,
                &format!("Server not found! Retrying... (attempt {attempt})\n"),
            );
            shown.is_ok() && !surface.poll_interrupt(interval).unwrap_or(true)
        });
        self.store = Some(store);

        match connected {
            Ok(()) => {}
            Err(MailError::Interrupted) => return Err(MailError::Interrupted.into()),
            Err(e) => {
                error!("could not connect: {e}");
                return self.status(&format!("Could not connect: {e}. Press R to retry."));
            }
        }

        self.refresh()
    }

    /// Drop the store and all cached state, then bootstrap again.
    pub fn reset_session(&mut self) -> Result<()> {
        info!("resetting session");
        self.store = None;
        self.messages.clear();
        self.trashed.clear();
        self.cursor = 0;
        self.view = View::Home;
        self.surface.clear(Region::Status)?;
        self.bootstrap()
    }

    /// Read and dispatch keys until quit or interrupt.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let key = self.surface.read_key()?;
            if self.handle_key(key)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.surface.close()
    }

    pub fn handle_key(&mut self, key: Key) -> Result<Flow> {
        let action = match self.view {
            View::Home => home_action(key),
            View::Message { .. } => message_action(key),
        };
        let Some(action) = action else {
            self.debug(&format!("{key:?} unbound"))?;
            return Ok(Flow::Continue);
        };
        self.debug(&format!("{key:?} -> {action:?}"))?;

        if !self.is_connected() && !action.allowed_offline() {
            return Ok(Flow::Continue);
        }

        match action {
            Action::Quit => return Ok(Flow::Quit),
            Action::Select => self.open_selected()?,
            Action::Next => self.navigate(1)?,
            Action::Previous => self.navigate(-1)?,
            Action::Trash => self.trash_current()?,
            Action::Refresh => self.refresh()?,
            Action::Reconnect => self.reset_session()?,
            Action::Back => self.back()?,
            Action::ScrollDown => self.surface.scroll(1)?,
            Action::ScrollUp => self.surface.scroll(-1)?,
        }
        Ok(Flow::Continue)
    }

    fn navigate(&mut self, delta: isize) -> Result<()> {
        let Some(target) = self
            .cursor
            .checked_add_signed(delta)
            .filter(|t| *t < self.messages.len())
        else {
            return Ok(());
        };
        if self.surface.move_cursor_by(delta)? {
            self.cursor = target;
        }
        Ok(())
    }

    /// Re-list with the viewport height as the page size and redraw from the top.
    fn refresh(&mut self) -> Result<()> {
        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };
        let max = self.surface.viewport_height().max(1) as u32;
        self.messages = store.list_messages(max, &self.settings.labels);
        self.trashed.clear();
        self.cursor = 0;
        self.render_home()?;
        let n = self.messages.len();
        self.status(&format!("{n} message(s)"))
    }

    fn open_selected(&mut self) -> Result<()> {
        let (Some(store), Some(msg)) = (self.store.as_ref(), self.messages.get_mut(self.cursor))
        else {
            return Ok(());
        };
        let id = msg.id.clone();

        // local state drops UNREAD even if the server refused
        let confirmed = store.mutate_labels(&id, &[], &[UNREAD.to_string()]);
        msg.remove_label(UNREAD);

        let fetched = match msg.raw.take() {
            Some(raw) => Ok(raw),
            None => store.fetch_raw(&id),
        };
        let rendered = fetched.and_then(|raw| {
            let out = body::render_raw(&raw);
            msg.raw = Some(raw);
            out
        });
        let header = body::header_block(msg);

        self.view = View::Message { id: id.clone() };
        self.draw_header()?;
        self.surface.set_cursor_visible(false)?;
        self.surface.clear(Region::Main)?;
        self.surface.print(Region::Main, &header)?;

        match rendered {
            Ok(text) => {
                self.surface.print(Region::Main, &text)?;
                if confirmed {
                    self.surface.clear(Region::Status)
                } else {
                    self.status("Could not mark message as read on the server")
                }
            }
            Err(e) => {
                error!("could not display {id}: {e}");
                self.surface
                    .print(Region::Main, &format!("\t<message could not be displayed: {e}>\n"))?;
                self.status(&format!("Error: {e}"))
            }
        }
    }

    fn back(&mut self) -> Result<()> {
        self.view = View::Home;
        self.render_home()
    }

    fn trash_current(&mut self) -> Result<()> {
        let (Some(store), Some(msg)) = (self.store.as_ref(), self.messages.get(self.cursor)) else {
            return Ok(());
        };
        let id = msg.id.clone();
        if !store.trash(&id) {
            return self.status("Could not move message to trash");
        }
        self.trashed.insert(id);
        self.surface
            .mark(self.cursor, rows::MARKER_COL, rows::TRASH_MARKER)?;
        self.status("Moved to trash")
    }

    fn render_home(&mut self) -> Result<()> {
        self.draw_header()?;
        self.surface.clear(Region::Main)?;
        for (i, msg) in self.messages.iter().enumerate() {
            let trashed = self.trashed.contains(&msg.id);
            let row = rows::format_row(i, msg, trashed).unwrap_or_else(|e| {
                warn!("row {} ({}): {e}", i + 1, msg.id);
                rows::placeholder_row(i, msg, trashed)
            });
            self.surface.print(Region::Main, &row)?;
        }
        self.cursor = self.cursor.min(self.messages.len().saturating_sub(1));
        self.surface.move_cursor_to(self.cursor, 0)?;
        self.surface.set_cursor_visible(!self.messages.is_empty())
    }

    fn draw_header(&mut self) -> Result<()> {
        let hint = match self.view {
            View::Home => HOME_HINT,
            View::Message { .. } => MESSAGE_HINT,
        };
        let mailbox = match self.store.as_ref() {
            Some(store) => self
                .settings
                .labels
                .iter()
                .map(|l| store.label_name(l).to_string())
                .collect::<Vec<_>>()
                .join(", "),
            None => self.settings.labels.join(", "),
        };
        self.surface.clear(Region::Header)?;
        self.surface
            .print(Region::Header, &format!(" tegmail | {mailbox} | {hint}"))
    }

    fn status(&mut self, text: &str) -> Result<()> {
        self.surface.clear(Region::Status)?;
        self.surface.print(Region::Status, text)
    }

    fn debug(&mut self, text: &str) -> Result<()> {
        self.debug.write(self.surface.as_mut(), text)
    }
}
