use crate::terminal::surface::Key;

/// What a key means in the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Next,
    Previous,
    Trash,
    Refresh,
    Reconnect,
    Back,
    ScrollDown,
    ScrollUp,
    Quit,
}

impl Action {
    /// Actions still honoured while the store is not connected.
    pub fn allowed_offline(self) -> bool {
        matches!(self, Action::Reconnect | Action::Quit)
    }
}

pub fn home_action(key: Key) -> Option<Action> {
    match key {
        Key::Enter => Some(Action::Select),
        Key::Down | Key::Char('j') => Some(Action::Next),
        Key::Up | Key::Char('k') => Some(Action::Previous),
        Key::Char('d') => Some(Action::Trash),
        Key::Backspace | Key::Char('r') => Some(Action::Refresh),
        Key::Char('R') => Some(Action::Reconnect),
        Key::Char('q') | Key::Interrupt => Some(Action::Quit),
        _ => None,
    }
}

pub fn message_action(key: Key) -> Option<Action> {
    match key {
        Key::Backspace => Some(Action::Back),
        Key::Down | Key::Char('j') => Some(Action::ScrollDown),
        Key::Up | Key::Char('k') => Some(Action::ScrollUp),
        Key::Char('q') | Key::Interrupt => Some(Action::Quit),
        _ => None,
    }
}

pub const HOME_HINT: &str = "enter open  j/k move  d trash  r refresh  R reconnect  q quit";
pub const MESSAGE_HINT: &str = "backspace back  j/k scroll  q quit";
