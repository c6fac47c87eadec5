use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::terminal::surface::Key;

/// Translate one terminal event. Returns `None` for events the session never
/// sees (releases, resizes, mouse, lock and media keys). Every other key is
/// passed on and the session decides whether it is bound.
pub fn map_event(event: &Event) -> Option<Key> {
    match event {
        Event::Key(key) => map_key(key),
        _ => None,
    }
}

pub fn map_key(key: &KeyEvent) -> Option<Key> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Interrupt),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Home => Some(Key::Home),
        KeyCode::End => Some(Key::End),
        KeyCode::PageUp => Some(Key::PageUp),
        KeyCode::PageDown => Some(Key::PageDown),
        KeyCode::Insert => Some(Key::Insert),
        KeyCode::Delete => Some(Key::Delete),
        KeyCode::F(n) => Some(Key::F(n)),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Esc => Some(Key::Char('\u{1b}')),
        KeyCode::Tab | KeyCode::BackTab => Some(Key::Char('\t')),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn maps_control_keys_to_names() {
        assert_eq!(map_event(&press(KeyCode::Enter, KeyModifiers::NONE)), Some(Key::Enter));
        assert_eq!(
            map_event(&press(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(Key::Backspace)
        );
        assert_eq!(map_event(&press(KeyCode::Down, KeyModifiers::NONE)), Some(Key::Down));
        assert_eq!(map_event(&press(KeyCode::Left, KeyModifiers::NONE)), Some(Key::Left));
    }

    #[test]
    fn passes_characters_through() {
        assert_eq!(map_event(&press(KeyCode::Char('j'), KeyModifiers::NONE)), Some(Key::Char('j')));
        assert_eq!(map_event(&press(KeyCode::Char('R'), KeyModifiers::SHIFT)), Some(Key::Char('R')));
        assert_eq!(map_event(&press(KeyCode::Esc, KeyModifiers::NONE)), Some(Key::Char('\u{1b}')));
    }

    #[test]
    fn ctrl_c_is_interrupt() {
        assert_eq!(
            map_event(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Key::Interrupt)
        );
    }

    #[test]
    fn ignores_releases_and_other_events() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('j'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(map_event(&release), None);
        assert_eq!(map_event(&Event::Resize(80, 24)), None);
        assert_eq!(map_event(&press(KeyCode::CapsLock, KeyModifiers::NONE)), None);
    }

    #[test]
    fn editing_and_function_keys_reach_the_session() {
        let none = KeyModifiers::NONE;
        assert_eq!(map_event(&press(KeyCode::Delete, none)), Some(Key::Delete));
        assert_eq!(map_event(&press(KeyCode::PageDown, none)), Some(Key::PageDown));
        assert_eq!(map_event(&press(KeyCode::Home, none)), Some(Key::Home));
        assert_eq!(map_event(&press(KeyCode::End, none)), Some(Key::End));
        assert_eq!(map_event(&press(KeyCode::F(5), none)), Some(Key::F(5)));
    }
}
