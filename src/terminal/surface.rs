use std::time::Duration;

use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// One-line menu bar at the top.
    Header,
    /// Scrollable content between header and status.
    Main,
    /// One-line info bar at the bottom.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
    Char(char),
    /// Ctrl-C, or SIGINT while the terminal is not in raw mode.
    Interrupt,
}

/// Everything the session needs from a terminal. Implementations own only
/// rendering state; they never hold messages.
pub trait DisplaySurface {
    fn clear(&mut self, region: Region) -> Result<()>;

    /// Append `text` to the region; `\n` starts a new line.
    fn print(&mut self, region: Region, text: &str) -> Result<()>;

    /// Block until exactly one key is available.
    fn read_key(&mut self) -> Result<Key>;

    /// Wait up to `timeout`, returning `true` as soon as an interrupt arrives.
    fn poll_interrupt(&mut self, timeout: Duration) -> Result<bool>;

    /// Visible rows of the main region.
    fn viewport_height(&self) -> usize;

    /// `(row, col)` of the cursor inside the main region.
    fn cursor(&self) -> (usize, usize);

    /// Returns `false` and leaves the cursor alone when the target is outside the region.
    fn move_cursor_to(&mut self, row: usize, col: usize) -> Result<bool>;

    fn move_cursor_by(&mut self, delta: isize) -> Result<bool>;

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()>;

    /// Overwrite the character at `(row, col)` in the main region.
    fn mark(&mut self, row: usize, col: usize, glyph: char) -> Result<()>;

    /// Scroll the main region without moving the cursor.
    fn scroll(&mut self, delta: isize) -> Result<()>;

    /// Restore the terminal. Safe to call more than once.
    fn close(&mut self) -> Result<()>;
}
