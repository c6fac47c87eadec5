use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::terminal::cursor::Cursor;
use crate::terminal::interrupt::Interrupt;
use crate::terminal::keys;
use crate::terminal::surface::{DisplaySurface, Key, Region};

const TAB_WIDTH: usize = 8;

/// ratatui/crossterm implementation of the three-region surface.
pub struct TuiSurface {
    terminal: Option<DefaultTerminal>,
    width: usize,
    height: usize,
    header: String,
    main: Vec<String>,
    status: String,
    cursor: Cursor,
    cursor_visible: bool,
    scroll: usize,
    interrupt: Interrupt,
}

impl TuiSurface {
    pub fn open(interrupt: Interrupt) -> Result<Self> {
        let terminal = ratatui::init();
        let size = terminal.size()?;
        let mut surface = Self {
            terminal: Some(terminal),
            width: size.width as usize,
            height: size.height as usize,
            header: String::new(),
            main: vec![String::new()],
            status: String::new(),
            cursor: Cursor::new(1, size.width as usize),
            cursor_visible: false,
            scroll: 0,
            interrupt,
        };
        surface.draw()?;
        Ok(surface)
    }

    fn main_rows(&self) -> usize {
        self.height.saturating_sub(2).max(1)
    }

    fn sync_cursor_bounds(&mut self) {
        self.cursor.resize(self.main.len(), self.width);
    }

    /// The message view wraps; the listing keeps one buffer line per row so
    /// the cursor row maps straight onto the screen.
    fn display(&self) -> Vec<String> {
        display_rows(&self.main, self.width, !self.cursor_visible)
    }

    fn max_scroll(&self) -> usize {
        self.display().len().saturating_sub(self.main_rows())
    }

    fn draw(&mut self) -> Result<()> {
        let rows = self.main_rows();
        if self.cursor_visible {
            let (row, _) = self.cursor.position();
            if row < self.scroll {
                self.scroll = row;
            } else if row >= self.scroll + rows {
                self.scroll = row + 1 - rows;
            }
        }

        let rows_shown = self.display();
        self.scroll = self.scroll.min(rows_shown.len().saturating_sub(rows));

        let Self {
            terminal,
            width,
            header,
            status,
            cursor,
            cursor_visible,
            scroll,
            ..
        } = self;
        let Some(terminal) = terminal.as_mut() else {
            return Ok(());
        };

        let view = View {
            header,
            main: &rows_shown[(*scroll).min(rows_shown.len())..],
            status,
            cursor: cursor_visible.then(|| {
                let (row, col) = cursor.position();
                (row.saturating_sub(*scroll), col)
            }),
            width: *width,
        };
        terminal.draw(|f| render(f, &view))?;
        Ok(())
    }

    fn handle_resize(&mut self, width: u16, height: u16) -> Result<()> {
        self.width = width as usize;
        self.height = height as usize;
        self.sync_cursor_bounds();
        self.scroll = self.scroll.min(self.max_scroll());
        self.draw()
    }

    fn next_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>> {
        if let Some(t) = timeout
            && !event::poll(t)?
        {
            return Ok(None);
        }
        let ev = event::read()?;
        if let Event::Resize(w, h) = ev {
            self.handle_resize(w, h)?;
            return Ok(None);
        }
        let key = keys::map_event(&ev);
        if key == Some(Key::Interrupt) {
            self.interrupt.trigger();
        }
        Ok(key)
    }
}

impl DisplaySurface for TuiSurface {
    fn clear(&mut self, region: Region) -> Result<()> {
        match region {
            Region::Header => self.header.clear(),
            Region::Status => self.status.clear(),
            Region::Main => {
                self.main = vec![String::new()];
                self.scroll = 0;
                self.cursor.reset();
                self.sync_cursor_bounds();
            }
        }
        self.draw()
    }

    fn print(&mut self, region: Region, text: &str) -> Result<()> {
        match region {
            // single-line regions keep only the first line
            Region::Header => self.header.push_str(text.lines().next().unwrap_or("")),
            Region::Status => self.status.push_str(text.lines().next().unwrap_or("")),
            Region::Main => {
                for (i, piece) in text.split('\n').enumerate() {
                    if i > 0 {
                        self.main.push(String::new());
                    }
                    if let Some(last) = self.main.last_mut() {
                        last.push_str(piece);
                    }
                }
                self.sync_cursor_bounds();
            }
        }
        self.draw()
    }

    fn read_key(&mut self) -> Result<Key> {
        loop {
            if self.interrupt.is_set() {
                return Ok(Key::Interrupt);
            }
            if let Some(key) = self.next_key(None)? {
                return Ok(key);
            }
        }
    }

    fn poll_interrupt(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.interrupt.is_set() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            // other keys typed while waiting are dropped
            if self.next_key(Some(deadline - now))? == Some(Key::Interrupt) {
                return Ok(true);
            }
        }
    }

    fn viewport_height(&self) -> usize {
        self.main_rows()
    }

    fn cursor(&self) -> (usize, usize) {
        self.cursor.position()
    }

    fn move_cursor_to(&mut self, row: usize, col: usize) -> Result<bool> {
        let moved = self.cursor.move_to(row, col);
        if moved {
            self.draw()?;
        }
        Ok(moved)
    }

    fn move_cursor_by(&mut self, delta: isize) -> Result<bool> {
        let moved = self.cursor.move_by(delta);
        if moved {
            self.draw()?;
        }
        Ok(moved)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> Result<()> {
        self.cursor_visible = visible;
        self.draw()
    }

    fn mark(&mut self, row: usize, col: usize, glyph: char) -> Result<()> {
        if let Some(line) = self.main.get_mut(row) {
            *line = overwrite_char(line, col, glyph);
            self.draw()?;
        }
        Ok(())
    }

    fn scroll(&mut self, delta: isize) -> Result<()> {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
        self.draw()
    }

    fn close(&mut self) -> Result<()> {
        if self.terminal.take().is_some() {
            ratatui::restore();
        }
        Ok(())
    }
}

impl Drop for TuiSurface {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct View<'a> {
    header: &'a str,
    main: &'a [String],
    status: &'a str,
    cursor: Option<(usize, usize)>,
    width: usize,
}

fn render(f: &mut Frame, view: &View) {
    let [top, body, bottom] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(f.area());

    f.render_widget(
        Paragraph::new(view.header).style(Style::default().add_modifier(Modifier::BOLD)),
        top,
    );

    let lines: Vec<Line> = view
        .main
        .iter()
        .take(body.height as usize)
        .enumerate()
        .map(|(i, raw)| match view.cursor {
            Some((row, col)) if row == i => highlighted(raw, col, view.width),
            _ => Line::raw(raw.as_str()),
        })
        .collect();
    f.render_widget(Paragraph::new(lines), body);

    f.render_widget(
        Paragraph::new(view.status).style(Style::default().fg(Color::Yellow)),
        bottom,
    );
}

/// Reverse video from `col` to the right edge.
fn highlighted(text: &str, col: usize, width: usize) -> Line<'static> {
    let split = text
        .char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (head, tail) = text.split_at(split);
    let pad = width.saturating_sub(text.chars().count());
    Line::from(vec![
        Span::raw(head.to_string()),
        Span::styled(
            format!("{tail}{}", " ".repeat(pad)),
            Style::default().add_modifier(Modifier::REVERSED),
        ),
    ])
}

/// Screen rows for the main buffer: tabs expanded and, with `wrap`, lines
/// broken at `width` columns the way a terminal wraps output.
fn display_rows(main: &[String], width: usize, wrap: bool) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::with_capacity(main.len());
    for line in main {
        let text = expand_tabs(line);
        if !wrap || text.chars().count() <= width {
            out.push(text);
            continue;
        }
        let chars: Vec<char> = text.chars().collect();
        out.extend(chars.chunks(width).map(|c| c.iter().collect::<String>()));
    }
    out
}

fn expand_tabs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut col = 0;
    for ch in s.chars() {
        if ch == '\t' {
            let n = TAB_WIDTH - (col % TAB_WIDTH);
            out.extend(std::iter::repeat_n(' ', n));
            col += n;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

fn overwrite_char(line: &str, col: usize, glyph: char) -> String {
    let mut chars: Vec<char> = line.chars().collect();
    if chars.len() <= col {
        chars.resize(col + 1, ' ');
    }
    chars[col] = glyph;
    chars.into_iter().collect()
}
