//! One line per message on the Home view:
//! index (4, right) + space, marker (4, left), `Mon DD `, sender (20, left), subject.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Weekday};
use regex::Regex;

use crate::domain::message::Message;
use crate::mail::error::{MailError, MailResult};

/// Column of the unread/trash marker within a row.
pub const MARKER_COL: usize = 5;
pub const TRASH_MARKER: char = 'D';

const SENDER_MAX: usize = 16;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("static regex is valid"));

/// Parse a `Date` header. Only the first five whitespace-separated tokens are
/// considered; `Weekday, D Month YYYY HH:MM:SS` is tried before
/// `D Month YYYY HH:MM:SS +HHMM`.
pub fn parse_date(value: &str) -> MailResult<NaiveDateTime> {
    let head = value.split_whitespace().take(5).collect::<Vec<_>>().join(" ");
    with_weekday(&head)
        .or_else(|| with_offset(&head))
        .ok_or_else(|| MailError::Date(value.to_string()))
}

// The weekday name must be valid but is not checked against the date.
fn with_weekday(s: &str) -> Option<NaiveDateTime> {
    let (day, rest) = s.split_once(", ")?;
    day.parse::<Weekday>().ok()?;
    NaiveDateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S").ok()
}

fn with_offset(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_str(s, "%d %b %Y %H:%M:%S %z")
        .ok()
        .map(|dt| dt.naive_local())
}

/// `"John Doe <j@x.com>"` -> `"John Doe"`
pub fn strip_address(from: &str) -> String {
    BRACKETED.replace_all(from, "").trim().to_string()
}

fn marker(msg: &Message, trashed: bool) -> &'static str {
    if trashed {
        "D"
    } else if msg.is_unread() {
        "N"
    } else {
        ""
    }
}

fn sender(msg: &Message) -> String {
    strip_address(msg.header("From").unwrap_or_default())
        .chars()
        .take(SENDER_MAX)
        .collect()
}

/// Format row `index` (0-based). Fails only when the date is unreadable.
pub fn format_row(index: usize, msg: &Message, trashed: bool) -> MailResult<String> {
    let date = parse_date(msg.header("Date").unwrap_or_default())?;
    Ok(format!(
        "{:>4} {:<4}{}{:<20}{}\n",
        index + 1,
        marker(msg, trashed),
        date.format("%b %d "),
        sender(msg),
        msg.header("Subject").unwrap_or_default(),
    ))
}

/// Same layout as `format_row` with the date column blanked out.
pub fn placeholder_row(index: usize, msg: &Message, trashed: bool) -> String {
    format!(
        "{:>4} {:<4}{:<7}{:<20}{}\n",
        index + 1,
        marker(msg, trashed),
        "??? ??",
        sender(msg),
        msg.header("Subject").unwrap_or_default(),
    )
}
