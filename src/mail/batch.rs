//! Gmail batch requests: many `messages.get` calls in one `multipart/mixed`
//! round trip. Each sub-request carries `Content-ID: <item-N>`; the server
//! answers with `<response-item-N>` in whatever order parts complete.

use std::time::{SystemTime, UNIX_EPOCH};

use mailparse::MailHeaderMap;

use crate::domain::message::MessageFormat;
use crate::mail::api::{self, GmailMessage};
use crate::mail::error::{MailError, MailResult};

/// Gmail rejects batches with more than this many parts.
pub const MAX_BATCH_SIZE: usize = 100;

pub fn new_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("batch_tegmail_{nanos:x}")
}

/// Build the body of a batch request fetching `ids` in the given format.
pub fn encode_request(boundary: &str, ids: &[String], format: MessageFormat) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str("Content-Type: application/http\r\n");
        out.push_str(&format!("Content-ID: <item-{i}>\r\n\r\n"));
        out.push_str(&format!(
            "GET /gmail/v1/users/me/messages/{id}?format={}\r\n\r\n",
            format.as_str()
        ));
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPart {
    /// Index of the sub-request this part answers, if its Content-ID could be read.
    pub index: Option<usize>,
    pub status: u16,
    pub body: String,
}

/// Split a batch response into its parts, in the order the server wrote them.
pub fn decode_response(content_type: &str, body: &[u8]) -> MailResult<Vec<BatchPart>> {
    let mut doc = format!("Content-Type: {content_type}\r\n\r\n").into_bytes();
    doc.extend_from_slice(body);

    let parsed = mailparse::parse_mail(&doc).map_err(|e| MailError::Batch(e.to_string()))?;
    if !parsed.ctype.mimetype.starts_with("multipart/") {
        return Err(MailError::Batch(format!(
            "expected multipart response, got {}",
            parsed.ctype.mimetype
        )));
    }

    let mut parts = Vec::with_capacity(parsed.subparts.len());
    for sp in &parsed.subparts {
        let index = sp
            .headers
            .get_first_value("Content-ID")
            .and_then(|cid| parse_content_id(&cid));
        let raw = sp
            .get_body_raw()
            .map_err(|e| MailError::Batch(e.to_string()))?;
        let (status, body) = parse_http_response(&raw)?;
        parts.push(BatchPart {
            index,
            status,
            body,
        });
    }
    Ok(parts)
}

/// `<response-item-7>` -> 7
fn parse_content_id(cid: &str) -> Option<usize> {
    let cid = cid.trim().trim_start_matches('<').trim_end_matches('>');
    cid.rsplit('-').next()?.parse().ok()
}

/// Parse the HTTP response embedded in an `application/http` part.
fn parse_http_response(raw: &[u8]) -> MailResult<(u16, String)> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_start();

    let status_line = text
        .lines()
        .next()
        .ok_or_else(|| MailError::Batch("empty part".into()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| MailError::Batch(format!("bad status line: {status_line:?}")))?;

    let body = match (text.find("\r\n\r\n"), text.find("\n\n")) {
        (Some(a), Some(b)) if b < a => &text[b + 2..],
        (Some(a), _) => &text[a + 4..],
        (None, Some(b)) => &text[b + 2..],
        (None, None) => "",
    };
    Ok((status, body.trim().to_string()))
}

/// Pair decoded parts with the ids they answer. Results keep the server's
/// completion order; ids that received no part are reported as failed at the end.
pub fn correlate(ids: &[String], parts: Vec<BatchPart>) -> Vec<(String, MailResult<GmailMessage>)> {
    let mut answered = vec![false; ids.len()];
    let mut out = Vec::with_capacity(ids.len());

    for part in parts {
        let Some(i) = part.index.filter(|i| *i < ids.len()) else {
            log::warn!("batch part without a usable Content-ID (status {})", part.status);
            continue;
        };
        if answered[i] {
            continue;
        }
        answered[i] = true;

        let result = if (200..300).contains(&part.status) {
            serde_json::from_str::<GmailMessage>(&part.body).map_err(MailError::from)
        } else {
            Err(MailError::api(part.status, api::error_message(&part.body)))
        };
        out.push((ids[i].clone(), result));
    }

    for (i, done) in answered.iter().enumerate() {
        if !done {
            out.push((
                ids[i].clone(),
                Err(MailError::Batch("no response part".into())),
            ));
        }
    }
    out
}
