use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use mailparse::ParsedMail;

use crate::domain::message::Message;
use crate::mail::error::{MailError, MailResult};

/// Gmail sometimes pads base64url and sometimes does not.
const URL_SAFE_ANY_PAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const HTML_WIDTH: usize = 78;

pub fn decode_raw(raw: &str) -> MailResult<Vec<u8>> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    URL_SAFE_ANY_PAD
        .decode(compact)
        .map_err(|e| MailError::Decode(format!("raw message is not base64url: {e}")))
}

/// `Date:`, `From:` and `To:` lines followed by blank lines.
pub fn header_block(msg: &Message) -> String {
    format!(
        "Date: {}\nFrom: {}\nTo: {}\n\n\n\n",
        msg.header("Date").unwrap_or_default(),
        msg.header("From").unwrap_or_default(),
        msg.header("To").unwrap_or_default(),
    )
}

/// Render every text part of an RFC 822 document in document order, each
/// displayed line indented by one tab.
pub fn render_body(rfc822: &[u8]) -> MailResult<String> {
    let parsed = mailparse::parse_mail(rfc822).map_err(|e| MailError::Decode(e.to_string()))?;

    let mut parts = Vec::new();
    walk(&parsed, &mut parts);

    let mut out = String::new();
    for part in parts {
        let mime = part.ctype.mimetype.to_ascii_lowercase();
        if mime.starts_with("multipart/") || !mime.starts_with("text/") {
            continue;
        }

        let bytes = part
            .get_body_raw()
            .map_err(|e| MailError::Decode(e.to_string()))?;
        let mut text = decode_text(&bytes);
        if mime == "text/html" {
            text = html_to_text(&text)?;
        }
        let text = text.replace("\r\n", "\n").replace('\n', "\n\t");

        out.push('\t');
        out.push_str(&text);
    }
    Ok(out)
}

/// Decode and render a base64url raw message.
pub fn render_raw(raw: &str) -> MailResult<String> {
    render_body(&decode_raw(raw)?)
}

fn walk<'a>(part: &'a ParsedMail<'a>, out: &mut Vec<&'a ParsedMail<'a>>) {
    out.push(part);
    for sp in &part.subparts {
        walk(sp, out);
    }
}

/// UTF-8, or Latin-1 when the bytes are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn html_to_text(html: &str) -> MailResult<String> {
    html2text::from_read(html.as_bytes(), HTML_WIDTH)
        .map_err(|e| MailError::Decode(format!("html conversion failed: {e}")))
}
