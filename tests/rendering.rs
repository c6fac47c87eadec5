use base64::Engine as _;
use base64::engine::general_purpose;

use tegmail::domain::message::{Message, MessageFormat, UNREAD};
use tegmail::mail::batch;
use tegmail::mail::body;
use tegmail::session::rows;

fn sample_message() -> Message {
    Message::new("18c2", "18c2")
        .with_label(UNREAD)
        .with_header("From", "\"Alice Example\" <alice@example.com>")
        .with_header("To", "bob@example.com")
        .with_header("Date", "Tue, 9 Jan 2024 08:15:00 +0100")
        .with_header("Subject", "Quarterly report")
}

#[test]
fn home_row_lines_up_columns() {
    let row = rows::format_row(11, &sample_message(), false).unwrap();
    assert_eq!(
        row,
        format!("{:>4} {:<4}Jan 09 {:<20}Quarterly report\n", 12, "N", "\"Alice Example\"")
    );
    assert_eq!(row.chars().nth(rows::MARKER_COL), Some('N'));

    let trashed = rows::format_row(11, &sample_message(), true).unwrap();
    assert_eq!(trashed.chars().nth(rows::MARKER_COL), Some(rows::TRASH_MARKER));
}

#[test]
fn multipart_message_renders_every_text_part() {
    let doc = concat!(
        "From: alice@example.com\r\n",
        "Content-Type: multipart/alternative; boundary=\"b1\"\r\n",
        "\r\n",
        "--b1\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "Plain version\r\n",
        "--b1\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<p>Rich <b>version</b></p>\r\n",
        "--b1\r\n",
        "Content-Type: image/png\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "iVBORw0KGgo=\r\n",
        "--b1--\r\n",
    );
    let raw = general_purpose::URL_SAFE_NO_PAD.encode(doc);

    let text = body::render_raw(&raw).unwrap();
    let plain = text.find("Plain version").unwrap();
    let rich = text.find("Rich").unwrap();
    assert!(plain < rich);
    assert!(!text.contains("<p>"));
    assert!(!text.contains("iVBOR"));
    assert!(text.lines().filter(|l| !l.is_empty()).all(|l| l.starts_with('\t')));
}

#[test]
fn message_view_header_block() {
    let block = body::header_block(&sample_message());
    assert_eq!(
        block,
        "Date: Tue, 9 Jan 2024 08:15:00 +0100\nFrom: \"Alice Example\" <alice@example.com>\nTo: bob@example.com\n\n\n\n"
    );
}

#[test]
fn batch_response_is_matched_back_to_ids() {
    let ids = vec!["a1".to_string(), "b2".to_string(), "c3".to_string()];
    let request = batch::encode_request("xyz", &ids, MessageFormat::Metadata);
    assert_eq!(request.matches("Content-ID: <item-").count(), 3);
    assert!(request.contains("GET /gmail/v1/users/me/messages/b2?format=metadata"));

    let response = concat!(
        "--resp\r\n",
        "Content-Type: application/http\r\n",
        "Content-ID: <response-item-2>\r\n",
        "\r\n",
        "HTTP/1.1 200 OK\r\n",
        "Content-Type: application/json; charset=UTF-8\r\n",
        "\r\n",
        "{\"id\":\"c3\",\"threadId\":\"c3\",\"labelIds\":[\"INBOX\"]}\r\n",
        "--resp\r\n",
        "Content-Type: application/http\r\n",
        "Content-ID: <response-item-0>\r\n",
        "\r\n",
        "HTTP/1.1 404 Not Found\r\n",
        "Content-Type: application/json; charset=UTF-8\r\n",
        "\r\n",
        "{\"error\":{\"code\":404,\"message\":\"Requested entity was not found.\"}}\r\n",
        "--resp--\r\n",
    );
    let parts =
        batch::decode_response("multipart/mixed; boundary=resp", response.as_bytes()).unwrap();
    let results = batch::correlate(&ids, parts);

    let order: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["c3", "a1", "b2"]);
    assert_eq!(results[0].1.as_ref().unwrap().id, "c3");
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_err());
}
