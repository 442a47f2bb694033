//! Walks a raw message's MIME structure and picks the most readable part.
//!
//! Selection policy:
//! 1. the first `text/plain` leaf in document order, decoded;
//! 2. otherwise the first `text/html` leaf, decoded and tag-stripped;
//! 3. otherwise the whole message treated as single-part.
//!
//! Leaves marked `Content-Disposition: attachment` are never selected, even
//! when their type is `text/plain` or `text/html`: an attached `.txt` or
//! `.html` file is not the message body.
//!
//! Nested `multipart/*` segments are walked depth-first, so a plain-text
//! leaf inside `multipart/alternative` inside `multipart/mixed` still wins
//! over an HTML leaf that appears earlier at the top level.

use tracing::debug;

use super::decoder;
use super::html::strip_html;
use super::part::{ContentType, MimePart};
use crate::error::MimeError;

/// Deepest multipart nesting we are willing to walk.
pub const MAX_DEPTH: usize = 8;

/// Extract readable text from a complete raw message.
pub fn extract_readable_text(raw: &str) -> Result<String, MimeError> {
    let message = MimePart::parse(raw)?;

    let boundary = message
        .content_type()
        .as_ref()
        .and_then(ContentType::boundary)
        .map(str::to_string);

    if let Some(boundary) = boundary {
        let mut found = Found::default();
        collect_leaves(message.body, &boundary, 0, &mut found)?;

        if let Some(plain) = found.plain {
            debug!("Selected text/plain part");
            return Ok(decoder::decode(&plain.headers, plain.body));
        }
        if let Some(html) = found.html {
            debug!("No text/plain part, falling back to text/html");
            return Ok(strip_html(&decoder::decode(&html.headers, html.body)));
        }
        debug!("Multipart message without readable leaves, treating as single-part");
    }

    Ok(decoder::decode(&message.headers, message.body))
}

/// First plain and first HTML leaves seen so far.
#[derive(Default)]
struct Found<'a> {
    plain: Option<MimePart<'a>>,
    html: Option<MimePart<'a>>,
}

/// Split `body` on `--boundary` and visit every segment in order.
///
/// Stops as soon as a plain-text leaf is found, since nothing later can
/// outrank it.
fn collect_leaves<'a>(
    body: &'a str,
    boundary: &str,
    depth: usize,
    found: &mut Found<'a>,
) -> Result<(), MimeError> {
    if depth >= MAX_DEPTH {
        return Err(MimeError::TooDeep { max: MAX_DEPTH });
    }

    let segments = split_segments(body, boundary)?;

    for segment in segments {
        let part = MimePart::parse_segment(segment);
        if part.headers.is_attachment() {
            continue;
        }
        let Some(content_type) = part.content_type() else {
            continue;
        };

        if content_type.is_multipart() {
            if let Some(inner) = content_type.boundary() {
                let inner = inner.to_string();
                collect_leaves(part.body, &inner, depth + 1, found)?;
                if found.plain.is_some() {
                    return Ok(());
                }
            }
        } else if content_type.is("text", "plain") {
            found.plain = Some(part);
            return Ok(());
        } else if content_type.is("text", "html") && found.html.is_none() {
            found.html = Some(part);
        }
    }

    Ok(())
}

/// Segments between delimiter lines, excluding the preamble and anything
/// after the closing `--boundary--`.
fn split_segments<'a>(body: &'a str, boundary: &str) -> Result<Vec<&'a str>, MimeError> {
    let delimiter = format!("--{boundary}");

    let mut pieces = body.split(delimiter.as_str());
    // Preamble before the first delimiter
    pieces.next();

    let mut segments = Vec::new();
    let mut saw_delimiter = false;
    for piece in pieces {
        saw_delimiter = true;
        // Closing delimiter: "--boundary--"
        if piece.starts_with("--") {
            break;
        }
        segments.push(piece);
    }

    if !saw_delimiter {
        return Err(MimeError::BoundaryNotFound {
            boundary: boundary.to_string(),
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multipart(boundary: &str, parts: &[&str]) -> String {
        let mut raw = format!(
            "From: a@example.com\r\nContent-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\nThis is a preamble.\r\n"
        );
        for part in parts {
            raw.push_str(&format!("--{boundary}\r\n{part}\r\n"));
        }
        raw.push_str(&format!("--{boundary}--\r\nepilogue\r\n"));
        raw
    }

    const PLAIN: &str = "Content-Type: text/plain; charset=utf-8\r\n\r\nplain body";
    const HTML: &str = "Content-Type: text/html; charset=utf-8\r\n\r\n<p>html body</p>";

    #[test]
    fn single_part_body_is_returned() {
        let raw = "Subject: hi\r\nFrom: a@b.c\r\n\r\nHello there\r\nSecond line";
        assert_eq!(extract_readable_text(raw).unwrap(), "Hello there\r\nSecond line");
    }

    #[test]
    fn single_part_base64_is_decoded() {
        let raw = "Subject: hi\r\nContent-Transfer-Encoding: base64\r\n\r\n5L2g5aW9\r\n";
        assert_eq!(extract_readable_text(raw).unwrap(), "你好");
    }

    #[test]
    fn plain_wins_when_first() {
        let raw = multipart("b1", &[PLAIN, HTML]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "plain body");
    }

    #[test]
    fn plain_wins_when_last() {
        let raw = multipart("b1", &[HTML, PLAIN]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "plain body");
    }

    #[test]
    fn first_plain_wins_among_several() {
        let second = "Content-Type: text/plain\r\n\r\nsecond plain";
        let raw = multipart("b1", &[PLAIN, second]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "plain body");
    }

    #[test]
    fn html_only_is_stripped() {
        let html = "Content-Type: text/html\r\n\r\n<p>Hi</p>&nbsp;there";
        let raw = multipart("b1", &[html]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "Hi there");
    }

    #[test]
    fn first_html_wins_among_several() {
        let other = "Content-Type: text/html\r\n\r\n<b>other</b>";
        let raw = multipart("b1", &[HTML, other]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "html body");
    }

    #[test]
    fn quoted_printable_part_is_decoded() {
        let part = "Content-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\n=E9=AA=8C=E8=AF=81=E7=A0=81: 1234=\r\n56";
        let raw = multipart("qp", &[part]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "验证码: 123456");
    }

    #[test]
    fn unquoted_boundary_is_recognized() {
        let raw = "Content-Type: multipart/mixed; boundary=XyZ\r\n\r\n--XyZ\r\nContent-Type: text/plain\r\n\r\nok\r\n--XyZ--\r\n";
        assert_eq!(extract_readable_text(raw).unwrap(), "ok");
    }

    #[test]
    fn nested_plain_beats_outer_html() {
        let inner = "Content-Type: multipart/alternative; boundary=\"inner\"\r\n\r\n--inner\r\nContent-Type: text/plain\r\n\r\nnested plain\r\n--inner--";
        let raw = multipart("outer", &[HTML, inner]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "nested plain");
    }

    #[test]
    fn attachments_are_skipped() {
        let attachment = "Content-Type: text/plain; name=\"notes.txt\"\r\nContent-Disposition: attachment; filename=\"notes.txt\"\r\n\r\nattached notes";
        let raw = multipart("b1", &[attachment, HTML]);
        assert_eq!(extract_readable_text(&raw).unwrap(), "html body");
    }

    #[test]
    fn no_readable_leaf_falls_through_to_whole_message() {
        let image = "Content-Type: image/png\r\nContent-Transfer-Encoding: base64\r\n\r\niVBORw0KGgo=";
        let raw = multipart("b1", &[image]);
        let text = extract_readable_text(&raw).unwrap();
        assert!(text.starts_with("This is a preamble."));
        assert!(text.contains("--b1"));
    }

    #[test]
    fn claimed_boundary_missing_is_an_error() {
        let raw = "Content-Type: multipart/mixed; boundary=\"nowhere\"\r\n\r\njust text";
        assert!(matches!(
            extract_readable_text(raw),
            Err(MimeError::BoundaryNotFound { .. })
        ));
    }

    #[test]
    fn missing_header_separator_is_an_error() {
        assert!(matches!(
            extract_readable_text("Subject: only headers"),
            Err(MimeError::MissingSeparator)
        ));
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let mut body = "Content-Type: text/plain\r\n\r\ndeep".to_string();
        for level in 0..=MAX_DEPTH {
            body = format!(
                "Content-Type: multipart/mixed; boundary=\"l{level}\"\r\n\r\n--l{level}\r\n{body}\r\n--l{level}--"
            );
        }
        assert!(matches!(
            extract_readable_text(&body),
            Err(MimeError::TooDeep { .. })
        ));
    }
}
