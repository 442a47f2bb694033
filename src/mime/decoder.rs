//! Content-Transfer-Encoding decoding for a single MIME part.
//!
//! Pure functions, no error path: a body that cannot be decoded is returned
//! as-is so the pipeline keeps moving.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::part::Headers;

/// Decode `body` according to the part's `Content-Transfer-Encoding`.
///
/// - `base64`: whitespace is stripped, then the bytes must decode and be
///   valid UTF-8; otherwise the original body comes back unchanged.
/// - `quoted-printable`: soft line breaks removed, `=XX` escapes decoded,
///   the resulting bytes read as UTF-8.
/// - anything else (`7bit`, `8bit`, `binary`, absent): unchanged.
pub fn decode(headers: &Headers, body: &str) -> String {
    match headers.transfer_encoding().as_deref() {
        Some("base64") => decode_base64(body).unwrap_or_else(|| body.to_string()),
        Some("quoted-printable") => decode_quoted_printable(body),
        _ => body.to_string(),
    }
}

/// Decode a base64 body, ignoring embedded whitespace.
///
/// Returns `None` on malformed input or non-UTF-8 payloads.
pub fn decode_base64(body: &str) -> Option<String> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decode a quoted-printable body (RFC 2045 §6.7).
///
/// An `=` that is neither a soft break nor followed by two hex digits is
/// kept literally.
pub fn decode_quoted_printable(body: &str) -> String {
    let input = body.as_bytes();
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if input[i] != b'=' {
            out.push(input[i]);
            i += 1;
            continue;
        }

        // Soft line break
        if input[i + 1..].starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if input[i + 1..].starts_with(b"\n") {
            i += 2;
            continue;
        }

        match (input.get(i + 1), input.get(i + 2)) {
            (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push((hex_value(hi) << 4) | hex_value(lo));
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(encoding: &str) -> Headers {
        Headers::parse(&format!("Content-Transfer-Encoding: {encoding}"))
    }

    #[test]
    fn base64_decodes_utf8() {
        let body = STANDARD.encode("你好, world");
        assert_eq!(decode(&headers("base64"), &body), "你好, world");
    }

    #[test]
    fn base64_ignores_injected_whitespace() {
        let encoded = STANDARD.encode("The quick brown fox jumps over the lazy dog");
        let (a, b) = encoded.split_at(10);
        let body = format!("  {a}\r\n\t{b} \r\n");
        assert_eq!(
            decode(&headers("base64"), &body),
            "The quick brown fox jumps over the lazy dog"
        );
    }

    #[test]
    fn base64_header_is_case_insensitive() {
        let body = STANDARD.encode("hello");
        assert_eq!(decode(&headers("Base64"), &body), "hello");
    }

    #[test]
    fn base64_malformed_returns_original() {
        let body = "this is *not* base64!";
        assert_eq!(decode(&headers("base64"), body), body);
    }

    #[test]
    fn base64_invalid_utf8_returns_original() {
        let body = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert_eq!(decode(&headers("base64"), &body), body);
    }

    #[test]
    fn quoted_printable_soft_break_then_utf8() {
        let body = "Hello =\r\n=E4=BD=A0";
        assert_eq!(decode(&headers("quoted-printable"), body), "Hello 你");
    }

    #[test]
    fn quoted_printable_bare_lf_soft_break() {
        assert_eq!(decode_quoted_printable("ab=\ncd"), "abcd");
    }

    #[test]
    fn quoted_printable_lowercase_hex() {
        assert_eq!(decode_quoted_printable("a=3db"), "a=b");
    }

    #[test]
    fn quoted_printable_keeps_invalid_escape() {
        assert_eq!(decode_quoted_printable("50=ZZ off ="), "50=ZZ off =");
    }

    #[test]
    fn quoted_printable_keeps_hard_line_breaks() {
        assert_eq!(decode_quoted_printable("line1\r\nline2"), "line1\r\nline2");
    }

    #[test]
    fn unknown_encoding_is_identity() {
        assert_eq!(decode(&headers("8bit"), "=E4 raw"), "=E4 raw");
        assert_eq!(decode(&Headers::new(), "plain"), "plain");
    }
}
