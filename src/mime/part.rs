//! Structured view over a slice of a raw message: header block + body.

use std::collections::HashMap;

use crate::error::MimeError;

/// Parsed header block.
///
/// Names are case-insensitive; when a header repeats, the last value wins.
/// Folded continuation lines are unfolded into a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    values: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an RFC 5322 header block (no trailing blank line required).
    pub fn parse(block: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in block.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);

            // Continuation of the previous header
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.insert(&name, value);
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.insert(&name, value);
        }

        headers
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The parsed `Content-Type` header, if present and well-formed.
    pub fn content_type(&self) -> Option<ContentType> {
        self.get("content-type").and_then(ContentType::parse)
    }

    /// `Content-Transfer-Encoding`, lowercased and trimmed.
    pub fn transfer_encoding(&self) -> Option<String> {
        self.get("content-transfer-encoding")
            .map(|v| v.trim().to_ascii_lowercase())
    }

    /// Whether `Content-Disposition` marks this part as an attachment.
    pub fn is_attachment(&self) -> bool {
        self.get("content-disposition").is_some_and(|v| {
            v.split(';')
                .next()
                .is_some_and(|d| d.trim().eq_ignore_ascii_case("attachment"))
        })
    }
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type, lowercased (e.g. "text", "multipart").
    pub main_type: String,
    /// Subtype, lowercased (e.g. "plain", "html").
    pub sub_type: String,
    /// Parameters with lowercased names and unquoted values.
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Parse `type/subtype; key=value; key="quoted value"`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let (main_type, sub_type) = parts.next()?.trim().split_once('/')?;

        let parameters = parts
            .filter_map(|param| {
                let (key, value) = param.trim().split_once('=')?;
                let value = value.trim().trim_matches('"').to_string();
                Some((key.trim().to_ascii_lowercase(), value))
            })
            .collect();

        Some(Self {
            main_type: main_type.trim().to_ascii_lowercase(),
            sub_type: sub_type.trim().to_ascii_lowercase(),
            parameters,
        })
    }

    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type == main_type && self.sub_type == sub_type
    }

    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }
}

/// One MIME entity: the whole message or one segment of a multipart body.
#[derive(Debug, Clone)]
pub struct MimePart<'a> {
    pub headers: Headers,
    pub body: &'a str,
}

impl<'a> MimePart<'a> {
    /// Split a top-level message at its first blank line.
    ///
    /// Fails when no blank line exists at all.
    pub fn parse(raw: &'a str) -> Result<Self, MimeError> {
        let (header_block, body) = split_at_blank_line(raw).ok_or(MimeError::MissingSeparator)?;
        Ok(Self {
            headers: Headers::parse(header_block),
            body,
        })
    }

    /// Parse one multipart segment (the text between two delimiter lines).
    ///
    /// The line terminator that ends the delimiter line and the one that
    /// precedes the next delimiter are not part of the segment. A segment
    /// that starts with a blank line has no headers; one with headers but no
    /// blank line is treated as headers with an empty body.
    pub fn parse_segment(segment: &'a str) -> Self {
        let segment = strip_leading_newline(segment);
        let segment = strip_trailing_newline(segment);

        if segment.starts_with("\r\n") || segment.starts_with('\n') {
            return Self {
                headers: Headers::new(),
                body: strip_leading_newline(segment),
            };
        }

        match split_at_blank_line(segment) {
            Some((header_block, body)) => Self {
                headers: Headers::parse(header_block),
                body,
            },
            None => Self {
                headers: Headers::parse(segment),
                body: "",
            },
        }
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.headers.content_type()
    }
}

/// Split at the first CRLF-CRLF or LF-LF, whichever comes first.
fn split_at_blank_line(text: &str) -> Option<(&str, &str)> {
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let lf = text.find("\n\n").map(|i| (i, 2));

    let (idx, len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    Some((&text[..idx], &text[idx + len..]))
}

fn strip_leading_newline(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

fn strip_trailing_newline(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}
