//! HTML-to-text reduction for HTML-only messages.

use std::sync::LazyLock;

use regex::Regex;

static STYLE_SCRIPT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:style|script)\b[^>]*>.*?</(?:style|script)\s*>").ok());

static BLANK_RUNS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t\r]*\n){2,}").ok());

/// Strip HTML tags and decode the handful of entities mail bodies use.
///
/// `<style>`/`<script>` blocks are dropped with their content, every other
/// `<...>` tag is removed (an unterminated `<` swallows the rest of the
/// input), `&nbsp;` becomes a space, and runs of blank lines collapse to one.
pub fn strip_html(html: &str) -> String {
    let html = match STYLE_SCRIPT.as_ref() {
        Some(re) => re.replace_all(html, ""),
        None => html.into(),
    };

    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = decode_entities(&text);
    let text = match BLANK_RUNS.as_ref() {
        Some(re) => re.replace_all(&text, "\n\n").into_owned(),
        None => text,
    };

    text.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
