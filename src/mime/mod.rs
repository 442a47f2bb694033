//! Raw message → plain text.
//!
//! `normalize()` is the entry point; it walks the MIME tree
//! (`walker`), decodes transfer encodings (`decoder`), strips HTML
//! (`html`), and falls back to a raw prefix when parsing fails.

pub mod decoder;
pub mod html;
pub mod normalize;
pub mod part;
pub mod walker;

pub use normalize::{normalize, truncate_chars};
pub use part::{ContentType, Headers, MimePart};
pub use walker::extract_readable_text;
