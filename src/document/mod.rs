//! Splitting rendered output into YAML document fragments.
//!
//! `helm template` writes every rendered manifest as its own YAML document
//! separated by `---` lines (usually followed by a `# Source:` comment).
//! [`split_documents`] yields the text between those markers, skipping
//! fragments that hold nothing but whitespace and comments. Fragments are
//! borrowed slices of the input, so their bytes are exactly what the
//! renderer produced.

use regex::Regex;
use std::sync::LazyLock;

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---[ \t]*(?:#.*)?$").expect("document marker regex"));

/// Lazy iterator over the non-empty fragments of a multi-document text.
///
/// A clone walks the remaining fragments independently, so cloning before
/// iterating lets the same text be walked twice.
#[derive(Debug, Clone)]
pub struct Documents<'a> {
    rest: &'a str,
}

/// Split `text` on document boundary markers.
#[must_use]
pub fn split_documents(text: &str) -> Documents<'_> {
    Documents { rest: text }
}

impl<'a> Iterator for Documents<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let (fragment, rest) = split_at_marker(self.rest);
            self.rest = rest;
            if !is_blank(fragment) {
                return Some(fragment);
            }
        }
        None
    }
}

/// Is `line` (with or without its line ending) a document marker?
#[must_use]
pub fn is_marker(line: &str) -> bool {
    MARKER_RE.is_match(line.trim_end_matches(['\n', '\r']))
}

/// Fragments made only of blank and comment lines carry no document.
#[must_use]
pub fn is_blank(fragment: &str) -> bool {
    fragment.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

fn split_at_marker(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let end = offset + line.len();
        if is_marker(line) {
            return (&text[..offset], &text[end..]);
        }
        offset = end;
    }
    (text, "")
}
