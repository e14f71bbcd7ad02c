//! Comparing rendered output with the stored snapshot.
//!
//! The verdict is byte-exact equality; normalization is the only place
//! incidental differences are removed. On mismatch a line diff is built for
//! the operator, with long unchanged stretches collapsed.

use difference::{Changeset, Difference};
use std::fmt::Write;

/// Unchanged lines kept around each change.
pub const CONTEXT_LINES: usize = 3;

/// Verdict of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub matched: bool,
    /// Empty when matched.
    pub diff: String,
}

/// Compare the stored snapshot (`expected`) with fresh output (`actual`).
#[must_use]
pub fn compare(expected: &str, actual: &str) -> Comparison {
    if expected == actual {
        return Comparison {
            matched: true,
            diff: String::new(),
        };
    }
    Comparison {
        matched: false,
        diff: line_diff(expected, actual),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Same,
    Removed,
    Added,
}

/// Line-oriented diff from `expected` to `actual`.
#[must_use]
pub fn line_diff(expected: &str, actual: &str) -> String {
    let changeset = Changeset::new(expected, actual, "\n");

    let mut lines: Vec<(Tag, &str)> = Vec::new();
    for diff in &changeset.diffs {
        let (tag, chunk) = match diff {
            Difference::Same(x) => (Tag::Same, x),
            Difference::Rem(x) => (Tag::Removed, x),
            Difference::Add(x) => (Tag::Added, x),
        };
        lines.extend(chunk.split('\n').map(|line| (tag, line)));
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- snapshot");
    let _ = writeln!(out, "+++ rendered");
    for (i, (tag, line)) in lines.iter().enumerate() {
        match tag {
            Tag::Removed => {
                let _ = writeln!(out, "- {line}");
            }
            Tag::Added => {
                let _ = writeln!(out, "+ {line}");
            }
            Tag::Same if near_change(&lines, i) => {
                let _ = writeln!(out, "  {line}");
            }
            Tag::Same => {
                // first line of a collapsed run
                if i == 0 || near_change(&lines, i - 1) {
                    let _ = writeln!(out, "  ...");
                }
            }
        }
    }
    out
}

fn near_change(lines: &[(Tag, &str)], index: usize) -> bool {
    let start = index.saturating_sub(CONTEXT_LINES);
    let end = (index + CONTEXT_LINES + 1).min(lines.len());
    lines[start..end].iter().any(|(tag, _)| *tag != Tag::Same)
}
