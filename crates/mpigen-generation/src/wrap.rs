//! Fixed-column line wrapping for generated Fortran
//!
//! Lines are broken only at whitespace, never inside a word, and physical
//! lines are joined with the ` &` continuation marker.

use std::{borrow::Cow, sync::OnceLock};

use regex::{Captures, Regex};

/// Fortran free-form continuation marker
pub const CONTINUATION: &str = "&";

/// Default maximum line length for generated Fortran
pub const DEFAULT_LINE_WIDTH: usize = 100;

/// Extra indentation of continuation lines in block mode
pub const BLOCK_CONTINUATION_INDENT: usize = 8;

/// Room kept at the end of each physical line for ` &`
const MARKER_WIDTH: usize = CONTINUATION.len() + 1;

/// Greedy word wrap.
///
/// The first line keeps its own leading whitespace, later lines start with
/// `indent`. Words longer than the available width are left whole.
fn wrap_words(text: &str, width: usize, indent: &str) -> Vec<String> {
    // Alternating runs of whitespace and non-whitespace, consumed from the back
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_space = None;
    for ch in text.chars() {
        let ch = if ch.is_whitespace() { ' ' } else { ch };
        let is_space = ch == ' ';
        if in_space.is_some_and(|prev| prev != is_space) {
            chunks.push(std::mem::take(&mut current));
        }
        in_space = Some(is_space);
        current.push(ch);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks.reverse();

    let indent_len = indent.chars().count();
    let mut lines = Vec::new();

    while !chunks.is_empty() {
        let (prefix, prefix_len) = if lines.is_empty() { ("", 0) } else { (indent, indent_len) };
        let available = width.saturating_sub(prefix_len).max(1);

        if !lines.is_empty() && chunks.last().is_some_and(|c| c.trim().is_empty()) {
            chunks.pop();
        }

        let mut line: Vec<String> = Vec::new();
        let mut line_len = 0;
        while let Some(chunk) = chunks.last() {
            let len = chunk.chars().count();
            if line_len + len <= available {
                line_len += len;
                line.extend(chunks.pop());
            } else {
                break;
            }
        }

        if line.is_empty() {
            if let Some(chunk) = chunks.pop() {
                line.push(chunk);
            }
        }

        if line.last().is_some_and(|c| c.trim().is_empty()) {
            line.pop();
        }

        if !line.is_empty() {
            lines.push(format!("{}{}", prefix, line.concat()));
        }
    }

    lines
}

/// Drop physical lines that hold nothing but the continuation marker,
/// moving the marker onto the previous line instead.
fn merge_bare_markers(lines: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.trim() == CONTINUATION {
            if let Some(last) = merged.last_mut() {
                if !last.ends_with(CONTINUATION) {
                    last.push(' ');
                    last.push_str(CONTINUATION);
                }
            }
        } else {
            merged.push(line);
        }
    }
    merged
}

fn wrap_with_markers(line: &str, width: usize, indent: &str) -> String {
    let lines = wrap_words(line, width.saturating_sub(MARKER_WIDTH), indent);
    merge_bare_markers(lines).join(format!(" {}\n", CONTINUATION).as_str())
}

/// Wrap a single comma-joined list to `width` columns.
///
/// Continuation lines start with `indent`. A list that already fits is
/// returned unchanged.
pub fn wrap_list(text: &str, width: usize, indent: &str) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    wrap_with_markers(text, width, indent)
}

/// Re-wrap every line of `text` longer than `width`.
///
/// Continuation lines are indented eight columns past the indentation of
/// the statement they belong to, including lines that were already
/// continued in the input. Shorter lines pass through, trailing whitespace
/// removed. Runs of blank lines are collapsed afterwards.
pub fn wrap_block(text: &str, width: usize) -> String {
    let mut output = String::with_capacity(text.len());
    // Indentation of the statement continued onto the next line
    let mut continued: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim_end();
        let content = line.trim_start();
        let statement_indent = continued.unwrap_or(line.len() - content.len());
        let indent = " ".repeat(statement_indent + BLOCK_CONTINUATION_INDENT);

        let line = match continued {
            Some(_) if !content.is_empty() => Cow::Owned(format!("{}{}", indent, content)),
            _ => Cow::Borrowed(line),
        };
        if line.chars().count() > width {
            output.push_str(&wrap_with_markers(&line, width, &indent));
        } else {
            output.push_str(&line);
        }
        output.push('\n');

        // Comments never continue a statement
        continued = (content.ends_with(CONTINUATION) && !content.starts_with('!'))
            .then_some(statement_indent);
    }

    collapse_blank_lines(&output)
}

/// Collapse every run of two or more blank lines to exactly one.
pub fn collapse_blank_lines(text: &str) -> String {
    static BLANK_RUN: OnceLock<Regex> = OnceLock::new();
    let re = BLANK_RUN
        .get_or_init(|| Regex::new(r"(?:[ \t]*\n){2,}").expect("Invalid blank line regex"));

    re.replace_all(text, |caps: &Captures| {
        // A run at the very start has no content line ending in front of it
        match caps.get(0) {
            Some(m) if m.start() == 0 => "\n",
            _ => "\n\n",
        }
    })
    .into_owned()
}
