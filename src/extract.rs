//! Pulls the JSON payload out of a free-text model reply.
//!
//! Vision models wrap structured answers in a fenced code block, usually
//! surrounded by prose. The scanner here walks the reply line by line instead
//! of matching one pattern, so indentation, CRLF line endings, several fences
//! and trailing commentary don't break extraction.

use serde_json::Value;

/// Outcome of looking for a payload in a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A fenced block was found and parsed.
    Payload(Value),
    /// The reply held no usable fenced block.
    Missing,
}

/// Extract and parse the JSON block of a model reply.
///
/// A missing block is not an error; a block that isn't valid JSON is.
pub fn parse_model_reply(reply: &str) -> Result<Extraction, serde_json::Error> {
    match extract_json_block(reply) {
        Some(block) => serde_json::from_str(block).map(Extraction::Payload),
        None => Ok(Extraction::Missing),
    }
}

/// Locate the body of the JSON code block in `text`.
///
/// An opening fence is a run of three or more backticks followed by an info
/// string that ends the line; it may come after prose on the same line. A
/// closing fence is a line starting with at least as many backticks, whatever
/// follows them. The first fence labelled `json` (any case) with a non-empty
/// body wins. If it is never closed, its body runs to the end of the text.
/// Without any `json` fence, the first unlabelled fence whose body starts
/// with `{` is used. The returned slice is trimmed.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let lines = split_lines(text);
    let mut unlabelled = None;
    let mut i = 0;

    while i < lines.len() {
        let Some((ticks, info)) = opening_fence(lines[i].content) else {
            i += 1;
            continue;
        };

        let body_start = lines[i].next;
        let close = lines[i + 1..]
            .iter()
            .position(|line| is_closing_fence(line.content, ticks))
            .map(|offset| i + 1 + offset);
        let body_end = close.map_or(text.len(), |c| lines[c].start);
        let body = text[body_start..body_end].trim();

        let is_json = info
            .split_whitespace()
            .next()
            .is_some_and(|lang| lang.eq_ignore_ascii_case("json"));

        if is_json && !body.is_empty() {
            return Some(body);
        }
        if info.is_empty() && unlabelled.is_none() && body.starts_with('{') {
            unlabelled = Some(body);
        }

        match close {
            Some(c) => i = c + 1,
            None => break,
        }
    }

    unlabelled
}

struct Line<'a> {
    /// Line text without its terminator.
    content: &'a str,
    /// Byte offset where the line starts.
    start: usize,
    /// Byte offset where the following line starts.
    next: usize,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in text.split_inclusive('\n') {
        let next = start + raw.len();
        let content = raw.trim_end_matches(['\n', '\r']);
        lines.push(Line {
            content,
            start,
            next,
        });
        start = next;
    }
    lines
}

/// Returns the backtick count and info string of an opening fence.
///
/// The fence is the first run of three or more backticks whose remainder of
/// the line holds no backtick, so `Result: ```json` opens a block too.
fn opening_fence(line: &str) -> Option<(usize, &str)> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'`' {
            pos += 1;
            continue;
        }
        let ticks = bytes[pos..].iter().take_while(|&&b| b == b'`').count();
        let rest = &line[pos + ticks..];
        if ticks >= 3 && !rest.contains('`') {
            return Some((ticks, rest.trim()));
        }
        pos += ticks;
    }
    None
}

/// A closing fence starts its line (after indentation) with at least `ticks`
/// backticks; trailing commentary on the same line is ignored.
fn is_closing_fence(line: &str, ticks: usize) -> bool {
    let trimmed = line.trim_start();
    trimmed.bytes().take_while(|&b| b == b'`').count() >= ticks
}
