//! Line classification: the first stage of every TOON parse.
//!
//! Each input line becomes a [`Line`] with its one-based number, so later
//! stages can report diagnostics against the source without re-counting.

use std::sync::LazyLock;

use regex::Regex;

/// `- key: value`, with a non-empty value.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static BULLET_FIELD: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^-\s*([\w-]+):\s*(.+)$").expect("valid regex"));

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// Column of the first non-whitespace character (0 for blank lines).
    pub indent: usize,
    /// Classification of the trimmed line.
    pub kind: LineKind<'a>,
    /// One-based line number.
    pub number: u32,
    /// Raw line text without the line terminator.
    pub raw: &'a str,
}

impl Line<'_> {
    /// Header title, if this line is a header.
    pub const fn header_title(&self) -> Option<&str> {
        return match self.kind {
            LineKind::Header { title, .. } => Some(title),
            _ => None,
        };
    }
}

/// What a trimmed line looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Empty or whitespace-only.
    Blank,
    /// Starts with `-`. Holds the trimmed line.
    Bullet {
        /// Trimmed line, leading `-` included.
        raw: &'a str,
    },
    /// Starts with one or more `#`.
    Header {
        /// Number of leading `#` characters.
        level: usize,
        /// Text after the markers, trimmed.
        title: &'a str,
    },
    /// Anything else.
    Text,
}

/// Split text into lines and classify each one.
///
/// Splits on `\n` only, so a trailing newline produces a final blank line;
/// the line count therefore matches the number of `\n`-separated pieces.
pub fn classify(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut number = 0_u32;

    for piece in text.split('\n') {
        number = number.saturating_add(1);
        let raw = piece.strip_suffix('\r').unwrap_or(piece);
        lines.push(classify_line(raw, number));
    }

    return lines;
}

/// Classify one raw line.
fn classify_line(raw: &str, number: u32) -> Line<'_> {
    let trimmed = raw.trim();
    let indent = raw.chars().take_while(|c| return c.is_whitespace()).count();

    let kind = if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed.starts_with('#') {
        let title = trimmed.trim_start_matches('#');
        let level = trimmed.len().saturating_sub(title.len());
        LineKind::Header {
            level,
            title: title.trim(),
        }
    } else if trimmed.starts_with('-') {
        LineKind::Bullet { raw: trimmed }
    } else {
        LineKind::Text
    };

    return Line {
        indent: if trimmed.is_empty() { 0 } else { indent },
        kind,
        number,
        raw,
    };
}

/// Lowercase a field key and turn hyphens into underscores.
pub fn normalize_key(key: &str) -> String {
    return key.to_lowercase().replace('-', "_");
}

/// Split bracket-list syntax `[a, "b", c]` into unquoted entries.
///
/// Surrounding brackets are optional. Empty entries are dropped, so `[]` and
/// `[a,,b]` give zero and two entries.
pub fn parse_list_items(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| return rest.strip_suffix(']'))
        .unwrap_or(trimmed);

    return inner
        .split(',')
        .map(|item| return unquote(item).trim())
        .filter(|item| return !item.is_empty())
        .map(str::to_string)
        .collect();
}

/// Split a trimmed bullet line into `(normalized_key, raw_value)`.
///
/// Returns `None` for bullets that are not `- key: value` pairs, such as plain
/// list items or a key with nothing after the colon.
pub fn split_bullet_field(bullet: &str) -> Option<(String, &str)> {
    let caps = BULLET_FIELD.captures(bullet)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2)?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    return Some((normalize_key(key), value));
}

/// Strip one leading and one trailing quote character (`"` or `'`).
pub fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    let start = trimmed.strip_prefix(['"', '\'']).unwrap_or(trimmed);
    return start.strip_suffix(['"', '\'']).unwrap_or(start);
}
