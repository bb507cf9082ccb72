//! Conversion between plain Markdown and TOON, and rendering of documents.
//!
//! Line-oriented and lossy by nature: bullets are rewritten, everything else
//! passes through. [`document_to_toon`] is the exact direction: parsing its
//! output reproduces the header fields of the rendered document. A bullet is
//! one line, so line breaks inside values are folded and reported.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Error;
use crate::lexer::{self, LineKind};
use crate::tokens::{CharRatioCounter, TokenCounter};
use crate::types::Value;

/// `- Key: value` in plain Markdown.
#[allow(clippy::expect_used, reason = "static regex literal is known valid")]
static MARKDOWN_FIELD: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^-\s*([\w-]+):\s*(.+)$").expect("valid regex"));

/// `name: "..."` anywhere in TOON text.
#[allow(clippy::expect_used, reason = "static regex literal is known valid")]
static NAME_FIELD: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#"(?i)name:\s*"(.+?)""#).expect("valid regex"));

/// Title of the overview block written by this module.
const OVERVIEW_TITLE: &str = "Document Overview";

/// Title used when a document has no name.
const UNTITLED: &str = "Document";

/// Output of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    /// Converted text.
    pub content: String,
    /// Format of `content`.
    pub format: Format,
    /// Estimated token count of `content`.
    pub tokens: usize,
    /// Notes about lossy or guessed parts of the conversion.
    pub warnings: Vec<String>,
}

/// A text format the converter reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Plain Markdown (`.md`).
    Markdown,
    /// TOON Markdown (`.toon.md`).
    Toon,
}

impl Format {
    /// File suffix, including the leading dot.
    pub const fn extension(self) -> &'static str {
        return match self {
            Format::Markdown => ".md",
            Format::Toon => ".toon.md",
        };
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(match self {
            Format::Markdown => "markdown",
            Format::Toon => "toon",
        });
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Format::Markdown),
            "toon" => Ok(Format::Toon),
            _ => Err(Error::UnknownFormat { name: s.to_string() }),
        };
    }
}

/// Convert `content` from one format to another. Same-format input passes through.
pub fn convert(content: &str, from: Format, to: Format) -> ConversionResult {
    return match (from, to) {
        (Format::Markdown, Format::Toon) => markdown_to_toon(content),
        (Format::Toon, Format::Markdown) => toon_to_markdown(content),
        (Format::Markdown, Format::Markdown) | (Format::Toon, Format::Toon) => finish(content.to_string(), to, Vec::new()),
    };
}

/// Render a document as Markdown for reading.
pub fn document_to_markdown(document: &Document) -> String {
    let mut out = format!("# {}\n\n", document.name.as_deref().unwrap_or(UNTITLED));
    if let Some(description) = &document.description {
        out.push_str(description);
        out.push_str("\n\n");
    }

    let mut sections = Vec::new();
    for (key, value) in document.fields() {
        if key == "name" || key == "description" {
            continue;
        }
        match value {
            Value::Map(body) => sections.push((key, body)),
            other => out.push_str(&format!("- **{}:** {}\n", title_case(&key), render_plain(&other))),
        }
    }

    for (key, body) in sections {
        out.push_str(&format!("\n## {key}\n\n"));
        for (field, value) in &body {
            out.push_str(&format!("- **{}:** {}\n", title_case(field), render_plain(value)));
        }
    }
    return out;
}

/// Render a document as TOON.
///
/// Header fields go in the overview block, map-valued extras become
/// `## Symbol:` sections. Other extras land in a plain `## Fields` section,
/// which does not map back to document fields when parsed. Multi-line strings
/// are folded onto one line with a warning per field.
pub fn document_to_toon(document: &Document) -> ConversionResult {
    let mut overview = String::new();
    let mut symbols = String::new();
    let mut loose = String::new();
    let mut warnings = Vec::new();

    for (key, value) in document.fields() {
        match (document.extra.contains_key(&key), value) {
            (true, Value::Map(body)) => {
                symbols.push_str(&format!("\n## Symbol: {key}\n\n"));
                for (field, inner) in &body {
                    let rendered = render_field(&format!("{key}.{field}"), inner, &mut warnings);
                    symbols.push_str(&format!("- {field}: {rendered}\n"));
                }
            },
            (true, other) => {
                let rendered = render_field(&key, &other, &mut warnings);
                loose.push_str(&format!("- {key}: {rendered}\n"));
            },
            (false, other) => {
                let rendered = render_field(&key, &other, &mut warnings);
                overview.push_str(&format!("- {key}: {rendered}\n"));
            },
        }
    }

    let title = document.name.as_deref().map_or_else(|| return UNTITLED.to_string(), fold_text);
    let mut out = format!("# {title}\n\n## {OVERVIEW_TITLE}\n\n{overview}");
    if !loose.is_empty() {
        out.push_str("\n## Fields\n\n");
        out.push_str(&loose);
    }
    out.push_str(&symbols);
    return finish(out, Format::Toon, warnings);
}

/// Wrap converted text in a [`ConversionResult`].
fn finish(content: String, format: Format, warnings: Vec<String>) -> ConversionResult {
    let tokens = CharRatioCounter.count(&content);
    debug!(format:% = format, tokens = tokens, warnings = warnings.len(); "conversion finished");
    return ConversionResult {
        content,
        format,
        tokens,
        warnings,
    };
}

/// Every string in `value` with its line breaks folded by [`fold_text`].
fn fold_line_breaks(value: &Value) -> Value {
    return match value {
        Value::String(s) if s.contains(['\n', '\r']) => Value::String(fold_text(s)),
        Value::List(items) => Value::List(items.iter().map(fold_line_breaks).collect()),
        other => other.clone(),
    };
}

/// Trimmed non-empty lines of `text`, joined by single spaces.
fn fold_text(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }
    return text
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| return !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
}

/// Convert plain Markdown to TOON.
///
/// The first header becomes the document title followed by an overview
/// block. `- Key: value` bullets become `- key: "value"` with normalized keys.
pub fn markdown_to_toon(markdown: &str) -> ConversionResult {
    let mut out = String::new();
    let mut warnings = Vec::new();
    let mut titled = false;

    for line in lexer::classify(markdown) {
        let trimmed = line.raw.trim();
        match line.kind {
            LineKind::Header { title, .. } if !titled => {
                out.push_str(&format!("# {title}\n\n## {OVERVIEW_TITLE}\n\n"));
                titled = true;
            },
            LineKind::Header { .. } | LineKind::Text => {
                out.push_str(trimmed);
                out.push('\n');
            },
            LineKind::Blank => out.push('\n'),
            LineKind::Bullet { raw } => {
                out.push_str(&markdown_bullet_to_toon(raw));
                out.push('\n');
            },
        }
    }

    if !titled {
        warnings.push(format!("no header found; added `# {UNTITLED}` and an overview block"));
        out = format!("# {UNTITLED}\n\n## {OVERVIEW_TITLE}\n\n{out}");
    }
    return finish(out, Format::Toon, warnings);
}

/// Rewrite one Markdown bullet as a TOON field, or pass it through.
fn markdown_bullet_to_toon(bullet: &str) -> String {
    let Some(caps) = MARKDOWN_FIELD.captures(bullet) else {
        return bullet.to_string();
    };
    let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
        return bullet.to_string();
    };
    let key = lexer::normalize_key(key.as_str());
    let value = value.as_str().trim();

    if value.starts_with("@ref") || value.starts_with('[') || value.starts_with('"') {
        return format!("- {key}: {value}");
    }
    return format!("- {key}: \"{value}\"");
}

/// A value as Markdown prose: strings bare, lists comma separated.
fn render_plain(value: &Value) -> String {
    return match value {
        Value::Bool(b) => b.to_string(),
        Value::List(items) => items.iter().map(render_plain).collect::<Vec<_>>().join(", "),
        Value::Map(map) => render_map_inline(map),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
    };
}

/// `{"k": v}` for maps nested below the level a bullet can express.
fn render_map_inline(map: &IndexMap<String, Value>) -> String {
    return serde_json::to_string(map).unwrap_or_default();
}

/// One field as TOON bullet text, noting in `warnings` when line breaks were folded.
fn render_field(path: &str, value: &Value, warnings: &mut Vec<String>) -> String {
    let folded = fold_line_breaks(value);
    if folded != *value {
        warnings.push(format!("`{path}` spans several lines and was folded onto one"));
    }
    return render_toon(&folded);
}

/// A value as TOON bullet text that parses back to the same value.
fn render_toon(value: &Value) -> String {
    return match value {
        Value::Bool(b) => b.to_string(),
        Value::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| return render_plain(item))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Map(map) => format!("\"{}\"", render_map_inline(map).replace('"', "'")),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.starts_with("@ref") => s.clone(),
        Value::String(s) => format!("\"{s}\""),
    };
}

/// `user_stories` -> `User Stories`.
fn title_case(key: &str) -> String {
    return key
        .split('_')
        .filter(|word| return !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            return chars.next().map_or_else(String::new, |first| {
                return first.to_uppercase().chain(chars).collect();
            });
        })
        .collect::<Vec<_>>()
        .join(" ");
}

/// Convert TOON to plain Markdown.
///
/// Drops the overview header, turns `- key: "value"` into `- **Key:** value`,
/// and titles the result with the `name` field.
pub fn toon_to_markdown(toon: &str) -> ConversionResult {
    let mut warnings = Vec::new();
    let title = NAME_FIELD
        .captures(toon)
        .and_then(|caps| return caps.get(1))
        .map(|m| return m.as_str().to_string())
        .unwrap_or_else(|| {
            warnings.push(format!("no `name` field found; titled the output `{UNTITLED}`"));
            return UNTITLED.to_string();
        });

    let mut body = String::new();
    for line in lexer::classify(toon) {
        match line.kind {
            LineKind::Header { level: 2, title } if title.eq_ignore_ascii_case(OVERVIEW_TITLE) => {},
            LineKind::Header { level: 1, .. } => {},
            LineKind::Bullet { raw } => {
                body.push_str(&toon_bullet_to_markdown(raw));
                body.push('\n');
            },
            LineKind::Blank => body.push('\n'),
            LineKind::Header { .. } | LineKind::Text => {
                body.push_str(line.raw.trim());
                body.push('\n');
            },
        }
    }

    return finish(format!("# {title}\n\n{}", body.trim_start_matches('\n')), Format::Markdown, warnings);
}

/// Rewrite one TOON field bullet for reading, or pass it through.
fn toon_bullet_to_markdown(bullet: &str) -> String {
    let Some((key, raw)) = lexer::split_bullet_field(bullet) else {
        return bullet.to_string();
    };
    return format!("- **{}:** {}", title_case(&key), lexer::unquote(raw));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn sample() -> Document {
        let mut body = IndexMap::new();
        body.insert("priority".to_string(), Value::from("high"));
        body.insert("phase".to_string(), Value::from("@ref(phase-1)"));

        let mut doc = Document {
            created_at: Some("2026-01-01T00:00:00.000Z".to_string()),
            description: Some("Login flows".to_string()),
            name: Some("auth".to_string()),
            status: Some("active".to_string()),
            tags: Some(vec!["security".to_string(), "web".to_string()]),
            version: Some("2.1.0".to_string()),
            ..Document::default()
        };
        doc.extra.insert("login".to_string(), Value::Map(body));
        return doc;
    }

    #[test]
    fn toon_rendering_round_trips_header_and_symbols() {
        let doc = sample();
        let rendered = document_to_toon(&doc);
        assert!(rendered.warnings.is_empty());
        let parsed = Parser::default().parse(&rendered.content);

        assert_eq!(parsed.document.name, doc.name);
        assert_eq!(parsed.document.description, doc.description);
        assert_eq!(parsed.document.version, doc.version);
        assert_eq!(parsed.document.status, doc.status);
        assert_eq!(parsed.document.created_at, doc.created_at);
        assert_eq!(parsed.document.tags, doc.tags);
        assert_eq!(parsed.document.extra.get("login"), doc.extra.get("login"));
        assert!(parsed.symbols.contains("login"));
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    }

    #[test]
    fn multi_line_values_are_folded_with_a_warning() {
        let mut doc = sample();
        doc.description = Some("line one\n  line two\r\n\nline three".to_string());
        let rendered = document_to_toon(&doc);

        assert_eq!(rendered.warnings, vec!["`description` spans several lines and was folded onto one".to_string()]);
        let parsed = Parser::default().parse(&rendered.content);
        assert_eq!(parsed.document.description.as_deref(), Some("line one line two line three"));
        assert_eq!(parsed.document.name, doc.name);
        assert_eq!(parsed.document.version, doc.version);
    }

    #[test]
    fn markdown_bullets_become_quoted_fields() {
        let result = markdown_to_toon("# Auth\n\n- Owner-Team: platform\n- Phase: @ref(p1)\nfree text\n");
        assert_eq!(result.format, Format::Toon);
        assert!(result.warnings.is_empty());
        assert!(result.content.starts_with("# Auth\n\n## Document Overview\n"));
        assert!(result.content.contains("- owner_team: \"platform\"\n"));
        assert!(result.content.contains("- phase: @ref(p1)\n"));
        assert!(result.content.contains("free text\n"));
    }

    #[test]
    fn markdown_without_header_gets_a_skeleton() {
        let result = markdown_to_toon("- a: b\n");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.content.starts_with("# Document\n\n## Document Overview\n"));
    }

    #[test]
    fn toon_to_markdown_titles_with_name() {
        let toon = "# X\n\n## Document Overview\n\n- name: \"auth\"\n- user_stories: [a, b]\n";
        let result = toon_to_markdown(toon);
        assert!(result.content.starts_with("# auth\n"));
        assert!(result.content.contains("- **Name:** auth\n"));
        assert!(result.content.contains("- **User Stories:** [a, b]\n"));
        assert!(!result.content.contains("Document Overview"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn same_format_passes_through() {
        let result = convert("# x\n", Format::Toon, Format::Toon);
        assert_eq!(result.content, "# x\n");
        assert_eq!(result.tokens, 1);
    }

    #[test]
    fn format_names() {
        assert_eq!("md".parse::<Format>().ok(), Some(Format::Markdown));
        assert_eq!("TOON".parse::<Format>().ok(), Some(Format::Toon));
        assert!(matches!("pdf".parse::<Format>(), Err(Error::UnknownFormat { .. })));
    }

    #[test]
    fn markdown_rendering_lists_fields_and_sections() {
        let text = document_to_markdown(&sample());
        assert!(text.starts_with("# auth\n\nLogin flows\n\n"));
        assert!(text.contains("- **Tags:** security, web\n"));
        assert!(text.contains("\n## login\n\n- **Priority:** high\n"));
    }
}
