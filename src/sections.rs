//! Section bodies: a line-state machine that turns bullet fields into values.
//!
//! Every header opens a section and closes the previous one. Within a section,
//! `- key: value` bullets fill an ordered body. Bullets indented past column 2
//! accumulate into a list under their key instead of overwriting it.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::lexer::{self, Line, LineKind};
use crate::parser::{IssueCode, Issues};
use crate::types::Value;

/// Indent columns at or below this are top-level bullets.
const MAX_FLAT_INDENT: usize = 2;

/// `Symbol: <id>` at the start of a section title, any case.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static TITLE_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(?i)^Symbol:\s*(\S+)").expect("valid regex"));

/// One header and the bullet fields below it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Parsed bullet fields in source order.
    pub body: IndexMap<String, Value>,
    /// Source line of each body key.
    #[serde(skip)]
    pub body_lines: IndexMap<String, u32>,
    /// Classification from the title.
    #[serde(rename = "type")]
    pub kind: SectionKind,
    /// Number of `#` characters.
    pub level: usize,
    /// One-based line of the header.
    pub line: u32,
    /// Symbol id from a `Symbol: <id>` title prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Header text without the `#` markers.
    pub title: String,
}

impl Section {
    /// Apply one bullet line to the body.
    fn apply_bullet(&mut self, line: &Line<'_>, bullet: &str, issues: &mut Issues) {
        let Some((key, raw)) = lexer::split_bullet_field(bullet) else {
            return;
        };
        let value = parse_value(raw, line.number, issues);

        if line.indent <= MAX_FLAT_INDENT {
            self.body_lines.insert(key.clone(), line.number);
            self.body.insert(key, value);
            return;
        }

        self.body_lines.entry(key.clone()).or_insert(line.number);
        match self.body.get_mut(&key) {
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::List(Vec::new()));
                *existing = Value::List(vec![first, value]);
            },
            None => {
                self.body.insert(key, Value::List(vec![value]));
            },
        }
        return;
    }

    /// Open a section from a header line.
    fn open(level: usize, title: &str, line: u32) -> Self {
        let symbol = TITLE_SYMBOL
            .captures(title)
            .and_then(|caps| return caps.get(1))
            .map(|m| return m.as_str().to_string());

        return Self {
            body: IndexMap::new(),
            body_lines: IndexMap::new(),
            kind: SectionKind::from_title(title),
            level,
            line,
            symbol,
            title: title.to_string(),
        };
    }
}

/// Section classification from title keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    /// Title mentions "acceptance criteria".
    AcceptanceCriteria,
    /// Title mentions "feature".
    Feature,
    /// Title mentions "phase".
    Phase,
    /// Title mentions "release".
    Release,
    /// No keyword matched.
    Section,
    /// Title mentions "success criteria".
    SuccessCriteria,
    /// Title mentions "timeline".
    Timeline,
    /// Title mentions "user story".
    UserStory,
}

impl SectionKind {
    /// Keyword lookup in priority order.
    fn from_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        let table = [
            ("phase", Self::Phase),
            ("feature", Self::Feature),
            ("user story", Self::UserStory),
            ("acceptance criteria", Self::AcceptanceCriteria),
            ("timeline", Self::Timeline),
            ("release", Self::Release),
            ("success criteria", Self::SuccessCriteria),
        ];
        return table
            .into_iter()
            .find(|(keyword, _)| return lower.contains(keyword))
            .map_or(Self::Section, |(_, kind)| return kind);
    }
}

/// Parser state: whether a section is open.
enum State {
    /// No header seen yet. Bullets here are ignored.
    BeforeFirstHeader,
    /// Inside a section.
    Open(Section),
}

/// Walk classified lines and collect every section in source order.
pub(crate) fn parse_sections(lines: &[Line<'_>], issues: &mut Issues) -> Vec<Section> {
    let mut done = Vec::new();
    let mut state = State::BeforeFirstHeader;

    for line in lines {
        match line.kind {
            LineKind::Header { level, title } => {
                let next = State::Open(Section::open(level, title, line.number));
                if let State::Open(finished) = std::mem::replace(&mut state, next) {
                    done.push(finished);
                }
            },
            LineKind::Bullet { raw } => {
                if let State::Open(section) = &mut state {
                    section.apply_bullet(line, raw, issues);
                }
            },
            LineKind::Blank | LineKind::Text => {},
        }
    }

    if let State::Open(last) = state {
        done.push(last);
    }
    return done;
}

/// Turn a raw bullet value into a typed [`Value`].
///
/// In order: `@ref` values stay verbatim, `[...]` becomes a list of unquoted
/// strings, `true`/`false` become booleans, finite numbers become numbers, and
/// anything else is a string with one layer of quotes removed. An unterminated
/// `[` raises a `MALFORMED_LIST` warning and falls through to the later rules.
pub fn parse_value(raw: &str, line: u32, issues: &mut Issues) -> Value {
    let raw = raw.trim();

    if raw.starts_with("@ref") {
        return Value::String(raw.to_string());
    }

    if raw.starts_with('[') {
        if raw.ends_with(']') {
            return Value::List(lexer::parse_list_items(raw).into_iter().map(Value::String).collect());
        }
        issues.warning(
            IssueCode::MalformedList,
            line,
            format!("list value `{raw}` is missing a closing `]`; kept as a string"),
        );
    }

    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {},
    }

    if let Ok(number) = raw.parse::<f64>()
        && number.is_finite()
    {
        return Value::Number(number);
    }

    return Value::String(lexer::unquote(raw).to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections_of(text: &str) -> (Vec<Section>, Issues) {
        let mut issues = Issues::default();
        let sections = parse_sections(&lexer::classify(text), &mut issues);
        return (sections, issues);
    }

    fn value(raw: &str) -> Value {
        return parse_value(raw, 1, &mut Issues::default());
    }

    #[test]
    fn value_rules_apply_in_order() {
        assert_eq!(value("@ref(x)"), Value::from("@ref(x)"));
        assert_eq!(value("[a, 'b']"), Value::from(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(value("true"), Value::Bool(true));
        assert_eq!(value("42"), Value::Number(42.0));
        assert_eq!(value("-1.5e2"), Value::Number(-150.0));
        assert_eq!(value("\"42\""), Value::from("42"));
        assert_eq!(value("inf"), Value::from("inf"));
        assert_eq!(value("\"1.0.0\""), Value::from("1.0.0"));
    }

    #[test]
    fn unterminated_list_warns() {
        let mut issues = Issues::default();
        let parsed = parse_value("[a, b", 9, &mut issues);
        assert_eq!(parsed, Value::from("[a, b"));
        assert_eq!(issues.warnings.first().map(|w| (w.code, w.line)), Some((IssueCode::MalformedList, 9)));
    }

    #[test]
    fn sections_track_symbol_kind_and_lines() {
        let text = "# Doc\n- ignored: 1\n## Symbol: feature-a\n- depends_on: @ref(feature-b)\n- Effort-Estimate: \"2w\"\n## Timeline\n";
        let (sections, _) = sections_of(text);

        assert_eq!(sections.len(), 3);
        let doc = sections.first().unwrap();
        assert_eq!(doc.body.get("ignored"), Some(&Value::Number(1.0)));

        let feature = sections.get(1).unwrap();
        assert_eq!(feature.symbol.as_deref(), Some("feature-a"));
        assert_eq!(feature.kind, SectionKind::Feature);
        assert_eq!(feature.line, 3);
        assert_eq!(feature.body.get("depends_on"), Some(&Value::from("@ref(feature-b)")));
        assert_eq!(feature.body.get("effort_estimate"), Some(&Value::from("2w")));
        assert_eq!(feature.body_lines.get("depends_on"), Some(&4));

        assert_eq!(sections.get(2).map(|s| s.kind), Some(SectionKind::Timeline));
    }

    #[test]
    fn bullets_before_first_header_are_ignored() {
        let (sections, _) = sections_of("- name: \"x\"\n");
        assert!(sections.is_empty());
    }

    #[test]
    fn deep_bullets_append_and_promote_scalars() {
        let text = "## Symbol: s\n- steps: \"one\"\n    - steps: \"two\"\n    - steps: \"three\"\n    - extra: true\n";
        let (sections, _) = sections_of(text);
        let body = &sections.first().unwrap().body;

        assert_eq!(
            body.get("steps"),
            Some(&Value::List(vec![Value::from("one"), Value::from("two"), Value::from("three")]))
        );
        assert_eq!(body.get("extra"), Some(&Value::List(vec![Value::Bool(true)])));
    }

    #[test]
    fn success_criteria_and_default_kinds() {
        assert_eq!(SectionKind::from_title("Success Criteria"), SectionKind::SuccessCriteria);
        assert_eq!(SectionKind::from_title("Phase 1 Success Criteria"), SectionKind::Phase);
        assert_eq!(SectionKind::from_title("Notes"), SectionKind::Section);
    }
}
