//! Document Overview parsing: the top-level metadata block of a TOON document.

use indexmap::IndexMap;

use crate::lexer::{self, Line, LineKind};
use crate::parser::{IssueCode, Issues};

/// Header fields as written. No defaults are applied here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// `created_at`, unquoted.
    pub created_at: Option<String>,
    /// `description`, unquoted.
    pub description: Option<String>,
    /// Source line of each recognized field, keyed by field name.
    pub lines: IndexMap<String, u32>,
    /// `name`, unquoted.
    pub name: Option<String>,
    /// Line of the overview header itself, if one was found.
    pub overview_line: Option<u32>,
    /// `status`, unquoted.
    pub status: Option<String>,
    /// `tags`, split from bracket list syntax.
    pub tags: Option<Vec<String>>,
    /// `updated_at`, unquoted.
    pub updated_at: Option<String>,
    /// `version`, unquoted.
    pub version: Option<String>,
}

impl Header {
    /// Store one recognized field. Returns `false` for keys the header ignores.
    fn set(&mut self, key: &str, raw: &str) -> bool {
        let value = Some(lexer::unquote(raw).to_string());
        match key {
            "created_at" => self.created_at = value,
            "description" => self.description = value,
            "name" => self.name = value,
            "status" => self.status = value,
            "tags" => self.tags = Some(lexer::parse_list_items(raw)),
            "updated_at" => self.updated_at = value,
            "version" => self.version = value,
            _ => return false,
        }
        return true;
    }
}

/// Whether a header title names the overview block.
fn is_overview(title: &str) -> bool {
    return title.to_lowercase().contains("overview");
}

/// Parse the overview block out of classified lines.
///
/// Starts after the first header whose title contains "overview" and stops at
/// the next header that does not. In strict mode a missing `name` records a
/// `MISSING_REQUIRED_FIELD` error at the overview line (0 without one).
pub(crate) fn parse_header(lines: &[Line<'_>], strict: bool, issues: &mut Issues) -> Header {
    let mut header = Header::default();
    let mut in_overview = false;

    for line in lines {
        match line.kind {
            LineKind::Header { title, .. } if is_overview(title) => {
                if header.overview_line.is_none() {
                    header.overview_line = Some(line.number);
                }
                in_overview = true;
            },
            LineKind::Header { .. } if in_overview => break,
            LineKind::Bullet { raw } if in_overview => {
                let Some((key, value)) = lexer::split_bullet_field(raw) else {
                    continue;
                };
                if header.set(&key, value) {
                    header.lines.insert(key, line.number);
                }
            },
            LineKind::Blank | LineKind::Bullet { .. } | LineKind::Header { .. } | LineKind::Text => {},
        }
    }

    if strict && header.name.is_none() {
        issues.error(
            IssueCode::MissingRequiredField,
            header.overview_line.unwrap_or(0),
            "document name is required in the overview section",
        );
    }

    return header;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, strict: bool) -> (Header, Issues) {
        let mut issues = Issues::default();
        let header = parse_header(&lexer::classify(text), strict, &mut issues);
        return (header, issues);
    }

    #[test]
    fn reads_known_fields_with_lines() {
        let text = "# Doc\n\n## Document Overview\n\n- name: \"demo\"\n- Created-At: \"2026-01-01T00:00:00Z\"\n- tags: [a, \"b\"]\n- owner: \"ignored\"\n";
        let (header, issues) = parse(text, true);

        assert_eq!(header.name.as_deref(), Some("demo"));
        assert_eq!(header.created_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(header.tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(header.overview_line, Some(3));
        assert_eq!(header.lines.get("name"), Some(&5));
        assert_eq!(header.lines.get("tags"), Some(&7));
        assert!(!header.lines.contains_key("owner"));
        assert!(issues.errors.is_empty());
    }

    #[test]
    fn stops_at_next_non_overview_header() {
        let text = "## Overview\n- name: \"a\"\n## Symbol: x\n- description: \"not header\"\n";
        let (header, _) = parse(text, true);
        assert_eq!(header.name.as_deref(), Some("a"));
        assert_eq!(header.description, None);
    }

    #[test]
    fn strict_mode_requires_name() {
        let (_, issues) = parse("# Doc\n## Document Overview\n- version: \"1.0.0\"\n", true);
        let codes: Vec<_> = issues.errors.iter().map(|e| (e.code, e.line)).collect();
        assert_eq!(codes, vec![(IssueCode::MissingRequiredField, 2)]);

        let (_, lenient) = parse("# Doc\n", false);
        assert!(lenient.errors.is_empty());
    }

    #[test]
    fn bullets_outside_overview_are_ignored() {
        let (header, issues) = parse("- name: \"early\"\n# Doc\n", true);
        assert_eq!(header.name, None);
        assert_eq!(issues.errors.first().map(|e| e.line), Some(0));
    }
}
