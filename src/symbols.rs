//! `## Symbol: <id>` extraction and advisory type inference.

use std::sync::LazyLock;

use log::trace;
use regex::Regex;

use crate::lexer::Line;
use crate::parser::{IssueCode, Issues};
use crate::types::{Symbol, SymbolKind, SymbolTable};

/// Lines scanned on each side of a symbol header for type hints.
const CONTEXT_WINDOW: usize = 5;

/// A symbol marker line. Matched against the raw line, not the trimmed one.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static SYMBOL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^## Symbol: (\S+)\s*$").expect("valid regex"));

/// Build the symbol table from classified lines.
///
/// Later definitions of an id replace earlier ones in place; each replacement
/// records a `DUPLICATE_SYMBOL` warning naming both lines.
pub(crate) fn extract(lines: &[Line<'_>], issues: &mut Issues) -> SymbolTable {
    let mut table = SymbolTable::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(id) = SYMBOL_MARKER
            .captures(line.raw)
            .and_then(|caps| return caps.get(1))
            .map(|m| return m.as_str())
        else {
            continue;
        };

        let kind = infer_kind(lines, idx);
        trace!(symbol = id, line = line.number, kind = kind.as_str(); "found symbol");

        let previous = table.insert(Symbol {
            content: None,
            kind,
            line: line.number,
            symbol: id.to_string(),
        });
        if let Some(previous) = previous {
            issues.warning(
                IssueCode::DuplicateSymbol,
                line.number,
                format!(
                    "symbol `{id}` defined on line {} is redefined on line {}; the later definition wins",
                    previous.line, line.number
                ),
            );
        }
    }

    return table;
}

/// Classify a symbol by keywords in the lines around its header.
///
/// Best effort only. Nothing downstream depends on the result.
fn infer_kind(lines: &[Line<'_>], idx: usize) -> SymbolKind {
    let start = idx.saturating_sub(CONTEXT_WINDOW);
    let end = idx.saturating_add(CONTEXT_WINDOW).saturating_add(1).min(lines.len());
    let context = lines
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .map(|l| return l.raw)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    return kind_from_context(&context);
}

/// Keyword lookup in priority order.
pub(crate) fn kind_from_context(context: &str) -> SymbolKind {
    if context.contains("phase") {
        return SymbolKind::Phase;
    }
    if context.contains("feature") {
        return SymbolKind::Feature;
    }
    if context.contains("user story") || context.contains("given") {
        return SymbolKind::UserStory;
    }
    if context.contains("acceptance criteria") {
        return SymbolKind::AcceptanceCriteria;
    }
    if context.contains("timeline") {
        return SymbolKind::Timeline;
    }
    if context.contains("release") {
        return SymbolKind::Release;
    }
    return SymbolKind::Document;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn extract_from(text: &str) -> (SymbolTable, Issues) {
        let mut issues = Issues::default();
        let table = extract(&lexer::classify(text), &mut issues);
        return (table, issues);
    }

    #[test]
    fn records_true_line_numbers() {
        let (table, _) = extract_from("# Doc\n\n## Symbol: alpha\n- x: 1\n");
        assert_eq!(table.get("alpha").map(|s| s.line), Some(3));
    }

    #[test]
    fn infers_kind_from_nearby_text() {
        let text = "# Doc\n\n## Symbol: checkout\n- summary: \"Given a cart\"\n";
        let (table, _) = extract_from(text);
        assert_eq!(table.get("checkout").map(|s| s.kind), Some(SymbolKind::UserStory));
    }

    #[test]
    fn phase_keyword_wins_over_feature() {
        assert_eq!(kind_from_context("feature list for phase one"), SymbolKind::Phase);
        assert_eq!(kind_from_context("nothing to see"), SymbolKind::Document);
    }

    #[test]
    fn window_is_bounded() {
        let mut text = String::from("# Release notes\n");
        for _ in 0..10 {
            text.push_str("filler\n");
        }
        text.push_str("## Symbol: far\n");
        let (table, _) = extract_from(&text);
        assert_eq!(table.get("far").map(|s| s.kind), Some(SymbolKind::Document));
    }

    #[test]
    fn marker_requires_exact_prefix() {
        let (table, _) = extract_from("### Symbol: deep\n##Symbol: tight\n  ## Symbol: indented\n");
        assert!(table.is_empty());
    }

    #[test]
    fn duplicates_warn_and_last_wins() {
        let (table, issues) = extract_from("## Symbol: a\n- x: 1\n## Symbol: a\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").map(|s| s.line), Some(3));

        let warning = issues.warnings.first().unwrap();
        assert_eq!(warning.code, IssueCode::DuplicateSymbol);
        assert_eq!(warning.line, 3);
        assert!(warning.message.contains("line 1"));
    }
}
