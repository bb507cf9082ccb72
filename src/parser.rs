//! TOON text to [`Document`] plus [`SymbolTable`].
//!
//! Parsing never fails. Structural problems are collected as [`ParseIssue`]s
//! on the result. Oversized input is the one case that yields an empty
//! document.

use chrono::{SecondsFormat, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{self, Document};
use crate::lexer::{self, Line, LineKind};
use crate::sections::{self, Section};
use crate::tokens::{CharRatioCounter, TokenCounter};
use crate::types::{SymbolTable, Value};
use crate::{header, symbols};

/// Default input size limit in bytes.
pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024;

/// Closed set of parse issue codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// A `## Symbol:` id was defined more than once.
    DuplicateSymbol,
    /// Input exceeds the configured size limit.
    FileTooLarge,
    /// A `[` list value has no closing `]`.
    MalformedList,
    /// A required header field is absent.
    MissingRequiredField,
    /// The text has no header line at all.
    NoHeader,
    /// No header title contains "overview".
    NoOverview,
    /// A symbol id collides with a header field name.
    SymbolShadowsField,
}

impl IssueCode {
    /// The SCREAMING_SNAKE name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            IssueCode::DuplicateSymbol => "DUPLICATE_SYMBOL",
            IssueCode::FileTooLarge => "FILE_TOO_LARGE",
            IssueCode::MalformedList => "MALFORMED_LIST",
            IssueCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            IssueCode::NoHeader => "NO_HEADER",
            IssueCode::NoOverview => "NO_OVERVIEW",
            IssueCode::SymbolShadowsField => "SYMBOL_SHADOWS_FIELD",
        };
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// Errors and warnings collected while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issues {
    /// Problems that make the parse incomplete.
    pub errors: Vec<ParseIssue>,
    /// Problems worth reporting that do not lose data.
    pub warnings: Vec<ParseIssue>,
}

impl Issues {
    /// Record an error.
    pub(crate) fn error(&mut self, code: IssueCode, line: u32, message: impl Into<String>) {
        self.errors.push(ParseIssue {
            code,
            line,
            message: message.into(),
        });
    }

    /// Record a warning.
    pub(crate) fn warning(&mut self, code: IssueCode, line: u32, message: impl Into<String>) {
        self.warnings.push(ParseIssue {
            code,
            line,
            message: message.into(),
        });
    }
}

/// Facts about the parse itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseMetadata {
    /// Number of `\n`-separated lines.
    pub line_count: usize,
    /// When the parse ran, RFC 3339 in UTC.
    pub parsed_at: String,
    /// Estimated tokens in the input.
    pub token_count: usize,
}

/// One structural problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    /// Machine-readable code.
    pub code: IssueCode,
    /// One-based source line, 0 when the issue concerns the whole input.
    pub line: u32,
    /// Human-readable description.
    pub message: String,
}

/// Parser tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Inputs longer than this many bytes are rejected.
    pub max_file_size: usize,
    /// Require `name` in the overview.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        return Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            strict: true,
        };
    }
}

/// Everything a parse produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    /// The assembled document.
    pub document: Document,
    /// Structural errors.
    pub errors: Vec<ParseIssue>,
    /// Facts about the parse.
    pub metadata: ParseMetadata,
    /// Symbols with their section bodies attached.
    pub symbols: SymbolTable,
    /// Structural warnings.
    pub warnings: Vec<ParseIssue>,
}

/// Parses TOON text. Construct one and reuse it; it holds no per-parse state.
pub struct Parser {
    /// Fills `metadata.token_count`.
    counter: Box<dyn TokenCounter + Send + Sync>,
    /// Size limit and strictness.
    options: ParseOptions,
}

impl Default for Parser {
    fn default() -> Self {
        return Self::new(ParseOptions::default());
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.debug_struct("Parser").field("options", &self.options).finish_non_exhaustive();
    }
}

impl Parser {
    /// The token counter used for `metadata.token_count`.
    pub fn counter(&self) -> &(dyn TokenCounter + Send + Sync) {
        return self.counter.as_ref();
    }

    /// Symbol table for `text`, with section bodies attached as content.
    ///
    /// Oversized input yields an empty table.
    pub fn extract_symbols(&self, text: &str) -> SymbolTable {
        if self.is_oversized(text) {
            return SymbolTable::new();
        }
        let lines = lexer::classify(text);
        let (symbols, _) = analyze(&lines, &mut Issues::default());
        return symbols;
    }

    /// Whether `text` exceeds the size limit.
    const fn is_oversized(&self, text: &str) -> bool {
        return text.len() > self.options.max_file_size;
    }

    /// Parser with the default character-ratio token counter.
    pub fn new(options: ParseOptions) -> Self {
        return Self::with_counter(options, Box::new(CharRatioCounter));
    }

    /// The options this parser was built with.
    pub const fn options(&self) -> &ParseOptions {
        return &self.options;
    }

    /// Parse a whole TOON document.
    pub fn parse(&self, text: &str) -> ParseResult {
        let parsed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        if self.is_oversized(text) {
            debug!(size = text.len(), max = self.options.max_file_size; "input exceeds size limit");
            let mut issues = Issues::default();
            issues.error(
                IssueCode::FileTooLarge,
                0,
                format!(
                    "input is {} bytes, which exceeds the limit of {} bytes",
                    text.len(),
                    self.options.max_file_size
                ),
            );
            return ParseResult {
                document: Document::default(),
                errors: issues.errors,
                metadata: ParseMetadata {
                    line_count: 0,
                    parsed_at,
                    token_count: 0,
                },
                symbols: SymbolTable::new(),
                warnings: issues.warnings,
            };
        }

        let lines = lexer::classify(text);
        let mut issues = Issues::default();
        let header = header::parse_header(&lines, self.options.strict, &mut issues);
        let (symbols, sections) = analyze(&lines, &mut issues);
        let document = document::assemble(header, sections, &parsed_at, &mut issues);

        debug!(
            lines = lines.len(),
            symbols = symbols.len(),
            errors = issues.errors.len(),
            warnings = issues.warnings.len();
            "parsed document"
        );

        return ParseResult {
            document,
            errors: issues.errors,
            metadata: ParseMetadata {
                line_count: lines.len(),
                parsed_at,
                token_count: self.counter.count(text),
            },
            symbols,
            warnings: issues.warnings,
        };
    }

    /// Cheap pre-check: is there a header, and an overview section.
    pub fn validate_structure(&self, text: &str) -> StructureReport {
        let lines = lexer::classify(text);
        let mut issues = Issues::default();

        if !lines.iter().any(|l| return matches!(l.kind, LineKind::Header { .. })) {
            issues.error(IssueCode::NoHeader, 0, "document must start with a `#` header");
        }
        let has_overview = lines
            .iter()
            .filter_map(Line::header_title)
            .any(|title| return title.to_lowercase().contains("overview"));
        if !has_overview {
            issues.warning(IssueCode::NoOverview, 0, "document should have a `## Document Overview` section");
        }

        return StructureReport {
            valid: issues.errors.is_empty(),
            errors: issues.errors,
            warnings: issues.warnings,
        };
    }

    /// Parser with a caller-supplied token counter.
    pub fn with_counter(options: ParseOptions, counter: Box<dyn TokenCounter + Send + Sync>) -> Self {
        return Self { counter, options };
    }
}

/// Result of [`Parser::validate_structure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    /// Structural errors.
    pub errors: Vec<ParseIssue>,
    /// `true` when `errors` is empty.
    pub valid: bool,
    /// Structural warnings.
    pub warnings: Vec<ParseIssue>,
}

/// Extract symbols and sections, then attach each symbol's section body.
fn analyze(lines: &[Line<'_>], issues: &mut Issues) -> (SymbolTable, Vec<Section>) {
    let mut symbols = symbols::extract(lines, issues);
    let sections = sections::parse_sections(lines, issues);

    for section in &sections {
        let Some(id) = section.symbol.as_deref() else {
            continue;
        };
        if let Some(symbol) = symbols.get_mut(id) {
            symbol.content = Some(Value::Map(section.body.clone()));
        }
    }

    return (symbols, sections);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_input_yields_single_error_and_empty_result() {
        let parser = Parser::new(ParseOptions {
            max_file_size: 8,
            strict: true,
        });
        let result = parser.parse("# a longer document");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors.first().map(|e| e.code), Some(IssueCode::FileTooLarge));
        assert!(result.document.is_empty());
        assert!(result.symbols.is_empty());
        assert_eq!(result.metadata.line_count, 0);
        assert!(parser.extract_symbols("## Symbol: abcdefgh").is_empty());
    }

    #[test]
    fn metadata_counts_lines_and_tokens() {
        let result = Parser::default().parse("# T\n## Overview\n- name: \"n\"\n");
        assert_eq!(result.metadata.line_count, 4);
        assert_eq!(result.metadata.token_count, 7);
        assert!(result.metadata.parsed_at.contains('T'));
    }

    #[test]
    fn symbols_carry_their_section_body() {
        let table = Parser::default().extract_symbols("# Doc\n## Symbol: a\n- next: @ref(b)\n");
        let content = table.get("a").and_then(|s| s.content.clone()).unwrap();
        let body = content.as_map().unwrap();
        assert_eq!(body.get("next"), Some(&Value::from("@ref(b)")));
    }

    #[test]
    fn structure_check_reports_missing_header_and_overview() {
        let parser = Parser::default();

        let bare = parser.validate_structure("just text");
        assert!(!bare.valid);
        assert_eq!(bare.errors.first().map(|e| e.code), Some(IssueCode::NoHeader));
        assert_eq!(bare.warnings.first().map(|w| w.code), Some(IssueCode::NoOverview));

        let good = parser.validate_structure("# T\n## Document Overview\n");
        assert!(good.valid);
        assert!(good.warnings.is_empty());
    }

    #[test]
    fn issue_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&IssueCode::SymbolShadowsField).unwrap();
        assert_eq!(json, "\"SYMBOL_SHADOWS_FIELD\"");
        assert_eq!(IssueCode::NoOverview.to_string(), "NO_OVERVIEW");
    }

    #[test]
    fn lenient_mode_skips_name_requirement() {
        let strict = Parser::default().parse("# T\n");
        assert_eq!(strict.errors.first().map(|e| e.code), Some(IssueCode::MissingRequiredField));

        let lenient = Parser::new(ParseOptions {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            strict: false,
        });
        assert!(lenient.parse("# T\n").errors.is_empty());
    }
}
