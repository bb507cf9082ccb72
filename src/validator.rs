//! Schema validation and reference validation for assembled documents.
//!
//! Results are values, never errors. `valid` is derived from the error list
//! when a result is built and cannot drift from it afterwards.

use std::collections::BTreeSet;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::resolver::{self, CircularChain, ResolvedDocument, Resolver, ResolverOptions};
use crate::schema::{Schema, SchemaRegistry};
use crate::types::SymbolTable;

/// Coarse document classification that selects extra schema rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    /// Component and system architecture.
    Architecture,
    /// Module-level implementation design.
    DetailedDesign,
    /// Functional requirements and user stories. The fallback type.
    Requirements,
    /// Phases and release planning.
    Roadmap,
    /// Test cases.
    TestSpecification,
}

impl DocumentType {
    /// Kebab-case name used on the command line and in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            DocumentType::Architecture => "architecture",
            DocumentType::DetailedDesign => "detailed-design",
            DocumentType::Requirements => "requirements",
            DocumentType::Roadmap => "roadmap",
            DocumentType::TestSpecification => "test-specification",
        };
    }

    /// Guess the type from keywords in the document's JSON form.
    ///
    /// Checked in order; the first hit wins and `requirements` is the default.
    pub fn detect(document: &Document) -> Self {
        let content = serde_json::to_string(document).unwrap_or_default().to_lowercase();
        let table = [
            (&["functional requirements", "user stories"], DocumentType::Requirements),
            (&["component", "architecture"], DocumentType::Architecture),
            (&["implementation", "detailed design"], DocumentType::DetailedDesign),
            (&["test case", "test specification"], DocumentType::TestSpecification),
            (&["phase", "roadmap"], DocumentType::Roadmap),
        ];
        return table
            .into_iter()
            .find(|(keywords, _)| return keywords.iter().any(|k| return content.contains(k)))
            .map_or(DocumentType::Requirements, |(_, kind)| return kind);
    }
}

impl FromStr for DocumentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
            "architecture" => Ok(DocumentType::Architecture),
            "detailed-design" => Ok(DocumentType::DetailedDesign),
            "requirements" => Ok(DocumentType::Requirements),
            "roadmap" => Ok(DocumentType::Roadmap),
            "test-specification" => Ok(DocumentType::TestSpecification),
            _ => Err(()),
        };
    }
}

/// The closed set of validation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A reference cycle among symbols.
    CircularReference,
    /// Value not in the allowed set.
    InvalidEnum,
    /// Pattern, length, datetime, list size, date ordering, or reference syntax.
    InvalidFormat,
    /// Wrong value shape, e.g. a number where a string is expected.
    InvalidType,
    /// Required field absent or empty.
    MissingRequiredField,
    /// Reference to a symbol that does not exist.
    RefNotFound,
}

impl ErrorCode {
    /// The SCREAMING_SNAKE name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            ErrorCode::CircularReference => "CIRCULAR_REFERENCE",
            ErrorCode::InvalidEnum => "INVALID_ENUM",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::InvalidType => "INVALID_TYPE",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::RefNotFound => "REF_NOT_FOUND",
        };
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// Outcome of [`Validator::validate_references`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceValidationResult {
    /// Cycles found among symbols.
    circular_chains: Vec<CircularChain>,
    /// Unresolved references and cycles.
    errors: Vec<ValidationError>,
    /// Reference counts.
    summary: ReferenceSummary,
    /// `true` when `errors` is empty.
    valid: bool,
    /// Legacy syntax notices.
    warnings: Vec<ValidationError>,
}

impl ReferenceValidationResult {
    /// Cycles found among symbols. Each one also appears in `errors`.
    pub fn circular_chains(&self) -> &[CircularChain] {
        return &self.circular_chains;
    }

    /// Unresolved references and cycles.
    pub fn errors(&self) -> &[ValidationError] {
        return &self.errors;
    }

    /// Whether no reference error was found.
    pub const fn is_valid(&self) -> bool {
        return self.valid;
    }

    /// Reference counts.
    pub const fn summary(&self) -> &ReferenceSummary {
        return &self.summary;
    }

    /// Legacy syntax notices.
    pub fn warnings(&self) -> &[ValidationError] {
        return &self.warnings;
    }
}

/// Reference counts for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceSummary {
    /// Occurrences that name a known symbol.
    pub resolved_references: usize,
    /// All occurrences.
    pub total_references: usize,
    /// Occurrences that name an unknown symbol.
    pub unresolved_references: usize,
}

/// How serious a [`ValidationError`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the result invalid.
    Error,
    /// Reported but does not affect validity.
    Warning,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Dotted path of the offending field.
    pub field: String,
    /// Source line, when the document was parsed from text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Human-readable description.
    pub message: String,
    /// Error or warning.
    pub severity: Severity,
}

impl ValidationError {
    /// An error-severity finding.
    pub(crate) fn error(code: ErrorCode, field: &str, line: Option<u32>, message: String) -> Self {
        return Self {
            code,
            field: field.to_string(),
            line,
            message,
            severity: Severity::Error,
        };
    }

    /// A warning-severity finding.
    pub(crate) fn warning(code: ErrorCode, field: &str, line: Option<u32>, message: String) -> Self {
        return Self {
            severity: Severity::Warning,
            ..Self::error(code, field, line, message)
        };
    }
}

/// Outcome of [`Validator::validate`] and [`Validator::validate_type`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Findings that make the document invalid.
    errors: Vec<ValidationError>,
    /// Field counts.
    summary: ValidationSummary,
    /// `true` when `errors` is empty.
    valid: bool,
    /// Findings that do not affect validity.
    warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Findings that make the document invalid.
    pub fn errors(&self) -> &[ValidationError] {
        return &self.errors;
    }

    /// Build a result for `document`, deriving validity and the summary.
    fn for_document(document: &Document, errors: Vec<ValidationError>, warnings: Vec<ValidationError>) -> Self {
        let total_fields = document.fields().len();
        let top_level = |e: &ValidationError| return e.field.split('.').next().unwrap_or_default().to_string();

        let invalid: BTreeSet<String> = errors
            .iter()
            .filter(|e| return e.code != ErrorCode::MissingRequiredField)
            .map(top_level)
            .collect();
        let missing: BTreeSet<&str> = errors
            .iter()
            .filter(|e| return e.code == ErrorCode::MissingRequiredField)
            .map(|e| return e.field.as_str())
            .collect();

        let summary = ValidationSummary {
            invalid_fields: invalid.len(),
            missing_fields: missing.len(),
            total_fields,
            valid_fields: total_fields.saturating_sub(invalid.len()),
        };
        return Self {
            valid: errors.is_empty(),
            errors,
            summary,
            warnings,
        };
    }

    /// Whether no error was found.
    pub const fn is_valid(&self) -> bool {
        return self.valid;
    }

    /// Field counts.
    pub const fn summary(&self) -> &ValidationSummary {
        return &self.summary;
    }

    /// Findings that do not affect validity.
    pub fn warnings(&self) -> &[ValidationError] {
        return &self.warnings;
    }
}

/// Field counts for one validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    /// Distinct top-level fields with a non-missing error.
    pub invalid_fields: usize,
    /// Distinct field paths reported missing or empty.
    pub missing_fields: usize,
    /// Top-level fields present on the document.
    pub total_fields: usize,
    /// `total_fields - invalid_fields`.
    pub valid_fields: usize,
}

/// Validates documents against schemas and symbol tables.
///
/// Holds its schema registry and a resolver; no state changes between calls.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Schemas by document and record type.
    registry: SchemaRegistry,
    /// Used for reference extraction and cycle detection.
    resolver: Resolver,
}

impl Validator {
    /// Check a document against one schema, using its source lines.
    fn check_schema(document: &Document, schema: &Schema, errors: &mut Vec<ValidationError>) {
        schema.check(&document.fields(), "", &document.locations, errors);
    }

    /// Validator with explicit resolver options.
    pub fn new(options: ResolverOptions) -> Self {
        return Self {
            registry: SchemaRegistry::default(),
            resolver: Resolver::new(options),
        };
    }

    /// The schemas this validator checks against.
    pub const fn registry(&self) -> &SchemaRegistry {
        return &self.registry;
    }

    /// Reference findings for `document`, given the cycles already found in it.
    fn report_references(
        document: &Document,
        symbols: &SymbolTable,
        circular_chains: Vec<CircularChain>,
    ) -> ReferenceValidationResult {
        let occurrences = resolver::reference_occurrences(document);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut unresolved = 0_usize;

        for occurrence in &occurrences {
            if occurrence.legacy {
                warnings.push(ValidationError::warning(
                    ErrorCode::InvalidFormat,
                    &occurrence.field,
                    occurrence.line,
                    format!(
                        "legacy reference syntax `@ref:{id}`; write `@ref({id})` instead",
                        id = occurrence.id
                    ),
                ));
            }
            if !symbols.contains(&occurrence.id) {
                unresolved = unresolved.saturating_add(1);
                errors.push(ValidationError::error(
                    ErrorCode::RefNotFound,
                    &occurrence.field,
                    occurrence.line,
                    format!("unresolved reference `@ref({})`", occurrence.id),
                ));
            }
        }

        for chain in &circular_chains {
            errors.push(ValidationError::error(
                ErrorCode::CircularReference,
                chain.symbols.first().map_or("", String::as_str),
                chain.cycle_detected_at,
                format!("circular reference: {}", chain.symbols.join(" -> ")),
            ));
        }

        let total = occurrences.len();
        return ReferenceValidationResult {
            circular_chains,
            valid: errors.is_empty(),
            errors,
            summary: ReferenceSummary {
                resolved_references: total.saturating_sub(unresolved),
                total_references: total,
                unresolved_references: unresolved,
            },
            warnings,
        };
    }

    /// The resolver used for cycle detection.
    pub const fn resolver(&self) -> &Resolver {
        return &self.resolver;
    }

    /// Base rules, then the rules of the detected document type.
    pub fn validate(&self, document: &Document) -> ValidationResult {
        let kind = DocumentType::detect(document);
        debug!(document_type = kind.as_str(); "validating document");

        let mut errors = Vec::new();
        Self::check_schema(document, self.registry.base(), &mut errors);
        if let Some(schema) = self.registry.document(kind) {
            Self::check_schema(document, schema, &mut errors);
        }
        return ValidationResult::for_document(document, errors, Vec::new());
    }

    /// Unresolved references, legacy syntax, and cycles.
    pub fn validate_references(&self, document: &Document, symbols: &SymbolTable) -> ReferenceValidationResult {
        let circular_chains = self.resolver.detect_cycles(document, Some(symbols));
        return Self::report_references(document, symbols, circular_chains);
    }

    /// Same findings as [`Validator::validate_references`], reusing the cycles of a
    /// document that was already resolved.
    pub fn validate_resolved(resolved: &ResolvedDocument, symbols: &SymbolTable) -> ReferenceValidationResult {
        return Self::report_references(&resolved.document, symbols, resolved.cycles.clone());
    }

    /// Validate against one named type.
    ///
    /// Document types check base rules plus their own. Record types (`phase`,
    /// `feature`, `user-story`, `acceptance-criteria`) check only their own
    /// schema. An unknown name yields a single `INVALID_FORMAT` error on the
    /// field `document`.
    pub fn validate_type(&self, document: &Document, type_name: &str) -> ValidationResult {
        let mut errors = Vec::new();

        if let Ok(kind) = DocumentType::from_str(type_name) {
            Self::check_schema(document, self.registry.base(), &mut errors);
            if let Some(schema) = self.registry.document(kind) {
                Self::check_schema(document, schema, &mut errors);
            }
        } else if let Some(schema) = self.registry.record(type_name) {
            Self::check_schema(document, schema, &mut errors);
        } else {
            let known: Vec<&str> = [
                DocumentType::Architecture,
                DocumentType::DetailedDesign,
                DocumentType::Requirements,
                DocumentType::Roadmap,
                DocumentType::TestSpecification,
            ]
            .iter()
            .map(|k| return k.as_str())
            .chain(self.registry.record_names())
            .collect();
            return ValidationResult {
                errors: vec![ValidationError::error(
                    ErrorCode::InvalidFormat,
                    "document",
                    None,
                    format!("no schema for type `{type_name}`; known types: {}", known.join(", ")),
                )],
                summary: ValidationSummary::default(),
                valid: false,
                warnings: Vec::new(),
            };
        }

        return ValidationResult::for_document(document, errors, Vec::new());
    }
}
