//! Declarative field schemas for TOON documents and their embedded records.
//!
//! A [`Schema`] is a list of [`FieldRule`]s checked against an ordered field
//! map. Checks never stop early: every violated rule adds one error.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;

use crate::types::Value;
use crate::validator::{DocumentType, ErrorCode, ValidationError};

/// Effort estimates such as `2 weeks`, `3d`, `4h`.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static EFFORT: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)^(\d+\s+(hour|day|week|month)s?|\d+h|\d+d|\d+w|\d+m)$").expect("valid regex");
});

/// Lowercase alphanumerics and hyphens.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static SLUG: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// Team sizes such as `3 engineers` or `2p`.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static TEAM: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)^(\d+\s+(people|person|developers?|engineers?)|\d+p)$").expect("valid regex");
});

/// Strict `MAJOR.MINOR.PATCH`.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static VERSION: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"^\d+\.\d+\.\d+$").expect("valid regex"));

/// `MAJOR.MINOR.PATCH` with an optional `-prerelease` suffix.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static VERSION_PRERELEASE: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?$").expect("valid regex"));

/// Shape and constraints one field value must satisfy.
#[derive(Debug, Clone)]
pub enum Check {
    /// `true` / `false`.
    Bool,
    /// ISO-8601 datetime containing a literal `T`.
    DateTime,
    /// List with optional size bounds; each item checked against `item`.
    List {
        /// Check applied to every item.
        item: Box<Check>,
        /// Maximum number of items.
        max: Option<usize>,
        /// Minimum number of items.
        min: Option<usize>,
    },
    /// String from a fixed set.
    OneOf(&'static [&'static str]),
    /// Nested record checked against its own schema.
    Record(Box<Schema>),
    /// `@ref(<id>)` or `@ref:<id>` string.
    Ref,
    /// String with optional length bounds (in characters) and pattern.
    Text {
        /// Maximum length.
        max: Option<usize>,
        /// Minimum length.
        min: Option<usize>,
        /// Pattern and its human-readable description.
        pattern: Option<(&'static Regex, &'static str)>,
    },
}

impl Check {
    /// List of items with no size bounds.
    fn list_of(item: Self) -> Self {
        return Self::List {
            item: Box::new(item),
            max: None,
            min: None,
        };
    }

    /// Unconstrained-length text with a pattern.
    fn pattern(regex: &'static Regex, description: &'static str) -> Self {
        return Self::Text {
            max: None,
            min: Some(1),
            pattern: Some((regex, description)),
        };
    }

    /// Text between `min` and `max` characters.
    const fn text(min: usize, max: Option<usize>) -> Self {
        return Self::Text {
            max,
            min: Some(min),
            pattern: None,
        };
    }
}

/// One field of a schema.
#[derive(Debug, Clone)]
pub struct FieldRule {
    /// What the value must look like.
    pub check: Check,
    /// Field name.
    pub name: &'static str,
    /// Whether absence is an error.
    pub required: bool,
}

impl FieldRule {
    /// An optional field.
    const fn optional(name: &'static str, check: Check) -> Self {
        return Self {
            check,
            name,
            required: false,
        };
    }

    /// A required field.
    const fn required(name: &'static str, check: Check) -> Self {
        return Self {
            check,
            name,
            required: true,
        };
    }
}

/// A named set of field rules plus date-ordering constraints.
#[derive(Debug, Clone)]
pub struct Schema {
    /// `(later, earlier)` pairs: when both are valid datetimes, `later` must be after `earlier`.
    pub after: Vec<(&'static str, &'static str)>,
    /// Field rules in check order.
    pub fields: Vec<FieldRule>,
    /// Schema name, used in messages.
    pub name: &'static str,
}

impl Schema {
    /// Check `fields` against this schema, appending errors to `out`.
    ///
    /// `prefix` is the dotted path of the record being checked, empty at the
    /// top level. `lines` maps dotted paths to source lines.
    pub fn check(
        &self,
        fields: &IndexMap<String, Value>,
        prefix: &str,
        lines: &IndexMap<String, u32>,
        out: &mut Vec<ValidationError>,
    ) {
        for rule in &self.fields {
            let path = join_path(prefix, rule.name);
            let line = lines.get(&path).copied();
            match fields.get(rule.name) {
                None if rule.required => out.push(ValidationError::error(
                    ErrorCode::MissingRequiredField,
                    &path,
                    line,
                    format!("`{path}` is required"),
                )),
                None => {},
                Some(value) => check_value(&rule.check, value, &path, line, rule.required, lines, out),
            }
        }

        for (later, earlier) in &self.after {
            let later_at = fields.get(*later).and_then(Value::as_str).and_then(parse_datetime);
            let earlier_at = fields.get(*earlier).and_then(Value::as_str).and_then(parse_datetime);
            if let (Some(later_at), Some(earlier_at)) = (later_at, earlier_at)
                && later_at <= earlier_at
            {
                let path = join_path(prefix, later);
                out.push(ValidationError::error(
                    ErrorCode::InvalidFormat,
                    &path,
                    lines.get(&path).copied(),
                    format!("`{path}` must be after `{earlier}`"),
                ));
            }
        }
        return;
    }

    /// Empty schema with a name.
    const fn named(name: &'static str) -> Self {
        return Self {
            after: Vec::new(),
            fields: Vec::new(),
            name,
        };
    }
}

/// All schemas the validator knows, built once per validator.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Rules every document must satisfy.
    base: Schema,
    /// Extra rules per document type.
    documents: IndexMap<DocumentType, Schema>,
    /// Standalone record schemas by name.
    records: IndexMap<&'static str, Schema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let documents = [
            DocumentType::Architecture,
            DocumentType::DetailedDesign,
            DocumentType::Requirements,
            DocumentType::Roadmap,
            DocumentType::TestSpecification,
        ]
        .into_iter()
        .map(|kind| return (kind, document_type_schema(kind)))
        .collect();

        let records = [phase_schema(), feature_schema(), user_story_schema(), acceptance_criteria_schema()]
            .into_iter()
            .map(|schema| return (schema.name, schema))
            .collect();

        return Self {
            base: base_schema(),
            documents,
            records,
        };
    }
}

impl SchemaRegistry {
    /// Rules every document must satisfy.
    pub const fn base(&self) -> &Schema {
        return &self.base;
    }

    /// Extra rules for one document type.
    pub fn document(&self, kind: DocumentType) -> Option<&Schema> {
        return self.documents.get(&kind);
    }

    /// A standalone record schema: `phase`, `feature`, `user-story`, `acceptance-criteria`.
    pub fn record(&self, name: &str) -> Option<&Schema> {
        return self.records.get(name);
    }

    /// Names of all record schemas.
    pub fn record_names(&self) -> impl Iterator<Item = &'static str> {
        return self.records.keys().copied();
    }
}

/// Acceptance criteria: up to ten given/then items.
fn acceptance_criteria_schema() -> Schema {
    let mut item = Schema::named("criteria item");
    item.fields = vec![
        FieldRule::required("given", Check::text(1, Some(500))),
        FieldRule::required("then", Check::text(1, Some(500))),
        FieldRule::optional("and", additional_conditions()),
    ];

    let mut schema = Schema::named("acceptance-criteria");
    schema.fields = vec![
        FieldRule::required("name", slug_name()),
        FieldRule::required(
            "criteria",
            Check::List {
                item: Box::new(Check::Record(Box::new(item))),
                max: Some(10),
                min: Some(1),
            },
        ),
        FieldRule::required("created_at", Check::DateTime),
    ];
    return schema;
}

/// `and`: at most five extra conditions of at most 500 characters.
fn additional_conditions() -> Check {
    return Check::List {
        item: Box::new(Check::text(0, Some(500))),
        max: Some(5),
        min: None,
    };
}

/// Fields every document carries.
fn base_schema() -> Schema {
    let mut schema = Schema::named("document");
    schema.fields = vec![
        FieldRule::required("name", slug_name()),
        FieldRule::required("description", Check::text(1, Some(500))),
        FieldRule::required("version", Check::pattern(&*VERSION, "MAJOR.MINOR.PATCH")),
        FieldRule::required("status", Check::OneOf(&["draft", "active", "deprecated", "superseded"])),
        FieldRule::required("created_at", Check::DateTime),
        FieldRule::optional("updated_at", Check::DateTime),
        FieldRule::optional(
            "tags",
            Check::List {
                item: Box::new(Check::Text {
                    max: Some(50),
                    min: None,
                    pattern: Some((&*SLUG, "lowercase letters, digits and hyphens")),
                }),
                max: Some(10),
                min: None,
            },
        ),
        FieldRule::optional("phases", Check::list_of(Check::Ref)),
        FieldRule::optional("timeline", Check::Ref),
    ];
    return schema;
}

/// Recursive value check for one field.
fn check_value(
    check: &Check,
    value: &Value,
    path: &str,
    line: Option<u32>,
    required: bool,
    lines: &IndexMap<String, u32>,
    out: &mut Vec<ValidationError>,
) {
    let type_error = |expected: &str| {
        return ValidationError::error(
            ErrorCode::InvalidType,
            path,
            line,
            format!("`{path}` must be a {expected}, found {}", value.kind_name()),
        );
    };

    match check {
        Check::Bool => {
            if !matches!(value, Value::Bool(_)) {
                out.push(type_error("boolean"));
            }
        },
        Check::DateTime => match value.as_str() {
            None => out.push(type_error("string")),
            Some(text) if parse_datetime(text).is_none() => out.push(ValidationError::error(
                ErrorCode::InvalidFormat,
                path,
                line,
                format!("`{path}` must be an ISO-8601 datetime such as 2026-01-01T00:00:00Z, found `{text}`"),
            )),
            Some(_) => {},
        },
        Check::List { item, max, min } => {
            let Some(items) = value.as_list() else {
                out.push(type_error("list"));
                return;
            };
            check_list_size(items.len(), *min, *max, path, line, out);
            for (idx, entry) in items.iter().enumerate() {
                check_value(item, entry, &join_path(path, &idx.to_string()), line, true, lines, out);
            }
        },
        Check::OneOf(allowed) => match value.as_str() {
            None => out.push(type_error("string")),
            Some(text) if !allowed.contains(&text) => out.push(ValidationError::error(
                ErrorCode::InvalidEnum,
                path,
                line,
                format!("`{path}` must be one of {}, found `{text}`", allowed.join(", ")),
            )),
            Some(_) => {},
        },
        Check::Record(schema) => match value.as_map() {
            None => out.push(type_error("record")),
            Some(map) => schema.check(map, path, lines, out),
        },
        Check::Ref => match value.as_str() {
            None => out.push(type_error("string")),
            Some(text) if !(text.starts_with("@ref(") || text.starts_with("@ref:")) => {
                out.push(ValidationError::error(
                    ErrorCode::InvalidFormat,
                    path,
                    line,
                    format!("`{path}` must be a reference like `@ref(<id>)`, found `{text}`"),
                ));
            },
            Some(_) => {},
        },
        Check::Text { max, min, pattern } => {
            let Some(text) = value.as_str() else {
                out.push(type_error("string"));
                return;
            };
            check_text(text, *min, *max, *pattern, path, line, required, out);
        },
    }
    return;
}

/// List size bounds. An empty list below its minimum counts as missing.
fn check_list_size(
    len: usize,
    min: Option<usize>,
    max: Option<usize>,
    path: &str,
    line: Option<u32>,
    out: &mut Vec<ValidationError>,
) {
    if let Some(min) = min
        && len < min
    {
        let code = if len == 0 { ErrorCode::MissingRequiredField } else { ErrorCode::InvalidFormat };
        out.push(ValidationError::error(
            code,
            path,
            line,
            format!("`{path}` needs at least {min} entries, found {len}"),
        ));
    }
    if let Some(max) = max
        && len > max
    {
        out.push(ValidationError::error(
            ErrorCode::InvalidFormat,
            path,
            line,
            format!("`{path}` allows at most {max} entries, found {len}"),
        ));
    }
    return;
}

/// Length and pattern checks for a string field.
#[allow(clippy::too_many_arguments, reason = "flat parameter list mirrors check_value")]
fn check_text(
    text: &str,
    min: Option<usize>,
    max: Option<usize>,
    pattern: Option<(&'static Regex, &'static str)>,
    path: &str,
    line: Option<u32>,
    required: bool,
    out: &mut Vec<ValidationError>,
) {
    let len = text.chars().count();

    if len == 0 && required && min.is_some_and(|m| return m > 0) {
        out.push(ValidationError::error(
            ErrorCode::MissingRequiredField,
            path,
            line,
            format!("`{path}` must not be empty"),
        ));
        return;
    }
    if let Some(min) = min
        && len < min
    {
        out.push(ValidationError::error(
            ErrorCode::InvalidFormat,
            path,
            line,
            format!("`{path}` must be at least {min} characters"),
        ));
    }
    if let Some(max) = max
        && len > max
    {
        out.push(ValidationError::error(
            ErrorCode::InvalidFormat,
            path,
            line,
            format!("`{path}` must be at most {max} characters, found {len}"),
        ));
    }
    if let Some((regex, description)) = pattern
        && !regex.is_match(text)
    {
        out.push(ValidationError::error(
            ErrorCode::InvalidFormat,
            path,
            line,
            format!("`{path}` must be {description}, found `{text}`"),
        ));
    }
    return;
}

/// Extra rules for one document type. Base rules are not repeated here.
fn document_type_schema(kind: DocumentType) -> Schema {
    let mut schema = Schema::named(kind.as_str());
    schema.fields = match kind {
        DocumentType::Architecture => vec![FieldRule::optional("components", Check::list_of(Check::text(1, None)))],
        DocumentType::DetailedDesign => vec![FieldRule::optional("modules", Check::list_of(Check::text(1, None)))],
        DocumentType::Requirements => vec![
            FieldRule::optional("user_stories", Check::list_of(Check::Ref)),
            FieldRule::optional("acceptance_criteria", Check::list_of(Check::Ref)),
        ],
        DocumentType::Roadmap => vec![FieldRule::optional("features", Check::list_of(Check::Ref))],
        DocumentType::TestSpecification => vec![FieldRule::optional("test_cases", Check::list_of(Check::Ref))],
    };
    return schema;
}

/// Feature records.
fn feature_schema() -> Schema {
    let mut schema = Schema::named("feature");
    schema.fields = vec![
        FieldRule::required("name", slug_name()),
        FieldRule::optional("description", Check::text(0, Some(500))),
        FieldRule::required("priority", priority()),
        FieldRule::required("effort", Check::pattern(&*EFFORT, "a time estimate such as `2 weeks` or `3d`")),
        FieldRule::required("team", Check::pattern(&*TEAM, "a team size such as `3 engineers` or `2p`")),
        FieldRule::required(
            "status",
            Check::OneOf(&["planned", "in-progress", "completed", "blocked", "cancelled"]),
        ),
        FieldRule::required("phase", Check::Ref),
        FieldRule::optional("user_stories", Check::list_of(Check::Ref)),
        FieldRule::optional("acceptance_criteria", Check::list_of(Check::Ref)),
        FieldRule::optional("technical_specs", Check::Ref),
        FieldRule::required("created_at", Check::DateTime),
    ];
    return schema;
}

/// `prefix.name`, or `name` at the top level.
fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    return format!("{prefix}.{name}");
}

/// Parse an ISO-8601 datetime. The literal `T` separator is mandatory.
///
/// Accepts RFC 3339 with an offset, or a naive `YYYY-MM-DDTHH:MM[:SS[.f]]`.
/// Offsets are normalized to UTC so results compare correctly.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if !text.contains('T') {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    return ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .into_iter()
        .find_map(|format| return NaiveDateTime::parse_from_str(text, format).ok());
}

/// Phase records, with nested success criteria.
fn phase_schema() -> Schema {
    let mut success = Schema::named("success criteria");
    success.fields = vec![
        FieldRule::required("name", Check::text(1, None)),
        FieldRule::required("criteria", Check::text(1, None)),
        FieldRule::required("target", Check::text(1, None)),
        FieldRule::required("measurement", Check::text(1, None)),
        FieldRule::optional("current", Check::text(0, None)),
        FieldRule::optional("achieved", Check::Bool),
        FieldRule::required("created_at", Check::DateTime),
    ];

    let mut schema = Schema::named("phase");
    schema.fields = vec![
        FieldRule::required("name", Check::pattern(&*SLUG, "lowercase letters, digits and hyphens")),
        FieldRule::required("description", Check::text(1, Some(500))),
        FieldRule::required(
            "version",
            Check::pattern(&*VERSION_PRERELEASE, "MAJOR.MINOR.PATCH with an optional -prerelease suffix"),
        ),
        FieldRule::required("timeline", Check::text(1, None)),
        FieldRule::required("priority", priority()),
        FieldRule::required("start_date", Check::DateTime),
        FieldRule::required("target_date", Check::DateTime),
        FieldRule::optional("features", Check::list_of(Check::text(0, None))),
        FieldRule::optional("success_criteria", Check::Record(Box::new(success))),
    ];
    schema.after = vec![("target_date", "start_date")];
    return schema;
}

/// `high` / `medium` / `low`.
const fn priority() -> Check {
    return Check::OneOf(&["high", "medium", "low"]);
}

/// Names: 1 to 100 characters of lowercase letters, digits and hyphens.
fn slug_name() -> Check {
    return Check::Text {
        max: Some(100),
        min: Some(1),
        pattern: Some((&*SLUG, "lowercase letters, digits and hyphens")),
    };
}

/// BDD user stories.
fn user_story_schema() -> Schema {
    let mut schema = Schema::named("user-story");
    schema.fields = vec![
        FieldRule::required("name", slug_name()),
        FieldRule::required("role", Check::text(1, Some(50))),
        FieldRule::required("given", Check::text(1, Some(500))),
        FieldRule::required("when", Check::text(1, Some(500))),
        FieldRule::required("then", Check::text(1, Some(500))),
        FieldRule::optional("and", additional_conditions()),
        FieldRule::required("benefit", Check::text(1, Some(500))),
        FieldRule::required("priority", priority()),
        FieldRule::required("created_at", Check::DateTime),
    ];
    return schema;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(schema: &Schema, fields: &[(&str, Value)]) -> Vec<(String, ErrorCode)> {
        let map: IndexMap<String, Value> = fields.iter().map(|(k, v)| return ((*k).to_string(), v.clone())).collect();
        let mut out = Vec::new();
        schema.check(&map, "", &IndexMap::new(), &mut out);
        return out.into_iter().map(|e| return (e.field, e.code)).collect();
    }

    #[test]
    fn datetime_requires_t_separator() {
        assert!(parse_datetime("2026-01-01T00:00:00Z").is_some());
        assert!(parse_datetime("2026-01-01T00:00:00.123+02:00").is_some());
        assert!(parse_datetime("2026-01-01T09:30").is_some());
        assert!(parse_datetime("2026-01-01").is_none());
        assert!(parse_datetime("2026-01-01 00:00:00").is_none());
        assert!(parse_datetime("yesterday T").is_none());
    }

    #[test]
    fn offsets_are_normalized_before_comparing() {
        let a = parse_datetime("2026-01-01T10:00:00+02:00").unwrap();
        let b = parse_datetime("2026-01-01T09:00:00Z").unwrap();
        assert!(a < b);
    }

    #[test]
    fn phase_target_must_follow_start() {
        let registry = SchemaRegistry::default();
        let phase = registry.record("phase").unwrap();
        let errors = errors_for(
            phase,
            &[
                ("name", Value::from("p1")),
                ("description", Value::from("d")),
                ("version", Value::from("1.0.0-beta.1")),
                ("timeline", Value::from("Q1")),
                ("priority", Value::from("high")),
                ("start_date", Value::from("2026-02-01T00:00:00Z")),
                ("target_date", Value::from("2026-01-01T00:00:00Z")),
            ],
        );
        assert_eq!(errors, vec![("target_date".to_string(), ErrorCode::InvalidFormat)]);
    }

    #[test]
    fn nested_records_report_dotted_paths() {
        let registry = SchemaRegistry::default();
        let criteria = registry.record("acceptance-criteria").unwrap();
        let mut item = IndexMap::new();
        item.insert("given".to_string(), Value::from("a cart"));
        let errors = errors_for(
            criteria,
            &[
                ("name", Value::from("checkout")),
                ("criteria", Value::List(vec![Value::Map(item)])),
                ("created_at", Value::from("2026-01-01T00:00:00Z")),
            ],
        );
        assert_eq!(errors, vec![("criteria.0.then".to_string(), ErrorCode::MissingRequiredField)]);
    }

    #[test]
    fn wrong_variant_is_a_type_error() {
        let registry = SchemaRegistry::default();
        let feature = registry.record("feature").unwrap();
        let errors = errors_for(feature, &[("name", Value::Number(3.0))]);
        assert_eq!(errors.first(), Some(&("name".to_string(), ErrorCode::InvalidType)));
    }

    #[test]
    fn feature_patterns_accept_common_forms() {
        assert!(EFFORT.is_match("2 weeks"));
        assert!(EFFORT.is_match("3D"));
        assert!(!EFFORT.is_match("soon"));
        assert!(TEAM.is_match("3 engineers"));
        assert!(TEAM.is_match("1 person"));
        assert!(TEAM.is_match("2p"));
    }

    #[test]
    fn empty_required_list_counts_as_missing() {
        let mut out = Vec::new();
        check_list_size(0, Some(1), Some(10), "criteria", None, &mut out);
        assert_eq!(out.first().map(|e| e.code), Some(ErrorCode::MissingRequiredField));
    }
}
