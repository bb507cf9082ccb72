use std::path::Path;

use toondoc::config::CONFIG_FILE;
use toondoc::validator::{Severity, ValidationError};
use toondoc::{Error, ParseIssue};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// One validation finding as `file:line CODE field: message`.
/// The line is omitted when the field did not come from parsed text.
pub fn format_finding(file: &str, finding: &ValidationError) -> String {
    let location = match finding.line {
        Some(line) => format!("{file}:{line}"),
        None => file.to_string(),
    };
    let marker = match finding.severity {
        Severity::Error => "",
        Severity::Warning => " (warning)",
    };
    return format!("{location}  {}{marker}  {}: {}", finding.code, finding.field, finding.message);
}

/// One parse issue as `file:line CODE message`. Line 0 means the whole file.
pub fn format_issue(file: &str, issue: &ParseIssue) -> String {
    if issue.line == 0 {
        return format!("{file}  {}  {}", issue.code, issue.message);
    }
    return format!("{file}:{}  {}  {}", issue.line, issue.code, issue.message);
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and how to fix it.
/// Designed to be readable by both humans and LLM agents.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::DocumentNotFound { path } => render_document_not_found(path),
        Error::Io(err) => format!(
            "\
# Error: I/O

{err}
"
        ),
        Error::Json(err) => format!(
            "\
# Error: Invalid JSON

{err}

## Fix

`.json` documents must be a single object whose keys are document fields:

    {{\"name\": \"auth\", \"description\": \"...\", \"version\": \"1.0.0\"}}
"
        ),
        Error::TemplateNotFound { format, name } => render_template_not_found(name, format.as_deref()),
        Error::TomlDe(err) => format!(
            "\
# Error: Invalid Config

`{CONFIG_FILE}` could not be parsed:

{err}

## Fix

Known keys are `include`, `exclude`, `templates_dir`, `[parser]` and `[resolver]`:

    toondoc info
"
        ),
        Error::UnknownFormat { name } => format!(
            "\
# Error: Unknown Format

`{name}` is not a conversion format.

## Fix

Use `toon` or `markdown`:

    toondoc convert <file> --to markdown
"
        ),
        Error::WatchFailed { reason } => format!(
            "\
# Error: Watch Failed

{reason}

## Fix

Run a one-off check instead:

    toondoc check
"
        ),
    };
}

fn render_document_not_found(path: &Path) -> String {
    return format!(
        "\
# Error: Document Not Found

`{}` does not exist.

## Fix

List the documents toondoc can see from here:

    toondoc check
",
        path.display()
    );
}

fn render_template_not_found(name: &str, format: Option<&str>) -> String {
    let wanted = format.map_or_else(String::new, |f| return format!(" ({f} format)"));
    return format!(
        "\
# Error: Template Not Found

No `{name}.toon.md` or `{name}.md` template{wanted}.

## Fix

List the available templates:

    toondoc templates
"
    );
}
