//! CLI commands for toondoc: parse, symbols, validate, refs, check, convert, tokens, templates.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::info;
use toondoc::convert::{Format, convert as convert_text, document_to_markdown};
use toondoc::loader::TemplateLoader;
use toondoc::tokens::compare as compare_tokens;
use toondoc::validator::ValidationError;
use toondoc::{Config, Document, Error, ParseIssue, ParseResult, Parser, Validator, scanner};

use crate::diagnostics;

/// Exit code when at least one document fails validation.
const EXIT_INVALID: u8 = 1;

/// Exit code when at least one reference is unresolved or circular.
const EXIT_BROKEN_REFS: u8 = 2;

/// Config and engine values shared by every command in one run.
struct Workspace {
    /// Loaded `.toondoc.toml`, or defaults.
    config: Config,
    /// Parser built from `[parser]`.
    parser: Parser,
    /// Workspace root.
    root: PathBuf,
    /// Validator built from `[resolver]`.
    validator: Validator,
}

impl Workspace {
    /// Load config from the current directory and build the engine from it.
    ///
    /// # Errors
    ///
    /// Returns an error if `.toondoc.toml` exists but cannot be read or parsed.
    fn load() -> Result<Self, Error> {
        let root = PathBuf::from(".");
        let config = Config::load(&root)?;
        return Ok(Self {
            parser: Parser::new(config.parser),
            validator: Validator::new(config.resolver),
            config,
            root,
        });
    }

    /// Read and parse one document.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentNotFound` if the file is missing, or `Error::Io`.
    fn parse_file(&self, path: &Path) -> Result<ParseResult, Error> {
        let text = read_document(path)?;
        return Ok(self.parser.parse(&text));
    }
}

/// Parse, validate and reference-check every discovered document.
///
/// Exit code priority: broken references (2) > invalid documents (1) > clean (0).
///
/// # Errors
///
/// Returns errors from config loading, discovery, or reading a document.
pub fn check() -> Result<ExitCode, Error> {
    let workspace = Workspace::load()?;
    let documents = scanner::discover(&workspace.root, &workspace.config)?;

    let mut invalid_count = 0_u32;
    let mut broken_count = 0_u32;

    for relative in &documents {
        let display = relative.display().to_string();
        let parsed = workspace.parse_file(&workspace.root.join(relative))?;
        let validation = workspace.validator.validate(&parsed.document);
        let references = workspace.validator.validate_references(&parsed.document, &parsed.symbols);

        if !parsed.errors.is_empty() || !validation.is_valid() {
            invalid_count = invalid_count.saturating_add(1);
            for issue in &parsed.errors {
                println!("INVALID {}", diagnostics::format_issue(&display, issue));
            }
            for error in validation.errors() {
                println!("INVALID {}", diagnostics::format_finding(&display, error));
            }
        }
        if !references.is_valid() {
            broken_count = broken_count.saturating_add(1);
            for error in references.errors() {
                println!("BROKEN  {}", diagnostics::format_finding(&display, error));
            }
        }
    }

    let total = documents.len();
    info!(documents = total, invalid = invalid_count, broken = broken_count; "check finished");

    if broken_count > 0 {
        println!();
        println!("{broken_count} with broken references, {invalid_count} invalid");
        return Ok(ExitCode::from(EXIT_BROKEN_REFS));
    } else if invalid_count > 0 {
        println!();
        println!("{invalid_count} invalid");
        return Ok(ExitCode::from(EXIT_INVALID));
    } else {
        println!("All {total} documents valid");
        return Ok(ExitCode::SUCCESS);
    }
}

/// Convert a document to another format. The source format comes from the file name.
///
/// # Errors
///
/// Returns errors from reading the input or writing the output.
pub fn convert(file: &Path, to: Format, output: Option<&Path>) -> Result<ExitCode, Error> {
    let text = read_document(file)?;
    let from = if file.to_string_lossy().ends_with(Format::Toon.extension()) {
        Format::Toon
    } else {
        Format::Markdown
    };

    let result = convert_text(&text, from, to);
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    match output {
        Some(path) => {
            std::fs::write(path, &result.content)?;
            eprintln!("Wrote {} ({} tokens)", path.display(), result.tokens);
        },
        None => print!("{}", result.content),
    }
    return Ok(ExitCode::SUCCESS);
}

/// Parse a document and print a summary, or the full result as JSON.
///
/// # Errors
///
/// Returns errors from config loading, reading the file, or JSON encoding.
pub fn parse(file: &Path, json: bool) -> Result<ExitCode, Error> {
    let workspace = Workspace::load()?;
    let parsed = workspace.parse_file(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        let display = file.display().to_string();
        println!("# {}", parsed.document.name.as_deref().unwrap_or("(unnamed)"));
        println!();
        println!("Lines:    {}", parsed.metadata.line_count);
        println!("Tokens:   {}", parsed.metadata.token_count);
        println!("Fields:   {}", parsed.document.fields().len());
        println!("Symbols:  {}", parsed.symbols.len());
        print_issues("Errors", &display, &parsed.errors);
        print_issues("Warnings", &display, &parsed.warnings);
    }

    if parsed.errors.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(EXIT_INVALID));
}

/// Print a titled list of parse issues, nothing when empty.
fn print_issues(title: &str, display: &str, issues: &[ParseIssue]) {
    if issues.is_empty() {
        return;
    }
    println!();
    println!("## {title}");
    println!();
    for issue in issues {
        println!("- {}", diagnostics::format_issue(display, issue));
    }
    return;
}

/// Read a document, mapping a missing file to `DocumentNotFound`.
///
/// # Errors
///
/// Returns `Error::DocumentNotFound` or `Error::Io`.
fn read_document(path: &Path) -> Result<String, Error> {
    return std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            return Error::DocumentNotFound { path: path.to_path_buf() };
        }
        return Error::Io(e);
    });
}

/// Resolve references in a document and report unresolved ids and cycles.
///
/// # Errors
///
/// Returns errors from config loading or reading the file.
pub fn refs(file: &Path) -> Result<ExitCode, Error> {
    let workspace = Workspace::load()?;
    let parsed = workspace.parse_file(file)?;
    let display = file.display().to_string();

    let resolved = workspace.validator.resolver().resolve(&parsed.document, &parsed.symbols);
    for reference in &resolved.resolved_refs {
        println!(
            "REF     {}:{}  {} -> {} ({}, line {})",
            display,
            reference.from.line.map_or_else(|| return "?".to_string(), |l| return l.to_string()),
            reference.from.field,
            reference.to.symbol,
            reference.to.kind,
            reference.to.line
        );
    }

    let report = Validator::validate_resolved(&resolved, &parsed.symbols);
    let summary = report.summary();
    println!(
        "{} references: {} resolved, {} unresolved",
        summary.total_references, summary.resolved_references, summary.unresolved_references
    );

    for chain in report.circular_chains() {
        println!("CYCLE   {}", chain.symbols.join(" -> "));
    }
    for error in report.errors() {
        println!("BROKEN  {}", diagnostics::format_finding(&display, error));
    }
    for warning in report.warnings() {
        println!("WARN    {}", diagnostics::format_finding(&display, warning));
    }

    if report.is_valid() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(EXIT_BROKEN_REFS));
}

/// List the symbols of a document with their kind and line.
///
/// # Errors
///
/// Returns errors from config loading or reading the file.
pub fn symbols(file: &Path) -> Result<ExitCode, Error> {
    let workspace = Workspace::load()?;
    let text = read_document(file)?;
    let table = workspace.parser.extract_symbols(&text);

    for symbol in table.iter() {
        println!("{}:{}  {}  ({})", file.display(), symbol.line, symbol.symbol, symbol.kind);
    }
    if table.is_empty() {
        eprintln!("No symbols in {}.", file.display());
    }
    return Ok(ExitCode::SUCCESS);
}

/// List templates, or print one template's metadata and content.
///
/// # Errors
///
/// Returns errors from config loading, the template directory, or a missing template.
pub fn templates(dir: Option<&Path>, name: Option<&str>) -> Result<ExitCode, Error> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => {
            let workspace = Workspace::load()?;
            workspace.config.templates_dir(&workspace.root)
        },
    };
    let loader = TemplateLoader::new(dir);

    let Some(name) = name else {
        let listed = loader.list(None)?;
        if listed.is_empty() {
            eprintln!("No templates in {}.", loader.dir().display());
        }
        for template in listed {
            let formats: Vec<String> = template.formats.iter().map(ToString::to_string).collect();
            println!("{}  ({})", template.name, formats.join(", "));
        }
        return Ok(ExitCode::SUCCESS);
    };

    let template = loader.load(name, None)?;
    let meta = &template.metadata;
    println!("# {} ({})", meta.name, template.format);
    println!();
    println!("Description:   {}", meta.description.as_deref().unwrap_or("-"));
    println!("Version:       {}", meta.version.as_deref().unwrap_or("-"));
    println!("Last modified: {}", meta.last_modified.to_rfc3339());
    println!("Size:          {} bytes, ~{} tokens", meta.size, meta.tokens);
    println!();
    print!("{}", template.content);
    return Ok(ExitCode::SUCCESS);
}

/// Compare token estimates of a document in TOON, JSON and Markdown form.
///
/// # Errors
///
/// Returns errors from config loading, reading the file, or JSON encoding.
pub fn tokens(file: &Path) -> Result<ExitCode, Error> {
    let workspace = Workspace::load()?;
    let text = read_document(file)?;
    let parsed = workspace.parser.parse(&text);

    let json = serde_json::to_string_pretty(&parsed.document)?;
    let markdown = document_to_markdown(&parsed.document);
    let comparison = compare_tokens(workspace.parser.counter(), &text, &json, &markdown);

    println!("| Format   | Chars | Tokens |");
    println!("|----------|-------|--------|");
    for (label, size) in [
        ("TOON", comparison.toon),
        ("JSON", comparison.json),
        ("Markdown", comparison.markdown),
    ] {
        println!("| {label:<8} | {:>5} | {:>6} |", size.chars, size.tokens);
    }
    println!();
    println!(
        "TOON vs JSON:     {} tokens ({:.1}%)",
        comparison.vs_json.tokens, comparison.vs_json.percentage
    );
    println!(
        "TOON vs Markdown: {} tokens ({:.1}%)",
        comparison.vs_markdown.tokens, comparison.vs_markdown.percentage
    );
    return Ok(ExitCode::SUCCESS);
}

/// Validate a document. `.json` files deserialize straight into a document.
///
/// # Errors
///
/// Returns errors from config loading, reading the file, or JSON decoding.
pub fn validate(file: &Path, json: bool, kind: Option<&str>) -> Result<ExitCode, Error> {
    let workspace = Workspace::load()?;
    let display = file.display().to_string();

    let mut parse_errors = Vec::new();
    let document: Document = if file.extension().is_some_and(|ext| return ext == "json") {
        serde_json::from_str(&read_document(file)?)?
    } else {
        let parsed = workspace.parse_file(file)?;
        parse_errors = parsed.errors;
        parsed.document
    };

    let result = match kind {
        Some(name) => workspace.validator.validate_type(&document, name),
        None => workspace.validator.validate(&document),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for issue in &parse_errors {
            println!("ERROR   {}", diagnostics::format_issue(&display, issue));
        }
        print_findings(&display, result.errors(), result.warnings());
        let summary = result.summary();
        println!(
            "{}: {} fields, {} valid, {} invalid, {} missing",
            if result.is_valid() { "valid" } else { "invalid" },
            summary.total_fields,
            summary.valid_fields,
            summary.invalid_fields,
            summary.missing_fields
        );
    }

    if result.is_valid() && parse_errors.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(EXIT_INVALID));
}

/// Print validation errors then warnings, one per line.
fn print_findings(display: &str, errors: &[ValidationError], warnings: &[ValidationError]) {
    for error in errors {
        println!("ERROR   {}", diagnostics::format_finding(display, error));
    }
    for warning in warnings {
        println!("WARN    {}", diagnostics::format_finding(display, warning));
    }
    return;
}
