use std::path::{Path, PathBuf};

use serde::Serialize;
use toondoc::config::{CONFIG_FILE, Config};
use toondoc::loader::TemplateLoader;
use toondoc::scanner;

/// Exit codes shared by every command, with their meaning.
const EXIT_CODES: [(u8, &str); 4] = [
    (0, "Success / all documents valid"),
    (1, "Invalid documents found"),
    (2, "Broken references (unresolved or circular)"),
    (3, "Runtime error"),
];

/// Document types selectable with `validate --type`.
const DOCUMENT_TYPES: [&str; 9] = [
    "architecture",
    "detailed-design",
    "requirements",
    "roadmap",
    "test-specification",
    "phase",
    "feature",
    "user-story",
    "acceptance-criteria",
];

/// What `info` reports about the current directory.
#[derive(Serialize)]
struct CurrentState {
    /// Whether `.toondoc.toml` exists.
    config_found: bool,
    /// Documents `check` would visit, `None` when discovery failed.
    documents: Option<usize>,
    /// Templates found in `templates_dir`.
    templates: usize,
    /// Template directory in effect.
    templates_dir: PathBuf,
}

/// One row of the exit code table.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit code.
    code: u8,
    /// When it is returned.
    meaning: String,
}

/// The `info --json` document.
#[derive(Serialize)]
struct InfoJson {
    /// What was found in the current directory.
    current_state: CurrentState,
    /// Names accepted by `validate --type`.
    document_types: Vec<String>,
    /// Exit code table.
    exit_codes: Vec<ExitCodeInfo>,
    /// Crate version.
    version: String,
}

/// Output the comprehensive toondoc reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(state);
    } else {
        print_markdown(&state);
    }
    return;
}

// ── State gathering ───────────────────────────────────────────────────

fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(CONFIG_FILE).exists();
    let config = Config::load(root).unwrap_or_default();
    let documents = scanner::discover(root, &config).ok().map(|found| return found.len());

    let templates_dir = config.templates_dir(root);
    let templates = TemplateLoader::new(&templates_dir).list(None).map(|t| return t.len()).unwrap_or(0);

    return CurrentState {
        config_found,
        documents,
        templates,
        templates_dir,
    };
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
    return;
}

fn print_markdown_header(version: &str) {
    print!(
        "\
# toondoc {version}

Parser, reference resolver and validator for TOON documents: token-efficient
markdown with a typed overview and addressable symbol sections.

## Document Syntax

    # Title
    ## Document Overview
    - name: \"auth\"                     header field
    - tags: [security, web]             bracket list
    ## Symbol: login                    addressable section
    - phase: @ref(phase-1)              reference to another symbol

## Commands

    toondoc parse <file> [--json]       Parse and summarize a document
    toondoc symbols <file>              List symbols with kind and line
    toondoc validate <file> [--type T]  Validate against the detected or given schema
    toondoc refs <file>                 Resolve references, report cycles
    toondoc check                       Validate every document in the workspace
    toondoc convert <file> --to F       Convert between toon and markdown
    toondoc tokens <file>               Compare TOON / JSON / Markdown token estimates
    toondoc templates [name]            List or show templates
    toondoc watch                       Re-run check on changes

## Configuration ({CONFIG_FILE})

    include = [\"docs/\"]                 # only scan these paths
    exclude = [\"docs/archive/\"]         # skip these paths
    templates_dir = \"templates\"

    [parser]
    max_file_size = 102400
    strict = true                       # require `name` in the overview

    [resolver]
    max_depth = 100                     # cycle search depth

## Document Types

"
    );
    for kind in DOCUMENT_TYPES {
        println!("- `{kind}`");
    }
    print!("\n## Current State\n\n");
    return;
}

fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:     {CONFIG_FILE} (found)");
    } else {
        println!("Config:     {CONFIG_FILE} (not found)");
    }

    match state.documents {
        Some(n) => println!("Documents:  {n}"),
        None => println!("Documents:  (discovery failed)"),
    }
    println!("Templates:  {} ({})", state.templates, state.templates_dir.display());
    return;
}

fn print_markdown_exit_codes() {
    println!("## Exit Codes");
    println!();
    println!("| Code | Meaning |");
    println!("|------|---------|");
    for (code, meaning) in EXIT_CODES {
        println!("| {code}    | {meaning} |");
    }
    return;
}

// ── JSON output ───────────────────────────────────────────────────────

fn print_json(state: CurrentState) {
    let info = InfoJson {
        current_state: state,
        document_types: DOCUMENT_TYPES.iter().map(ToString::to_string).collect(),
        exit_codes: EXIT_CODES
            .iter()
            .map(|(code, meaning)| {
                return ExitCodeInfo {
                    code: *code,
                    meaning: (*meaning).to_string(),
                };
            })
            .collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
    return;
}
