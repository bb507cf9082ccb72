mod commands;
mod diagnostics;
mod info;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr as _;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use toondoc::Format;

#[derive(Parser)]
#[command(name = "toondoc", version, about = "Parse, resolve and validate TOON documents")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log verbosity: off, error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, validate and reference-check every document in the workspace
    Check,
    /// Convert between TOON and plain Markdown
    Convert {
        /// Document to convert.
        file: PathBuf,
        /// Write here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Target format: toon or markdown.
        #[arg(long)]
        to: Format,
    },
    /// Output a reference document for toondoc (syntax, commands, config, current state)
    Info {
        /// Emit JSON instead of markdown.
        #[arg(long)]
        json: bool,
    },
    /// Parse a document and print the result
    Parse {
        /// Document to parse.
        file: PathBuf,
        /// Emit the full parse result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resolve references and report unresolved ones and cycles
    Refs {
        /// Document to check.
        file: PathBuf,
    },
    /// List the symbols of a document
    Symbols {
        /// Document to read.
        file: PathBuf,
    },
    /// List templates, or show one by name
    Templates {
        /// Template directory. Defaults to `templates_dir` from config.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Show this template.
        name: Option<String>,
    },
    /// Compare token estimates for TOON, JSON and Markdown renderings
    Tokens {
        /// Document to measure.
        file: PathBuf,
    },
    /// Validate a document against its schema
    Validate {
        /// Document to validate (`.toon.md` or `.json`).
        file: PathBuf,
        /// Emit the validation result as JSON.
        #[arg(long)]
        json: bool,
        /// Validate against this type instead of the detected one.
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Watch workspace documents and re-run check on changes
    Watch,
}

/// Initialize `env_logger` at the requested level. Unknown levels fall back to `warn`.
fn init_logging(level: &str) {
    let filter = LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("unknown log level `{level}`, using `warn`");
        return LevelFilter::Warn;
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(filter)
        .init();
    return;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Check => commands::check(),
        Commands::Convert { file, output, to } => commands::convert(&file, to, output.as_deref()),
        Commands::Info { json } => {
            info::run(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Parse { file, json } => commands::parse(&file, json),
        Commands::Refs { file } => commands::refs(&file),
        Commands::Symbols { file } => commands::symbols(&file),
        Commands::Templates { dir, name } => commands::templates(dir.as_deref(), name.as_deref()),
        Commands::Tokens { file } => commands::tokens(&file),
        Commands::Validate { file, json, kind } => commands::validate(&file, json, kind.as_deref()),
        Commands::Watch => watch::run(),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3)
        },
    };
}
