//! Crate-level error types for toondoc runtime failures.
//!
//! Data problems inside a document (bad fields, broken references) are never
//! errors: they are reported as values by the parser and the validator. This
//! enum covers what surrounds the engine: files, config, templates, watching.

use std::path::PathBuf;

/// Every variant carries enough context to produce a diagnostic without a
/// debugger: the file, template, or reason that failed.
#[allow(clippy::error_impl_error, reason = "crate-wide error type re-exported as toondoc::Error")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document path given on the command line does not exist.
    #[error("document not found: {}", path.display())]
    DocumentNotFound {
        /// Path to the missing document.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// No template file matched the requested name.
    #[error("template not found: `{name}`{}", format.as_ref().map(|f| return format!(" ({f} format)")).unwrap_or_default())]
    TemplateNotFound {
        /// Preferred format that was requested, if any.
        format: Option<String>,
        /// Template name without extension.
        name: String,
    },

    /// TOML deserialization of `.toondoc.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A conversion format name was not recognized.
    #[error("unknown format: `{name}` (expected `toon` or `markdown`)")]
    UnknownFormat {
        /// Format name as given by the user.
        name: String,
    },

    /// The filesystem watcher could not be set up.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the watcher failure.
        reason: String,
    },
}
