use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::parser::ParseOptions;
use crate::resolver::ResolverOptions;

/// Name of the workspace config file.
pub const CONFIG_FILE: &str = ".toondoc.toml";

/// Template directory used when the config names none.
const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Project configuration loaded from `.toondoc.toml`.
/// Include/exclude patterns are path prefixes applied to `.toon.md` files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prefixes removed from the scan after `include` is applied.
    pub exclude: Vec<String>,
    /// Prefixes to scan. Empty scans everything.
    pub include: Vec<String>,
    /// Parser limits.
    pub parser: ParseOptions,
    /// Resolver limits.
    pub resolver: ResolverOptions,
    /// Template directory, relative to the workspace root.
    pub templates_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from `.toondoc.toml` in the given root directory.
    /// Returns defaults that scan everything if the file doesn't exist.
    /// A file that exists but is malformed is an error, never a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(path:? = path; "no config file, using defaults");
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
        };

        return Ok(toml::from_str(&content)?);
    }

    /// Check whether a document path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Template directory resolved against `root`.
    pub fn templates_dir(&self, root: &Path) -> PathBuf {
        return root.join(self.templates_dir.as_deref().unwrap_or_else(|| return Path::new(DEFAULT_TEMPLATES_DIR)));
    }
}
