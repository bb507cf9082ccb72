use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::convert::Format;
use crate::error::Error;

/// Find all TOON documents under `root`.
/// Applies the config's include/exclude filters to the root-relative path.
/// Returns root-relative paths, sorted, so runs are reproducible.
///
/// # Errors
///
/// Returns `Error::Io` if a directory under `root` cannot be read.
pub fn discover(root: &Path, config: &Config) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_entry(|e| return !is_hidden_dir(e.path(), root)) {
        let entry = entry.map_err(|e| return Error::Io(e.into()))?;
        if !entry.file_type().is_file() || !is_toon_document(entry.path()) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_path_buf();
        if !config.should_scan(&relative.to_string_lossy()) {
            log::trace!(path:? = relative; "excluded by config");
            continue;
        }
        found.push(relative);
    }

    found.sort();
    log::debug!(count = found.len(); "discovered documents");
    return Ok(found);
}

/// Dot-directories such as `.git` are never scanned. The root itself always is.
fn is_hidden_dir(path: &Path, root: &Path) -> bool {
    if path == root || !path.is_dir() {
        return false;
    }
    return path
        .file_name()
        .is_some_and(|name| return name.to_string_lossy().starts_with('.'));
}

/// Whether the file name ends in `.toon.md`.
fn is_toon_document(path: &Path) -> bool {
    return path
        .file_name()
        .is_some_and(|name| return name.to_string_lossy().ends_with(Format::Toon.extension()));
}
