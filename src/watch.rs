//! File watcher: runs `check` on startup, then re-runs on document changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};
use toondoc::{Config, Error, scanner};

use crate::commands;
use crate::diagnostics;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// The workspace root plus the parent directory of every discovered document.
/// The root is always watched so new documents and config edits are seen.
fn collect_watch_dirs(root: &Path, documents: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    dirs.insert(root.to_path_buf());
    for document in documents {
        if let Some(parent) = document.parent()
            && !parent.as_os_str().is_empty()
        {
            dirs.insert(root.join(parent));
        }
    }
    return dirs;
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches document directories and re-checks on changes.
///
/// # Errors
///
/// Returns errors from config loading, discovery, or watcher setup.
pub fn run() -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");

    eprintln!("watch: initial check");
    let mut last_code = run_check();

    let config = Config::load(&root)?;
    let documents = scanner::discover(&root, &config)?;
    let watch_dirs = collect_watch_dirs(&root, &documents);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    for dir in &watch_dirs {
        if dir.exists()
            && let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive)
        {
            log::warn!(dir:? = dir, error:% = e; "cannot watch directory");
        }
    }

    let dir_count = watch_dirs.len();
    eprintln!("watch: monitoring {dir_count} directories, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check();
    }

    return Ok(last_code);
}

/// Run check once and print result. Returns the exit code from check.
fn run_check() -> ExitCode {
    return match commands::check() {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}
