use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

/// Files found under a source tree.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Candidate files, sorted by path.
    pub files: Vec<PathBuf>,
    /// Subdirectories that could not be read.
    pub warnings: Vec<String>,
}

/// Recursively collect files under `source`.
///
/// Symlinks are collected as files and left to the placer's regularity check;
/// symlinked directories are not followed. `exclude` (typically the archive
/// root, when it lives inside the source tree) is skipped entirely.
pub fn collect_files(source: &Path, exclude: Option<&Path>) -> anyhow::Result<ScanResult> {
    let meta = fs::metadata(source)
        .with_context(|| format!("reading source {}", source.display()))?;

    let mut result = ScanResult::default();
    if !meta.is_dir() {
        result.files.push(source.to_path_buf());
        return Ok(result);
    }

    let entries = fs::read_dir(source)
        .with_context(|| format!("listing source {}", source.display()))?;
    collect_entries(entries, exclude, &mut result);
    result.files.sort();
    Ok(result)
}

fn collect_recursive(dir: &Path, exclude: Option<&Path>, result: &mut ScanResult) {
    match fs::read_dir(dir) {
        Ok(entries) => collect_entries(entries, exclude, result),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            result.warnings.push(format!("{}: {}", dir.display(), e));
        }
    }
}

fn collect_entries(entries: fs::ReadDir, exclude: Option<&Path>, result: &mut ScanResult) {
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            result.files.push(path);
            continue;
        };
        if file_type.is_dir() {
            if exclude.is_some_and(|ex| same_dir(&path, ex)) {
                continue;
            }
            collect_recursive(&path, exclude, result);
        } else {
            result.files.push(path);
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
