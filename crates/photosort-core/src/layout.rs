//! Archive layout: where a file goes under the archive root.
//!
//! Dated files land in `{root}/YYYY/YYYY-MM/YYYY-MM-DD/{name}`, everything
//! else that is still recognized media in `{root}/others/{name}`.

use std::ffi::OsStr;
use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use tracing::debug;

use crate::date::CaptureDate;
use crate::error::PlaceError;

/// Bucket for recognized media without a capture date.
pub const FALLBACK_BUCKET: &str = "others";

/// Mode for newly created bucket directories (before umask): rwxr-xr-x.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Bucket a placed file ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Dated(CaptureDate),
    Fallback,
}

/// `[YYYY, YYYY-MM, YYYY-MM-DD]` for a date, zero-padded.
pub fn date_segments(date: &CaptureDate) -> [String; 3] {
    let (y, m, d) = (date.year(), date.month(), date.day());
    [
        format!("{:04}", y),
        format!("{:04}-{:02}", y, m),
        format!("{:04}-{:02}-{:02}", y, m, d),
    ]
}

/// Directory of a bucket under the archive root. No filesystem access.
pub fn bucket_dir(archive_root: &Path, bucket: &Bucket) -> PathBuf {
    match bucket {
        Bucket::Dated(date) => {
            let mut dir = archive_root.to_path_buf();
            dir.extend(date_segments(date));
            dir
        }
        Bucket::Fallback => archive_root.join(FALLBACK_BUCKET),
    }
}

/// Destination for a dated file, with its bucket directory created.
pub fn resolve_dated_path(
    archive_root: &Path,
    file_name: impl AsRef<OsStr>,
    date: &CaptureDate,
    dir_mode: u32,
) -> Result<PathBuf, PlaceError> {
    resolve(archive_root, file_name, &Bucket::Dated(*date), dir_mode)
}

/// Destination in the `others` bucket, with the bucket directory created.
pub fn resolve_fallback_path(
    archive_root: &Path,
    file_name: impl AsRef<OsStr>,
    dir_mode: u32,
) -> Result<PathBuf, PlaceError> {
    resolve(archive_root, file_name, &Bucket::Fallback, dir_mode)
}

fn resolve(
    archive_root: &Path,
    file_name: impl AsRef<OsStr>,
    bucket: &Bucket,
    dir_mode: u32,
) -> Result<PathBuf, PlaceError> {
    let dir = bucket_dir(archive_root, bucket);
    ensure_dir(&dir, dir_mode).map_err(|e| PlaceError::io(&dir, e))?;
    Ok(dir.join(file_name.as_ref()))
}

/// Create a directory and its parents if absent. A directory that already
/// exists, or appears concurrently, is not an error.
pub fn ensure_dir(dir: &Path, mode: u32) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    match builder.create(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "created bucket directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
