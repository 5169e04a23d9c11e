pub mod control;
pub mod date;
pub mod error;
pub mod layout;
pub mod media;
pub mod placer;
pub mod scan;
pub mod size;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use control::{CancellationToken, CancelledError};
pub use date::{extract_date, CaptureDate};
pub use error::{FailureKind, MetadataError, PlaceError};
pub use layout::{Bucket, DEFAULT_DIR_MODE, FALLBACK_BUCKET};
pub use media::{MediaTypes, DEFAULT_MEDIA_EXTENSIONS};
pub use placer::{Mode, PlaceOptions, Placement, Placer};
pub use size::format_size;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOptions {
    /// Directory tree (or single file) to sort.
    pub source: PathBuf,
    /// Archive root receiving the dated hierarchy.
    pub archive: PathBuf,
    #[serde(default)]
    pub mode: Mode,
    /// JSON file replacing the built-in media extension table.
    #[serde(default)]
    pub media_types: Option<PathBuf>,
    #[serde(default)]
    pub place: PlaceOptions,
}

/// Totals for one run. Counters are per file; `bytes_transferred` is the
/// sum of every successful placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortResult {
    pub files_seen: u64,
    pub placed: u64,
    pub dated: u64,
    pub fallback: u64,
    pub bytes_transferred: u64,
    pub not_media: u64,
    pub collisions: u64,
    pub not_regular: u64,
    pub io_errors: u64,
    pub transfer_errors: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl SortResult {
    /// Fold one placement outcome into the totals.
    pub fn record(&mut self, outcome: &Result<Placement, PlaceError>) {
        self.files_seen += 1;
        match outcome {
            Ok(p) => {
                self.placed += 1;
                self.bytes_transferred += p.bytes;
                match p.bucket {
                    Bucket::Dated(_) => self.dated += 1,
                    Bucket::Fallback => self.fallback += 1,
                }
            }
            Err(e) => match e.kind() {
                FailureKind::Classification => self.not_media += 1,
                FailureKind::Collision => self.collisions += 1,
                FailureKind::NotRegularFile => self.not_regular += 1,
                FailureKind::Io => self.io_errors += 1,
                FailureKind::Transfer => self.transfer_errors += 1,
            },
        }
    }

    /// Files that failed for a reason other than not being media.
    pub fn failed(&self) -> u64 {
        self.collisions + self.not_regular + self.io_errors + self.transfer_errors
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files seen, {} placed ({} dated, {} in {}), {} transferred, {} not media, {} collisions, {} errors",
            self.files_seen,
            self.placed,
            self.dated,
            self.fallback,
            FALLBACK_BUCKET,
            format_size(self.bytes_transferred),
            self.not_media,
            self.collisions,
            self.not_regular + self.io_errors + self.transfer_errors,
        )
    }
}

/// Type alias for progress callback: `(stage, current, total, message)`.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter. Emits at most every 200ms, plus the final step.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Mutex<Option<Instant>>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: Mutex::new(None),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*last, Some(t) if t.elapsed() < Duration::from_millis(200)) {
                return;
            }
            *last = Some(Instant::now());
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Sort every file under `options.source` into `options.archive`.
pub fn sort_tree(options: &SortOptions, progress_callback: &ProgressCallback<'_>) -> anyhow::Result<SortResult> {
    sort_tree_with_control(options, &CancellationToken::new(), progress_callback)
}

/// Like [`sort_tree`], checking `cancel` before each file.
///
/// Per-file failures are logged and counted, never fatal. The run itself
/// fails only when the media table, the archive root or the source tree
/// cannot be read, or when cancelled.
pub fn sort_tree_with_control(
    options: &SortOptions,
    cancel: &CancellationToken,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<SortResult> {
    let tp = ThrottledProgress::new(progress_callback);

    let media = match &options.media_types {
        Some(path) => MediaTypes::load(path)?,
        None => MediaTypes::default(),
    };
    debug!(extensions = media.len(), "media table loaded");
    let placer = Placer::new(media, options.place.clone());

    layout::ensure_dir(&options.archive, options.place.dir_mode)
        .with_context(|| format!("creating archive root {}", options.archive.display()))?;

    tp.report("scan", 0, 1, "Scanning source");
    let scan = scan::collect_files(&options.source, Some(options.archive.as_path()))?;
    let total = scan.files.len() as u64;
    info!(files = total, source = %options.source.display(), "scan complete");

    let mut result = SortResult {
        warnings: scan.warnings,
        ..SortResult::default()
    };

    for (i, path) in scan.files.iter().enumerate() {
        cancel.check()?;

        let outcome = placer.place(path, &options.archive, options.mode);
        match &outcome {
            Ok(p) => info!(
                source = %p.source.display(),
                dest = %p.destination.display(),
                size = %format_size(p.bytes),
                total = %format_size(result.bytes_transferred + p.bytes),
                "placed"
            ),
            Err(e) if e.is_not_media() => debug!(error = %e, "skipped"),
            Err(e) => warn!(error = %e, "not placed"),
        }
        result.record(&outcome);

        tp.report("place", i as u64, total, &path.display().to_string());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg_with_datetime, undated_bytes};
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::tempdir;

    fn options(source: &std::path::Path, archive: &std::path::Path) -> SortOptions {
        SortOptions {
            source: source.to_path_buf(),
            archive: archive.to_path_buf(),
            mode: Mode::Copy,
            media_types: None,
            place: PlaceOptions::default(),
        }
    }

    fn populate(src: &std::path::Path) {
        fs::create_dir_all(src.join("trip")).unwrap();
        fs::write(src.join("sample.jpg"), jpeg_with_datetime("2021:08:06 10:00:00")).unwrap();
        fs::write(src.join("trip/sample2.JPG"), jpeg_with_datetime("2020:02:18 11:00:00")).unwrap();
        fs::write(src.join("trip/clip.mp4"), undated_bytes(1000)).unwrap();
        fs::write(src.join("notes.txt"), b"not media").unwrap();
    }

    #[test]
    fn test_sort_tree() {
        let src = tempdir().unwrap();
        let archive = tempdir().unwrap();
        populate(src.path());

        let result = sort_tree(&options(src.path(), archive.path()), &|_, _, _, _| {}).unwrap();

        let a = archive.path();
        assert!(a.join("2021/2021-08/2021-08-06/sample.jpg").is_file());
        assert!(a.join("2020/2020-02/2020-02-18/sample2.JPG").is_file());
        assert!(a.join("others/clip.mp4").is_file());
        assert!(!a.join("others/notes.txt").exists());

        assert_eq!(result.files_seen, 4);
        assert_eq!(result.placed, 3);
        assert_eq!(result.dated, 2);
        assert_eq!(result.fallback, 1);
        assert_eq!(result.not_media, 1);
        assert_eq!(result.failed(), 0);
        let expected = 2 * jpeg_with_datetime("2021:08:06 10:00:00").len() as u64 + 1000;
        assert_eq!(result.bytes_transferred, expected);
    }

    #[test]
    fn test_rerun_reports_collisions() {
        let src = tempdir().unwrap();
        let archive = tempdir().unwrap();
        populate(src.path());
        let opts = options(src.path(), archive.path());

        sort_tree(&opts, &|_, _, _, _| {}).unwrap();
        let second = sort_tree(&opts, &|_, _, _, _| {}).unwrap();

        assert_eq!(second.placed, 0);
        assert_eq!(second.collisions, 3);
        assert_eq!(second.bytes_transferred, 0);
    }

    #[test]
    fn test_move_tree() {
        let src = tempdir().unwrap();
        let archive = tempdir().unwrap();
        populate(src.path());
        let mut opts = options(src.path(), archive.path());
        opts.mode = Mode::Move;

        let result = sort_tree(&opts, &|_, _, _, _| {}).unwrap();

        assert_eq!(result.placed, 3);
        assert!(!src.path().join("sample.jpg").exists());
        assert!(!src.path().join("trip/clip.mp4").exists());
        // Non-media stays where it was
        assert!(src.path().join("notes.txt").exists());
    }

    #[test]
    fn test_archive_inside_source() {
        let src = tempdir().unwrap();
        populate(src.path());
        let archive = src.path().join("sorted");

        let result = sort_tree(&options(src.path(), &archive), &|_, _, _, _| {}).unwrap();
        assert_eq!(result.files_seen, 4);

        // Second run must not pick up the archive's own files
        let again = sort_tree(&options(src.path(), &archive), &|_, _, _, _| {}).unwrap();
        assert_eq!(again.files_seen, 4);
        assert_eq!(again.collisions, 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let src = tempdir().unwrap();
        let archive = tempdir().unwrap();
        populate(src.path());
        let token = CancellationToken::new();
        token.cancel();

        let err = sort_tree_with_control(&options(src.path(), archive.path()), &token, &|_, _, _, _| {})
            .unwrap_err();

        assert!(err.downcast_ref::<CancelledError>().is_some());
        assert!(!archive.path().join("others").exists());
    }

    #[test]
    fn test_progress_reaches_end() {
        let src = tempdir().unwrap();
        let archive = tempdir().unwrap();
        populate(src.path());
        let last = AtomicU64::new(0);

        sort_tree(&options(src.path(), archive.path()), &|stage, current, total, _| {
            if stage == "place" {
                assert!(current < total);
                last.store(current + 1, Ordering::SeqCst);
            }
        })
        .unwrap();

        assert_eq!(last.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_throttled_progress_borrows_local_state() {
        let calls = AtomicU64::new(0);
        let callback = |_: &str, _: u64, _: u64, _: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        let tp = ThrottledProgress::new(&callback);

        tp.report("place", 0, 3, "first");
        // Within the 200ms window
        tp.report("place", 1, 3, "second");
        // Final step always emits
        tp.report("place", 2, 3, "last");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_custom_media_types_file() {
        let src = tempdir().unwrap();
        let archive = tempdir().unwrap();
        populate(src.path());
        let table = src.path().join("types.json");
        fs::write(&table, r#"{"extensions": ["txt"]}"#).unwrap();
        let mut opts = options(src.path(), archive.path());
        opts.media_types = Some(table);

        let result = sort_tree(&opts, &|_, _, _, _| {}).unwrap();

        assert!(archive.path().join("others/notes.txt").is_file());
        assert!(!archive.path().join("others/types.json").exists());
        assert_eq!(result.not_media, 2); // clip.mp4 and types.json
    }

    #[test]
    fn test_summary_format() {
        let result = SortResult {
            files_seen: 5,
            placed: 3,
            dated: 2,
            fallback: 1,
            bytes_transferred: 1_500_000,
            not_media: 1,
            collisions: 1,
            ..SortResult::default()
        };
        assert_eq!(
            result.summary(),
            "5 files seen, 3 placed (2 dated, 1 in others), 1.5 MB transferred, 1 not media, 1 collisions, 0 errors"
        );
    }
}
