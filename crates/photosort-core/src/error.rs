use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a capture date from a file.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The file carries no usable capture date. Triggers fallback classification.
    #[error("no capture date in {}: {reason}", path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Terminal failure while placing a single file into the archive.
///
/// Every variant names the path that caused it. Nothing here is retried;
/// the caller decides whether to keep going with the next file.
#[derive(Debug, Error)]
pub enum PlaceError {
    /// Filesystem operation failed (open, stat, mkdir).
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// No capture date and the extension is not a known media type.
    #[error("not a media file (extension {extension:?}): {}", path.display())]
    Classification { path: PathBuf, extension: String },

    /// Destination already exists. Never overwritten or renamed.
    #[error("destination already exists: {}", path.display())]
    Collision { path: PathBuf },

    #[error("not a regular file: {}", path.display())]
    NotRegularFile { path: PathBuf },

    /// The copy or move itself failed. Partial destinations are removed.
    #[error("transfer failed for {}: {source}", path.display())]
    Transfer { path: PathBuf, source: io::Error },
}

/// Fieldless tag of a [`PlaceError`], used for per-category counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Io,
    Classification,
    Collision,
    NotRegularFile,
    Transfer,
}

impl PlaceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Io { .. } => FailureKind::Io,
            Self::Classification { .. } => FailureKind::Classification,
            Self::Collision { .. } => FailureKind::Collision,
            Self::NotRegularFile { .. } => FailureKind::NotRegularFile,
            Self::Transfer { .. } => FailureKind::Transfer,
        }
    }

    /// True for files that were skipped only because they are not media.
    pub fn is_not_media(&self) -> bool {
        matches!(self, Self::Classification { .. })
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. }
            | Self::Classification { path, .. }
            | Self::Collision { path }
            | Self::NotRegularFile { path }
            | Self::Transfer { path, .. } => path,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transfer(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Transfer {
            path: path.into(),
            source,
        }
    }
}
