//! Placement of a single file into the archive.
//!
//! `Placer::place` runs one file through the whole pipeline: date extraction,
//! fallback classification, path resolution, collision check, regularity check
//! and the byte transfer. Every failure is terminal for that file and nothing
//! is retried.
//!
//! Known gap: `Mode::Move` is copy-then-delete. A crash between the verified
//! copy and the removal of the source leaves the file in both places.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::date::{self, CaptureDate};
use crate::error::{MetadataError, PlaceError};
use crate::layout::{self, Bucket, DEFAULT_DIR_MODE};
use crate::media::{extension_of, MediaTypes};

/// Whether the source survives a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Copy,
    /// Copy, verify, then delete the source. Not an atomic rename.
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceOptions {
    /// Mode for bucket directories created on demand (before umask).
    pub dir_mode: u32,
    /// Copy the source modification time onto the destination.
    pub preserve_mtime: bool,
    /// Compare SHA-256 of source and destination before reporting success
    /// (and before deleting the source on a move).
    pub verify_checksum: bool,
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            dir_mode: DEFAULT_DIR_MODE,
            preserve_mtime: true,
            verify_checksum: false,
        }
    }
}

/// A successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub bucket: Bucket,
    pub bytes: u64,
}

impl Placement {
    pub fn capture_date(&self) -> Option<CaptureDate> {
        match self.bucket {
            Bucket::Dated(d) => Some(d),
            Bucket::Fallback => None,
        }
    }
}

/// Places files into an archive. Holds only immutable configuration, so one
/// instance can serve many files (and threads).
#[derive(Debug, Clone, Default)]
pub struct Placer {
    media: MediaTypes,
    options: PlaceOptions,
}

impl Placer {
    pub fn new(media: MediaTypes, options: PlaceOptions) -> Self {
        Self { media, options }
    }

    pub fn media_types(&self) -> &MediaTypes {
        &self.media
    }

    pub fn options(&self) -> &PlaceOptions {
        &self.options
    }

    /// Decide the bucket and destination for `source`, creating the bucket
    /// directory. Nothing is written for files that are not media.
    pub fn resolve(&self, source: &Path, archive_root: &Path) -> Result<(PathBuf, Bucket), PlaceError> {
        let file_name = source.file_name().ok_or_else(|| {
            PlaceError::io(
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

        match date::extract_date(source) {
            Ok(date) => {
                debug!(source = %source.display(), %date, "capture date found");
                let dest = layout::resolve_dated_path(archive_root, file_name, &date, self.options.dir_mode)?;
                Ok((dest, Bucket::Dated(date)))
            }
            Err(MetadataError::NotFound { reason, .. }) => {
                debug!(source = %source.display(), %reason, "no capture date");
                if !self.media.is_recognized_path(source) {
                    return Err(PlaceError::Classification {
                        path: source.to_path_buf(),
                        extension: extension_of(source).unwrap_or_default().to_string(),
                    });
                }
                let dest = layout::resolve_fallback_path(archive_root, file_name, self.options.dir_mode)?;
                Ok((dest, Bucket::Fallback))
            }
            Err(MetadataError::Io { path, source }) => Err(PlaceError::Io { path, source }),
        }
    }

    /// Place one file into the archive and report the bytes transferred.
    pub fn place(&self, source: &Path, archive_root: &Path, mode: Mode) -> Result<Placement, PlaceError> {
        let (destination, bucket) = self.resolve(source, archive_root)?;

        match fs::symlink_metadata(&destination) {
            Ok(_) => return Err(PlaceError::Collision { path: destination }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(PlaceError::io(destination, e)),
        }

        let bytes = transfer(source, &destination, mode, &self.options)?;

        Ok(Placement {
            source: source.to_path_buf(),
            destination,
            bucket,
            bytes,
        })
    }
}

/// Copy or move `source` to `dest`, which must not exist yet.
///
/// The destination is created with `create_new`, so a file that appears
/// between the caller's check and this call is still reported as a
/// collision rather than overwritten. On failure no destination file is
/// left behind.
pub fn transfer(source: &Path, dest: &Path, mode: Mode, options: &PlaceOptions) -> Result<u64, PlaceError> {
    let meta = fs::metadata(source).map_err(|e| PlaceError::io(source, e))?;
    if !meta.is_file() {
        return Err(PlaceError::NotRegularFile {
            path: source.to_path_buf(),
        });
    }
    let expected = meta.len();

    let src_file = File::open(source).map_err(|e| PlaceError::io(source, e))?;
    let dst_file = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(PlaceError::Collision {
                path: dest.to_path_buf(),
            })
        }
        Err(e) => return Err(PlaceError::io(dest, e)),
    };

    let copied = copy_contents(src_file, dst_file).and_then(|n| {
        if n != expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("copied {} bytes, source is {} bytes", n, expected),
            ));
        }
        if options.verify_checksum {
            let (a, b) = (file_sha256(source)?, file_sha256(dest)?);
            if a != b {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("checksum mismatch: source {} destination {}", a, b),
                ));
            }
        }
        Ok(n)
    });

    let bytes = match copied {
        Ok(n) => n,
        Err(e) => {
            discard_partial(dest);
            return Err(PlaceError::transfer(source, e));
        }
    };

    if options.preserve_mtime {
        let mtime = filetime::FileTime::from_last_modification_time(&meta);
        if let Err(e) = filetime::set_file_mtime(dest, mtime) {
            warn!(dest = %dest.display(), error = %e, "could not preserve modification time");
        }
    }

    if mode == Mode::Move {
        if let Err(e) = fs::remove_file(source) {
            // The verified copy stays; the file now exists in both places.
            warn!(
                source = %source.display(),
                dest = %dest.display(),
                error = %e,
                "copied but could not remove source"
            );
            return Err(PlaceError::transfer(source, e));
        }
    }

    Ok(bytes)
}

fn copy_contents(mut src: File, dst: File) -> io::Result<u64> {
    let mut writer = BufWriter::new(dst);
    let n = io::copy(&mut src, &mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(n)
}

fn discard_partial(dest: &Path) {
    if let Err(e) = fs::remove_file(dest) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(dest = %dest.display(), error = %e, "could not remove partial destination");
        }
    }
}

fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
