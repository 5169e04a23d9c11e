pub mod exif;

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::MetadataError;

/// Capture timestamp as stored in the file. Wall clock, never converted.
pub type CaptureDate = NaiveDateTime;

/// Extract the capture date embedded in a file.
///
/// The file is opened read-only and closed before returning. Anything but a
/// regular file (directory, FIFO, device) is an I/O error and is never opened.
pub fn extract_date(path: &Path) -> Result<CaptureDate, MetadataError> {
    let meta = fs::metadata(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.is_file() {
        return Err(MetadataError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    let file = File::open(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    match exif::read_exif_date(&mut reader) {
        Ok(Some(date)) => Ok(date),
        Ok(None) => Err(MetadataError::NotFound {
            path: path.to_path_buf(),
            reason: "no date tag in EXIF data".to_string(),
        }),
        // Truncated or malformed containers surface as EOF/invalid data.
        Err(::exif::Error::Io(source))
            if !matches!(
                source.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            Err(MetadataError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(e) => Err(MetadataError::NotFound {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
