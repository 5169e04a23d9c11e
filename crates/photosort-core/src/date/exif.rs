use chrono::NaiveDateTime;
use exif::{In, Reader, Tag};
use std::io::{BufRead, Seek};
use tracing::trace;

/// Date tags in priority order. All live in the primary image.
const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Read the capture date from the EXIF block of a container (JPEG, TIFF, HEIF, PNG, WebP).
/// EXIF datetimes have no timezone info - they are local time as-is.
///
/// Returns `Ok(None)` when the EXIF block decodes but carries no parsable date.
pub fn read_exif_date<R: BufRead + Seek>(reader: &mut R) -> Result<Option<NaiveDateTime>, exif::Error> {
    let exif = Reader::new().read_from_container(reader)?;

    for tag in DATE_TAGS {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            let val = field.display_value().to_string();
            if let Some(dt) = parse_exif_datetime(&val) {
                trace!(%tag, %dt, "found EXIF date");
                return Ok(Some(dt));
            }
        }
    }

    Ok(None)
}

pub(crate) fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .trim()
        .trim_matches('"')
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    // Subseconds were folded into ':' above
    if let Some((whole, _frac)) = cleaned.rsplit_once(':').filter(|(w, _)| w.len() == 19) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(whole, "%Y:%m:%d %H:%M:%S") {
            return Some(dt);
        }
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}
