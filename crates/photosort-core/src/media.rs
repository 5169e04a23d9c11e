use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Image and video extensions eligible for the `others` bucket when no
/// capture date can be read. Lowercase, without the leading dot.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    // images
    "tiff", "tif", "gif", "jpeg", "jpg", "png", "raw", "dng",
    // videos
    "webm", "mkv", "avi", "mov", "wmv", "mp4", "m4v", "mpg", "mp2", "mpeg",
];

/// Immutable, case-insensitive set of recognized media extensions.
///
/// Classification looks at the extension only. A corrupt `.jpg` is still
/// media; a real JPEG named `.bin` is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTypes {
    extensions: BTreeSet<String>,
}

/// On-disk form of a media type table.
#[derive(Debug, Serialize, Deserialize)]
struct MediaTypesFile {
    extensions: Vec<String>,
}

impl Default for MediaTypes {
    fn default() -> Self {
        Self::from_extensions(DEFAULT_MEDIA_EXTENSIONS.iter().copied())
    }
}

impl MediaTypes {
    /// Build a table from extensions. Case and a leading dot are ignored.
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    /// Load a table from a JSON file of the form `{"extensions": ["jpg", ...]}`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening media types file {}", path.display()))?;
        let parsed: MediaTypesFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing media types file {}", path.display()))?;
        anyhow::ensure!(
            !parsed.extensions.is_empty(),
            "media types file {} lists no extensions",
            path.display()
        );
        Ok(Self::from_extensions(parsed.extensions))
    }

    pub fn is_recognized(&self, extension: &str) -> bool {
        let ext = normalize(extension);
        !ext.is_empty() && self.extensions.contains(&ext)
    }

    pub fn is_recognized_path(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.is_recognized(ext))
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

/// Extension of a path's file name, without the dot.
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
