//! Core data models used throughout Orca.
//!
//! These types describe the images that go into the OCR stage, the jobs
//! submitted for them, and the normalized text and document chunks that
//! come out of the assembly stage.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Image formats the analysis service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Bmp,
    Gif,
    Ico,
    Jpeg,
    Mpo,
    Png,
    Tiff,
    Webp,
    Heic,
}

impl MediaType {
    /// Short name, e.g. `"jpeg"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Bmp => "bmp",
            MediaType::Gif => "gif",
            MediaType::Ico => "ico",
            MediaType::Jpeg => "jpeg",
            MediaType::Mpo => "mpo",
            MediaType::Png => "png",
            MediaType::Tiff => "tiff",
            MediaType::Webp => "webp",
            MediaType::Heic => "heic",
        }
    }

    /// Value for the request's `Content-Type` header.
    pub fn mime(&self) -> String {
        format!("image/{}", self.as_str())
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source image discovered in an input directory.
#[derive(Debug, Clone)]
pub struct InputAsset {
    pub path: PathBuf,
    pub media_type: MediaType,
    /// File name; the key used for natural ordering.
    pub name: String,
}

impl InputAsset {
    pub fn new(path: PathBuf, media_type: MediaType) -> Self {
        let name = file_name(&path);
        Self {
            path,
            media_type,
            name,
        }
    }

    /// File name of the result record this asset maps to (`<stem>.json`).
    pub fn record_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone());
        format!("{}.json", stem)
    }
}

/// Terminal state of an [`AnalysisJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// A result body was produced and persisted.
    Succeeded,
    /// Every attempt failed; the item degraded to an empty result.
    ExhaustedRetries,
    /// The input could not be submitted at all.
    UnsupportedInput,
    /// The image could not be read, or the service rejected it permanently.
    Failed(String),
}

/// One request to the analysis service for a single asset.
///
/// Lives for a single run; nothing about a job is persisted except the
/// result record it produces.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub asset: PathBuf,
    pub submitted_at: DateTime<Utc>,
    pub attempts: u32,
    pub status: JobStatus,
}

/// How much of a result record could be turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionQuality {
    Full,
    Partial,
    Unrecoverable,
}

/// Which result schema a record was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// `readResult` with pages or blocks of lines.
    Read,
    /// `analyzeResult` with a flat paragraph list.
    Layout,
    Unknown,
}

/// Schema-independent text extracted from one result record.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    /// Never empty.
    pub blocks: Vec<String>,
    pub quality: ExtractionQuality,
    pub schema: SchemaKind,
}

impl NormalizedText {
    /// Block text joined into a single section.
    pub fn joined(&self) -> String {
        self.blocks.join("\n")
    }
}

/// Two-level heading derived from a record's filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub label: String,
    /// `None` when the filename does not encode a timestamp.
    pub timestamp: Option<String>,
}

/// Marker rendered in place of a timestamp that could not be derived.
pub const NO_TIMESTAMP: &str = "[No timestamp.]";

impl Heading {
    pub fn timestamp_text(&self) -> &str {
        self.timestamp.as_deref().unwrap_or(NO_TIMESTAMP)
    }
}

/// One section of a document chunk.
#[derive(Debug, Clone)]
pub struct ChunkEntry {
    /// Record the section came from.
    pub source: PathBuf,
    pub heading: Heading,
    pub text: NormalizedText,
}

/// A size-bounded output document.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub collection: String,
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub entries: Vec<ChunkEntry>,
}

impl DocumentChunk {
    /// `<collection>_<ii>of<nn>`, without extension.
    pub fn file_stem(&self) -> String {
        format!("{}_{:02}of{:02}", self.collection, self.index, self.total)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_name_uses_stem() {
        let asset = InputAsset::new(PathBuf::from("/in/scan_001.JPG"), MediaType::Jpeg);
        assert_eq!(asset.name, "scan_001.JPG");
        assert_eq!(asset.record_name(), "scan_001.json");
    }

    #[test]
    fn chunk_stem_is_zero_padded() {
        let chunk = DocumentChunk {
            collection: "trip".into(),
            index: 2,
            total: 3,
            entries: Vec::new(),
        };
        assert_eq!(chunk.file_stem(), "trip_02of03");
    }

    #[test]
    fn mime_from_media_type() {
        assert_eq!(MediaType::Tiff.mime(), "image/tiff");
        assert_eq!(MediaType::Jpeg.to_string(), "jpeg");
    }
}
