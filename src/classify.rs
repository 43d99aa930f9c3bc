//! Input classification by file extension.
//!
//! Decides whether a filesystem entry is an image the analysis service can
//! take, and which media type it declares. No file contents are read.

use std::path::Path;

use crate::config::ClassifierConfig;
use crate::error::{OrcaError, Result};
use crate::models::MediaType;

/// Classify `path` by its (case-insensitive) extension.
///
/// Fails with [`OrcaError::UnsupportedInput`] when the entry is missing, is
/// not a regular file, or carries an extension outside the supported set.
/// `.heic` is only accepted when `config.accept_heic` is set.
pub fn classify(path: &Path, config: &ClassifierConfig) -> Result<MediaType> {
    let metadata = std::fs::metadata(path).map_err(|_| unsupported(path, "does not exist"))?;
    if !metadata.is_file() {
        return Err(unsupported(path, "not a regular file"));
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match media_type_for_extension(&ext) {
        Some(MediaType::Heic) if !config.accept_heic => {
            Err(unsupported(path, "heic input requires conversion"))
        }
        Some(media) => Ok(media),
        None if ext.is_empty() => Err(unsupported(path, "no file extension")),
        None => Err(unsupported(path, &format!("unrecognized extension '.{}'", ext))),
    }
}

/// Map a lowercase extension (without the dot) to a media type.
pub fn media_type_for_extension(ext: &str) -> Option<MediaType> {
    match ext {
        "bmp" => Some(MediaType::Bmp),
        "gif" => Some(MediaType::Gif),
        "heic" => Some(MediaType::Heic),
        "ico" => Some(MediaType::Ico),
        "jpg" | "jpeg" => Some(MediaType::Jpeg),
        "mpo" => Some(MediaType::Mpo),
        "png" => Some(MediaType::Png),
        "tif" | "tiff" => Some(MediaType::Tiff),
        "webp" => Some(MediaType::Webp),
        _ => None,
    }
}

fn unsupported(path: &Path, reason: &str) -> OrcaError {
    OrcaError::UnsupportedInput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
