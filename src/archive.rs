//! Bundle chunk documents into a single zip archive.

use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

use crate::error::{OrcaError, Result};
use crate::store;

/// Archive name for a collection: `<collection>_<subcollection>.zip`.
pub fn archive_name(collection: &str, subcollection: &str) -> String {
    format!("{}_{}.zip", collection, subcollection)
}

/// Zip `files` flat (by file name) into `out_path`.
///
/// Paths that are missing or not regular files are skipped.
pub fn zip_files(files: &[PathBuf], out_path: &Path) -> Result<usize> {
    let partial = store::partial_path(out_path);
    let file = std::fs::File::create(&partial).map_err(|e| OrcaError::io(&partial, e))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut added = 0;
    for path in files {
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "not a file; leaving it out of the archive");
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = std::fs::read(path).map_err(|e| OrcaError::io(path, e))?;
        zip.start_file(name, options)?;
        zip.write_all(&bytes).map_err(|e| OrcaError::io(&partial, e))?;
        added += 1;
    }
    zip.finish()?;

    store::commit(&partial, out_path)?;
    Ok(added)
}
