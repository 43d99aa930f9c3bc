//! Document assembly from result records.
//!
//! Reads every `*.json` record in a directory in natural filename order,
//! normalizes each one, and packs them into chunk documents of at most
//! `chunk_size` entries. Chunks are named `<collection>_<ii>of<nn>.<ext>`
//! so every file states its position in the set. Optionally all chunks are
//! bundled into `<collection>_<subcollection>.zip`.
//!
//! Only one chunk's entries are held in memory at a time.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::archive;
use crate::config::AssemblyConfig;
use crate::error::{OrcaError, Result};
use crate::heading;
use crate::models::{ChunkEntry, DocumentChunk, ExtractionQuality, SchemaKind};
use crate::natsort;
use crate::normalize::{normalize, placeholder};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::render::{writer_for, ChunkWriter};
use crate::store;

/// Default output subdirectory, created inside the records directory.
pub const DEFAULT_OUT_DIR: &str = "megadoc";

/// Summary of one assembly run.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub records: usize,
    /// Records that produced only the placeholder block.
    pub unrecoverable: usize,
    pub chunks: Vec<PathBuf>,
    pub archive: Option<PathBuf>,
}

/// Number of chunks needed for `count` records: `ceil(count / chunk_size)`.
pub fn chunk_total(count: usize, chunk_size: usize) -> usize {
    count.div_ceil(chunk_size.max(1))
}

pub struct Assembler<'a> {
    chunk_size: usize,
    archive: bool,
    out_dir: Option<PathBuf>,
    collection: Option<String>,
    writer: Box<dyn ChunkWriter>,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &AssemblyConfig, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            archive: config.archive,
            out_dir: None,
            collection: None,
            writer: writer_for(config.format),
            progress,
        }
    }

    /// Write chunks here instead of `<data_dir>/megadoc`.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    /// Override the collection name (defaults to the data directory's parent).
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Record files directly inside `data_dir`, natural-sorted.
    pub fn collect_records(data_dir: &Path) -> Result<Vec<PathBuf>> {
        if !data_dir.is_dir() {
            return Err(OrcaError::io(
                data_dir,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "records directory does not exist",
                ),
            ));
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| OrcaError::io(data_dir, e.into()))?;
            let is_json = entry
                .path()
                .extension()
                .map(|e| e.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if entry.file_type().is_file() && is_json {
                records.push(entry.into_path());
            }
        }
        natsort::sort_paths(&mut records);
        Ok(records)
    }

    /// Heading and normalized text for one record. Never fails.
    pub fn load_entry(path: &Path) -> ChunkEntry {
        let text = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                Ok(record) => normalize(&record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "record is not valid JSON");
                    placeholder(SchemaKind::Unknown)
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read record");
                placeholder(SchemaKind::Unknown)
            }
        };
        ChunkEntry {
            source: path.to_path_buf(),
            heading: heading::derive(path),
            text,
        }
    }

    pub fn run(&self, data_dir: &Path) -> Result<AssemblyReport> {
        let records = Self::collect_records(data_dir)?;
        let total = chunk_total(records.len(), self.chunk_size);
        let (collection, subcollection) = self.names(data_dir);
        let out_dir = self
            .out_dir
            .clone()
            .unwrap_or_else(|| data_dir.join(DEFAULT_OUT_DIR));

        let mut report = AssemblyReport {
            records: records.len(),
            ..Default::default()
        };

        if records.is_empty() {
            tracing::info!(dir = %data_dir.display(), "no result records; nothing to assemble");
            return Ok(report);
        }
        store::ensure_dir(&out_dir)?;

        for (i, slice) in records.chunks(self.chunk_size).enumerate() {
            let start = i * self.chunk_size;
            let mut chunk = DocumentChunk {
                collection: collection.clone(),
                index: i + 1,
                total,
                entries: Vec::with_capacity(slice.len()),
            };
            let path = out_dir.join(format!("{}.{}", chunk.file_stem(), self.writer.extension()));
            tracing::info!(file = %path.display(), "building chunk {} of {}", i + 1, total);

            for (j, record) in slice.iter().enumerate() {
                self.progress.report(ProgressEvent::Assembling {
                    item: record.display().to_string(),
                    n: (start + j + 1) as u64,
                    total: records.len() as u64,
                    chunk: i + 1,
                    chunks: total,
                });
                let entry = Self::load_entry(record);
                if entry.text.quality == ExtractionQuality::Unrecoverable {
                    report.unrecoverable += 1;
                }
                chunk.entries.push(entry);
            }

            let partial = store::partial_path(&path);
            self.writer.write(&chunk, &partial)?;
            store::commit(&partial, &path)?;
            self.progress.report(ProgressEvent::ChunkSaved {
                file: path.display().to_string(),
                chunk: i + 1,
                chunks: total,
            });
            report.chunks.push(path);
        }

        if self.archive {
            let archive_path = out_dir.join(archive::archive_name(&collection, &subcollection));
            tracing::info!(file = %archive_path.display(), "zipping chunks");
            archive::zip_files(&report.chunks, &archive_path)?;
            report.archive = Some(archive_path);
        }

        Ok(report)
    }

    /// `(collection, subcollection)` names for a records directory.
    fn names(&self, data_dir: &Path) -> (String, String) {
        let resolved = std::fs::canonicalize(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
        let name_of = |p: Option<&Path>| {
            p.and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
        };
        let subcollection = name_of(Some(resolved.as_path())).unwrap_or_else(|| DEFAULT_OUT_DIR.to_string());
        let collection = self
            .collection
            .clone()
            .or_else(|| name_of(resolved.parent()))
            .unwrap_or_else(|| subcollection.clone());
        (collection, subcollection)
    }
}
