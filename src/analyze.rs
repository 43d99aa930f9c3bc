//! Batch analysis of an image directory.
//!
//! Walks the images directly inside a source directory in natural filename
//! order. Each image is submitted through the retry policy, and its result
//! body is persisted as `<dest>/<stem>.json`.
//!
//! An existing record is the checkpoint: those images are skipped without
//! any network call, so an interrupted run can simply be started again.

use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classify::classify;
use crate::config::{ClassifierConfig, Config};
use crate::error::{OrcaError, Result};
use crate::models::{AnalysisJob, InputAsset, JobStatus};
use crate::natsort;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::retry::{Outcome, RetryPolicy};
use crate::store;
use crate::submit::{empty_result, Submitter};

/// Summary of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub source: PathBuf,
    pub dest: PathBuf,
    /// Images discovered (supported only).
    pub total: usize,
    pub analyzed: usize,
    pub skipped: usize,
    /// Entries the classifier rejected.
    pub unsupported: usize,
    pub exhausted: usize,
    pub failed: usize,
    /// Jobs run this time; skipped images have none.
    pub jobs: Vec<AnalysisJob>,
}

pub struct BatchAnalyzer<'a> {
    submitter: &'a dyn Submitter,
    progress: &'a dyn ProgressReporter,
    retry: RetryPolicy,
    classifier: ClassifierConfig,
    persist_exhausted: bool,
}

impl<'a> BatchAnalyzer<'a> {
    pub fn new(
        config: &Config,
        submitter: &'a dyn Submitter,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            submitter,
            progress,
            retry: RetryPolicy::from_config(&config.retry),
            classifier: config.classifier.clone(),
            persist_exhausted: config.retry.persist_exhausted,
        }
    }

    /// List supported images in `source`, natural-sorted by file name.
    ///
    /// Returns the assets and the number of entries that were rejected.
    pub fn discover(&self, source: &Path) -> Result<(Vec<InputAsset>, usize)> {
        if !source.is_dir() {
            return Err(OrcaError::io(
                source,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "source directory does not exist",
                ),
            ));
        }

        let mut assets = Vec::new();
        let mut unsupported = 0;
        for entry in WalkDir::new(source).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| OrcaError::io(source, e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            match classify(entry.path(), &self.classifier) {
                Ok(media) => assets.push(InputAsset::new(entry.path().to_path_buf(), media)),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unsupported input");
                    unsupported += 1;
                }
            }
        }

        assets.sort_by(|a, b| natsort::compare(&a.name, &b.name));
        Ok((assets, unsupported))
    }

    /// Analyze every image in `source`, writing records into `dest`.
    ///
    /// Only [`OrcaError::RetriesExhausted`] (abort policy) or a failure to
    /// write a record stops the batch. Everything else is counted and logged.
    pub fn run(&self, source: &Path, dest: &Path) -> Result<BatchReport> {
        store::ensure_dir(dest)?;
        let (assets, unsupported) = self.discover(source)?;
        let total = assets.len();

        tracing::info!(source = %source.display(), dest = %dest.display(), total, "analyzing images");

        let mut report = BatchReport {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            total,
            unsupported,
            ..Default::default()
        };

        for (i, asset) in assets.iter().enumerate() {
            let record_path = dest.join(asset.record_name());

            if record_path.exists() {
                tracing::info!(
                    record = %record_path.display(),
                    "skipping {} ({}/{}), processed",
                    asset.name,
                    i + 1,
                    total
                );
                self.progress
                    .report(ProgressEvent::skipped(&asset.path, i + 1, total));
                report.skipped += 1;
                continue;
            }

            self.progress
                .report(ProgressEvent::analyzing(&asset.path, i + 1, total));
            let job = self.analyze_one(asset, &record_path)?;
            match job.status {
                JobStatus::Succeeded => report.analyzed += 1,
                JobStatus::ExhaustedRetries => report.exhausted += 1,
                JobStatus::UnsupportedInput => report.unsupported += 1,
                JobStatus::Failed(_) => report.failed += 1,
            }
            report.jobs.push(job);
        }

        tracing::info!(
            source = %source.display(),
            analyzed = report.analyzed,
            skipped = report.skipped,
            exhausted = report.exhausted,
            failed = report.failed,
            "finished processing images"
        );
        Ok(report)
    }

    fn analyze_one(&self, asset: &InputAsset, record_path: &Path) -> Result<AnalysisJob> {
        let submitted_at = Utc::now();
        let finish = |attempts: u32, status: JobStatus| AnalysisJob {
            asset: asset.path.clone(),
            submitted_at,
            attempts,
            status,
        };

        let image = match std::fs::read(&asset.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(path = %asset.path.display(), error = %e, "failed to read image");
                return Ok(finish(0, JobStatus::Failed(e.to_string())));
            }
        };

        let mut last_attempt = 0;
        let outcome = self.retry.run(|attempt| {
            last_attempt = attempt;
            tracing::debug!(path = %asset.path.display(), attempt, "submitting");
            self.submitter.submit(&image, asset.media_type)
        });

        match outcome {
            Ok(Outcome::Completed { value, attempts }) => {
                self.persist(record_path, &value)?;
                Ok(finish(attempts, JobStatus::Succeeded))
            }
            Ok(Outcome::Exhausted {
                attempts,
                last_error,
            }) => {
                tracing::error!(
                    path = %asset.path.display(),
                    attempt = attempts,
                    status = ?last_error.status(),
                    error = %last_error,
                    "giving up on image"
                );
                if self.persist_exhausted {
                    self.persist(record_path, &empty_result())?;
                }
                Ok(finish(attempts, JobStatus::ExhaustedRetries))
            }
            Err(e @ OrcaError::RetriesExhausted { .. }) => {
                tracing::error!(path = %asset.path.display(), error = %e, "aborting batch");
                Err(e)
            }
            Err(OrcaError::UnsupportedInput { reason, .. }) => {
                tracing::warn!(path = %asset.path.display(), reason = %reason, "service rejected input");
                Ok(finish(last_attempt, JobStatus::UnsupportedInput))
            }
            Err(e) => {
                tracing::error!(
                    path = %asset.path.display(),
                    attempt = last_attempt,
                    status = ?e.status(),
                    error = %e,
                    "analysis failed"
                );
                Ok(finish(last_attempt, JobStatus::Failed(e.to_string())))
            }
        }
    }

    fn persist(&self, record_path: &Path, value: &Value) -> Result<()> {
        store::write_json(record_path, value)
    }
}
