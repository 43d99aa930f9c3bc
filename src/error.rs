//! Error taxonomy for the OCR and assembly pipeline.
//!
//! Only a few of these ever stop a run. Per-item failures are logged and the
//! batch moves on; see [`OrcaError::is_transient`] for what the retry
//! controller is allowed to repeat.

use std::path::PathBuf;

/// Errors produced by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum OrcaError {
    /// The classifier could not identify a usable media type.
    #[error("unsupported input {}: {reason}", path.display())]
    UnsupportedInput { path: PathBuf, reason: String },

    /// The remote endpoint answered with a non-success status.
    #[error("submission failed with HTTP {status}")]
    SubmissionFailed { status: u16 },

    /// The request never got a response (DNS, TLS, connection reset, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// An asynchronous job did not complete within the polling budget.
    #[error("analysis did not complete within {waited_secs}s")]
    PollTimeout { waited_secs: u64 },

    /// The service reported a terminal failure for the job.
    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    /// The retry budget was consumed under the abort policy.
    #[error("retries exhausted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render document: {0}")]
    Render(String),

    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl OrcaError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OrcaError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a retry has a chance of succeeding.
    ///
    /// Classifier rejections and terminal analysis failures are never
    /// transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OrcaError::SubmissionFailed { .. }
                | OrcaError::Transport(_)
                | OrcaError::PollTimeout { .. }
        )
    }

    /// HTTP status carried by the error, if any. Used for log context.
    pub fn status(&self) -> Option<u16> {
        match self {
            OrcaError::SubmissionFailed { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OrcaError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => OrcaError::SubmissionFailed {
                status: status.as_u16(),
            },
            None => OrcaError::Transport(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrcaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OrcaError::SubmissionFailed { status: 503 }.is_transient());
        assert!(OrcaError::Transport("reset".into()).is_transient());
        assert!(OrcaError::PollTimeout { waited_secs: 10 }.is_transient());
        assert!(!OrcaError::UnsupportedInput {
            path: "a.txt".into(),
            reason: "unknown extension".into()
        }
        .is_transient());
        assert!(!OrcaError::AnalysisFailed("bad image".into()).is_transient());
    }

    #[test]
    fn status_only_for_submission_failures() {
        assert_eq!(OrcaError::SubmissionFailed { status: 429 }.status(), Some(429));
        assert_eq!(OrcaError::Transport("x".into()).status(), None);
    }
}
