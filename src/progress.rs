//! Analyze and assemble progress reporting.
//!
//! Reports position/total while a batch runs so users can see how far along a
//! directory is. Progress goes to **stderr** so stdout stays parseable for
//! scripts. Reporting never alters control flow.

use std::io::Write;
use std::path::Path;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// An image is about to be submitted.
    Analyzing { item: String, n: u64, total: u64 },
    /// An image already has a result record.
    Skipped { item: String, n: u64, total: u64 },
    /// A record was added to the chunk being built.
    Assembling {
        item: String,
        n: u64,
        total: u64,
        chunk: usize,
        chunks: usize,
    },
    /// A chunk document was written.
    ChunkSaved { file: String, chunk: usize, chunks: usize },
}

impl ProgressEvent {
    pub fn analyzing(path: &Path, n: usize, total: usize) -> Self {
        ProgressEvent::Analyzing {
            item: path.display().to_string(),
            n: n as u64,
            total: total as u64,
        }
    }

    pub fn skipped(path: &Path, n: usize, total: usize) -> Self {
        ProgressEvent::Skipped {
            item: path.display().to_string(),
            n: n as u64,
            total: total as u64,
        }
    }
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "analyze  scan_12.png  (12 / 340)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Analyzing { item, n, total } => format!(
                "analyze  {}  ({} / {})\n",
                item,
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Skipped { item, n, total } => format!(
                "skip     {}  ({} / {}) already processed\n",
                item,
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Assembling {
                item,
                n,
                total,
                chunk,
                chunks,
            } => format!(
                "assemble {}  ({} / {})  chunk {} of {}\n",
                item,
                format_number(*n),
                format_number(*total),
                chunk,
                chunks
            ),
            ProgressEvent::ChunkSaved {
                file,
                chunk,
                chunks,
            } => format!("saved    {}  (chunk {} of {})\n", file, chunk, chunks),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Analyzing { item, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "analyzing",
                "item": item,
                "n": n,
                "total": total
            }),
            ProgressEvent::Skipped { item, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "skipped",
                "item": item,
                "n": n,
                "total": total
            }),
            ProgressEvent::Assembling {
                item,
                n,
                total,
                chunk,
                chunks,
            } => serde_json::json!({
                "event": "progress",
                "phase": "assembling",
                "item": item,
                "n": n,
                "total": total,
                "chunk": chunk,
                "chunks": chunks
            }),
            ProgressEvent::ChunkSaved {
                file,
                chunk,
                chunks,
            } => serde_json::json!({
                "event": "chunk_saved",
                "file": file,
                "chunk": chunk,
                "chunks": chunks
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_000), "12,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("off"), Some(ProgressMode::Off));
        assert_eq!(ProgressMode::parse("loud"), None);
    }
}
