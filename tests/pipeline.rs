use serde_json::{json, Value};
use std::cell::Cell;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use orca::analyze::BatchAnalyzer;
use orca::assemble::Assembler;
use orca::config::{AssemblyConfig, Config, ExhaustionPolicy, OutputFormat};
use orca::error::{OrcaError, Result};
use orca::models::{JobStatus, MediaType};
use orca::progress::NoProgress;
use orca::submit::Submitter;

/// Answers every submission with a layout result naming the call number.
struct CountingSubmitter {
    calls: Cell<usize>,
}

impl CountingSubmitter {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl Submitter for CountingSubmitter {
    fn submit(&self, _image: &[u8], _media: MediaType) -> Result<Value> {
        self.calls.set(self.calls.get() + 1);
        Ok(json!({"analyzeResult": {"paragraphs": [{"content": format!("call {}", self.calls.get())}]}}))
    }
}

/// Always fails with a transient HTTP status.
struct FailingSubmitter {
    calls: Cell<usize>,
}

impl Submitter for FailingSubmitter {
    fn submit(&self, _image: &[u8], _media: MediaType) -> Result<Value> {
        self.calls.set(self.calls.get() + 1);
        Err(OrcaError::SubmissionFailed { status: 503 })
    }
}

fn config(on_exhausted: ExhaustionPolicy) -> Config {
    let mut config = Config::minimal();
    config.retry.max_attempts = 3;
    config.retry.delay_seconds = 0.0;
    config.retry.on_exhausted = on_exhausted;
    config
}

fn images(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), b"\x89PNG fake image bytes").unwrap();
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn second_run_makes_no_calls_and_keeps_records() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("2022-11");
    let dest = source.join("prebuilt-read");
    images(&source, &["a1.png", "a10.jpg", "a2.png", "notes.txt"]);

    let submitter = CountingSubmitter::new();
    let cfg = config(ExhaustionPolicy::Skip);
    let analyzer = BatchAnalyzer::new(&cfg, &submitter, &NoProgress);

    let first = analyzer.run(&source, &dest).unwrap();
    assert_eq!(submitter.calls.get(), 3);
    assert_eq!(first.analyzed, 3);
    assert_eq!(first.unsupported, 1);

    // Natural order: a1, a2, a10.
    assert!(read(&dest.join("a1.json")).contains("call 1"));
    assert!(read(&dest.join("a2.json")).contains("call 2"));
    assert!(read(&dest.join("a10.json")).contains("call 3"));
    let before: Vec<String> = ["a1", "a2", "a10"]
        .iter()
        .map(|s| read(&dest.join(format!("{}.json", s))))
        .collect();

    let second = analyzer.run(&source, &dest).unwrap();
    assert_eq!(submitter.calls.get(), 3, "no new submissions on rerun");
    assert_eq!(second.skipped, 3);
    assert_eq!(second.analyzed, 0);
    assert!(second.jobs.is_empty());

    let after: Vec<String> = ["a1", "a2", "a10"]
        .iter()
        .map(|s| read(&dest.join(format!("{}.json", s))))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn existing_record_is_left_untouched() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("imgs");
    let dest = tmp.path().join("out");
    images(&source, &["foo.png", "bar.png"]);
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("foo.json"), r#"{"keep": true}"#).unwrap();

    let submitter = CountingSubmitter::new();
    let cfg = config(ExhaustionPolicy::Skip);
    let report = BatchAnalyzer::new(&cfg, &submitter, &NoProgress)
        .run(&source, &dest)
        .unwrap();

    assert_eq!(submitter.calls.get(), 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(read(&dest.join("foo.json")), r#"{"keep": true}"#);
    assert!(dest.join("bar.json").exists());
}

#[test]
fn skip_policy_writes_empty_record_after_bounded_attempts() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("imgs");
    let dest = tmp.path().join("out");
    images(&source, &["one.png", "two.png"]);

    let submitter = FailingSubmitter {
        calls: Cell::new(0),
    };
    let cfg = config(ExhaustionPolicy::Skip);
    let report = BatchAnalyzer::new(&cfg, &submitter, &NoProgress)
        .run(&source, &dest)
        .unwrap();

    assert_eq!(submitter.calls.get(), 6, "three attempts per image");
    assert_eq!(report.exhausted, 2);
    assert!(report
        .jobs
        .iter()
        .all(|j| j.status == JobStatus::ExhaustedRetries && j.attempts == 3));

    let record: Value = serde_json::from_str(&read(&dest.join("one.json"))).unwrap();
    assert_eq!(record, json!({}));
}

#[test]
fn skip_policy_without_persisting_retries_next_run() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("imgs");
    let dest = tmp.path().join("out");
    images(&source, &["one.png"]);

    let mut cfg = config(ExhaustionPolicy::Skip);
    cfg.retry.persist_exhausted = false;

    let failing = FailingSubmitter {
        calls: Cell::new(0),
    };
    BatchAnalyzer::new(&cfg, &failing, &NoProgress)
        .run(&source, &dest)
        .unwrap();
    assert!(!dest.join("one.json").exists());

    let working = CountingSubmitter::new();
    let report = BatchAnalyzer::new(&cfg, &working, &NoProgress)
        .run(&source, &dest)
        .unwrap();
    assert_eq!(working.calls.get(), 1);
    assert_eq!(report.analyzed, 1);
    assert!(dest.join("one.json").exists());
}

#[test]
fn abort_policy_halts_the_batch() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("imgs");
    let dest = tmp.path().join("out");
    images(&source, &["p1.png", "p2.png", "p3.png"]);

    let submitter = FailingSubmitter {
        calls: Cell::new(0),
    };
    let cfg = config(ExhaustionPolicy::Abort);
    let err = BatchAnalyzer::new(&cfg, &submitter, &NoProgress)
        .run(&source, &dest)
        .unwrap_err();

    assert!(matches!(err, OrcaError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(submitter.calls.get(), 3, "nothing after the first image");
    assert!(!dest.join("p1.json").exists());
    assert!(!dest.join("p2.json").exists());
}

fn timestamped_records(dir: &Path, count: usize) -> Vec<String> {
    fs::create_dir_all(dir).unwrap();
    let labels: Vec<String> = (1..=count).map(|n| format!("IMG_{:04}", n)).collect();
    // Written out of order; assembly must not depend on creation order.
    for n in (1..=count).rev() {
        let name = format!("2022-11-{:02}_09-15-00_{}.json", n, labels[n - 1]);
        let body = json!({"analyzeResult": {"paragraphs": [{"content": format!("text of day {}", n)}]}});
        fs::write(dir.join(name), body.to_string()).unwrap();
    }
    labels
}

fn text_assembler(chunk_size: usize, archive: bool) -> AssemblyConfig {
    AssemblyConfig {
        chunk_size,
        format: OutputFormat::Text,
        archive,
    }
}

#[test]
fn twelve_records_make_three_ordered_chunks() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("2022-11").join("prebuilt-read");
    let labels = timestamped_records(&data, 12);

    let report = Assembler::new(&text_assembler(5, true), &NoProgress)
        .run(&data)
        .unwrap();
    assert_eq!(report.records, 12);
    assert_eq!(report.unrecoverable, 0);

    let out = data.join("megadoc");
    let expected: Vec<PathBuf> = ["2022-11_01of03.txt", "2022-11_02of03.txt", "2022-11_03of03.txt"]
        .iter()
        .map(|n| out.join(n))
        .collect();
    assert_eq!(report.chunks, expected);
    assert!(!out.join("2022-11_04of03.txt").exists());

    let sizes: Vec<usize> = expected
        .iter()
        .map(|p| read(p).matches('\u{c}').count())
        .collect();
    assert_eq!(sizes, vec![5, 5, 2]);

    // Labels appear in timestamp order across the whole chunk set.
    let all: String = expected.iter().map(|p| read(p)).collect();
    let mut last = 0;
    for label in &labels {
        let pos = all.find(label.as_str()).unwrap();
        assert!(pos >= last, "{} out of order", label);
        last = pos;
    }
    assert!(all.contains("November 01, 2022 at 09:15 AM"));
    assert!(all.contains("text of day 12"));

    let archive = report.archive.unwrap();
    assert_eq!(archive, out.join("2022-11_prebuilt-read.zip"));
    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.len(), 3);
    let mut first = String::new();
    zip.by_name("2022-11_01of03.txt")
        .unwrap()
        .read_to_string(&mut first)
        .unwrap();
    assert_eq!(first, read(&expected[0]));
}

#[test]
fn unrecoverable_records_still_get_a_section() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("album").join("read");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("scan1.json"), "{}").unwrap();
    fs::write(data.join("scan2.json"), r#"{"readResult": {"blocks": []}}"#).unwrap();

    let report = Assembler::new(&text_assembler(10, false), &NoProgress)
        .run(&data)
        .unwrap();
    assert_eq!(report.unrecoverable, 2);
    assert!(report.archive.is_none());

    let text = read(&report.chunks[0]);
    assert!(text.contains("scan1.json"));
    assert!(text.contains("[No timestamp.]"));
    assert_eq!(text.matches("[No text recovered.]").count(), 2);
}

#[test]
fn analyze_then_assemble() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("trip");
    let dest = source.join("prebuilt-read");
    images(&source, &["2023-05-01_14-30-00_beach.jpg", "2023-05-02_08-00-00_hill.png"]);

    let submitter = CountingSubmitter::new();
    BatchAnalyzer::new(&config(ExhaustionPolicy::Skip), &submitter, &NoProgress)
        .run(&source, &dest)
        .unwrap();

    let report = Assembler::new(&text_assembler(5000, true), &NoProgress)
        .run(&dest)
        .unwrap();
    assert_eq!(report.chunks, vec![dest.join("megadoc").join("trip_01of01.txt")]);

    let text = read(&report.chunks[0]);
    let beach = text.find("beach").unwrap();
    let hill = text.find("hill").unwrap();
    assert!(beach < hill);
    assert!(text.contains("May 01, 2023 at 02:30 PM"));
    assert!(text.contains("call 1"));
}
