//! # Orca CLI (`orca`)
//!
//! Front end for the two pipeline stages: sending image directories to the
//! analysis service, and assembling the resulting records into documents.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `orca analyze <dir>...` | OCR every supported image; one `<stem>.json` per image |
//! | `orca assemble <dir>...` | Build chunked documents from a directory of records |
//! | `orca classify <file>...` | Print the media type detected for each file |
//!
//! ## Examples
//!
//! ```bash
//! # OCR a month of photos; results land in data/2022-11/prebuilt-read/
//! ORCA_API_KEY=... orca analyze data/2022-11 --config ./config/orca.toml
//!
//! # Build Word documents of at most 1000 sections each
//! orca assemble data/2022-11/prebuilt-read --chunk-size 1000
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use orca::analyze::BatchAnalyzer;
use orca::assemble::Assembler;
use orca::classify::classify;
use orca::config::{self, Config, OutputFormat};
use orca::logging;
use orca::progress::ProgressMode;
use orca::submit::OcrClient;

/// Orca: batch OCR of scanned images into chunked, searchable documents.
#[derive(Parser)]
#[command(
    name = "orca",
    about = "Batch OCR of scanned images into chunked, searchable documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Required for `analyze`. Other commands fall back to defaults when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/orca.toml")]
    config: PathBuf,

    /// Debug-level logging for orca itself (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send every supported image in each directory to the analysis service.
    ///
    /// Images that already have a result record are skipped, so an
    /// interrupted run can be restarted safely.
    Analyze {
        /// Directories containing images.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Result directory (default: `<path>/<service.output_label>`).
        /// Only valid with a single input directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Progress output on stderr: `off`, `human`, or `json`.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// Assemble result records into chunked documents.
    Assemble {
        /// Directories containing `*.json` result records.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output directory (default: `<path>/megadoc`).
        /// Only valid with a single input directory.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Collection name used in chunk filenames (default: parent directory name).
        #[arg(long)]
        name: Option<String>,

        /// Maximum sections per chunk document.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Output format.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Do not bundle the chunks into a zip archive.
        #[arg(long)]
        no_archive: bool,

        /// Progress output on stderr: `off`, `human`, or `json`.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// Print the detected media type of each file, or `unsupported`.
    Classify {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Docx,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Docx => OutputFormat::Docx,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

/// Parse a `--progress` value.
fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}': expected off, human, or json", s))
}

fn progress_mode(arg: Option<ProgressMode>) -> ProgressMode {
    arg.unwrap_or_else(ProgressMode::default_for_tty)
}

/// Load the config file, or defaults when it does not exist.
fn load_or_default(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Analyze {
            paths,
            out,
            progress,
        } => {
            let cfg = config::load_config(&cli.config)?;
            cfg.validate_service()?;
            if out.is_some() && paths.len() > 1 {
                bail!("--out can only be used with a single input directory");
            }

            let client = OcrClient::new(&cfg).context("Failed to create OCR client")?;
            let reporter = progress_mode(progress).reporter();
            let analyzer = BatchAnalyzer::new(&cfg, &client, reporter.as_ref());

            for path in &paths {
                let dest = out
                    .clone()
                    .unwrap_or_else(|| path.join(cfg.service.output_label()));
                let report = analyzer
                    .run(path, &dest)
                    .with_context(|| format!("analyze {} failed", path.display()))?;

                println!("analyze {}", path.display());
                println!("  results: {}", dest.display());
                println!("  images found: {}", report.total);
                println!("  analyzed: {}", report.analyzed);
                println!("  skipped (already processed): {}", report.skipped);
                println!("  unsupported: {}", report.unsupported);
                println!("  retries exhausted: {}", report.exhausted);
                println!("  failed: {}", report.failed);
                println!("ok");
            }
        }
        Commands::Assemble {
            paths,
            out,
            name,
            chunk_size,
            format,
            no_archive,
            progress,
        } => {
            let mut cfg = load_or_default(&cli.config)?;
            if let Some(size) = chunk_size {
                cfg.assembly.chunk_size = size;
            }
            if let Some(format) = format {
                cfg.assembly.format = format.into();
            }
            if no_archive {
                cfg.assembly.archive = false;
            }
            cfg.validate()?;
            if out.is_some() && paths.len() > 1 {
                bail!("--out can only be used with a single input directory");
            }

            let reporter = progress_mode(progress).reporter();
            for path in &paths {
                let mut assembler = Assembler::new(&cfg.assembly, reporter.as_ref());
                if let Some(dir) = &out {
                    assembler = assembler.out_dir(dir);
                }
                if let Some(name) = &name {
                    assembler = assembler.collection(name);
                }
                let report = assembler
                    .run(path)
                    .with_context(|| format!("assemble {} failed", path.display()))?;

                println!("assemble {}", path.display());
                println!("  records: {}", report.records);
                println!("  no text recovered: {}", report.unrecoverable);
                println!("  chunks written: {}", report.chunks.len());
                for chunk in &report.chunks {
                    println!("    {}", chunk.display());
                }
                if let Some(archive) = &report.archive {
                    println!("  archive: {}", archive.display());
                }
                println!("ok");
            }
        }
        Commands::Classify { files } => {
            let cfg = load_or_default(&cli.config)?;
            for file in &files {
                match classify(file, &cfg.classifier) {
                    Ok(media) => println!("{}\t{}", file.display(), media),
                    Err(_) => println!("{}\tunsupported", file.display()),
                }
            }
        }
    }

    Ok(())
}
