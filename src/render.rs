//! Chunk rendering.
//!
//! A [`ChunkWriter`] turns an in-memory [`DocumentChunk`] into a file. Each
//! entry becomes a level-1 heading (label), a level-2 heading (timestamp),
//! the text blocks, and a page break.
//!
//! - [`DocxWriter`]: Word document via `docx-rs`.
//! - [`TextWriter`]: plain UTF-8 text with form feeds as page breaks.

use docx_rs::{BreakType, Docx, Paragraph, Run, Style, StyleType};
use std::io::Write;
use std::path::Path;

use crate::config::OutputFormat;
use crate::error::{OrcaError, Result};
use crate::models::DocumentChunk;

pub trait ChunkWriter {
    fn extension(&self) -> &'static str;
    /// Write `chunk` to `path`, replacing any existing file.
    fn write(&self, chunk: &DocumentChunk, path: &Path) -> Result<()>;
}

pub fn writer_for(format: OutputFormat) -> Box<dyn ChunkWriter> {
    match format {
        OutputFormat::Docx => Box::new(DocxWriter),
        OutputFormat::Text => Box::new(TextWriter),
    }
}

/// Title line shown at the top of every chunk.
pub fn chunk_title(chunk: &DocumentChunk) -> String {
    format!(
        "{} (chunk {} of {})",
        chunk.collection, chunk.index, chunk.total
    )
}

// XML 1.0 forbids most control characters; OCR output occasionally has them.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

pub struct DocxWriter;

impl DocxWriter {
    fn build(chunk: &DocumentChunk) -> Docx {
        let mut docx = Docx::new()
            .add_style(
                Style::new("Title", StyleType::Paragraph)
                    .name("Title")
                    .size(40)
                    .bold(),
            )
            .add_style(
                Style::new("Heading1", StyleType::Paragraph)
                    .name("Heading 1")
                    .size(32)
                    .bold(),
            )
            .add_style(
                Style::new("Heading2", StyleType::Paragraph)
                    .name("Heading 2")
                    .size(26)
                    .bold(),
            )
            .add_paragraph(
                Paragraph::new()
                    .style("Title")
                    .add_run(Run::new().add_text(sanitize(&chunk_title(chunk)))),
            );

        for entry in &chunk.entries {
            docx = docx
                .add_paragraph(
                    Paragraph::new()
                        .style("Heading1")
                        .add_run(Run::new().add_text(sanitize(&entry.heading.label))),
                )
                .add_paragraph(
                    Paragraph::new()
                        .style("Heading2")
                        .add_run(Run::new().add_text(sanitize(entry.heading.timestamp_text()))),
                );

            for block in &entry.text.blocks {
                let mut run = Run::new();
                for (i, line) in sanitize(block).split('\n').enumerate() {
                    if i > 0 {
                        run = run.add_break(BreakType::TextWrapping);
                    }
                    run = run.add_text(line);
                }
                docx = docx.add_paragraph(Paragraph::new().add_run(run));
            }

            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
        }
        docx
    }
}

impl ChunkWriter for DocxWriter {
    fn extension(&self) -> &'static str {
        OutputFormat::Docx.extension()
    }

    fn write(&self, chunk: &DocumentChunk, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| OrcaError::io(path, e))?;
        Self::build(chunk)
            .build()
            .pack(file)
            .map_err(|e| OrcaError::Render(format!("{}: {}", path.display(), e)))
    }
}

pub struct TextWriter;

impl TextWriter {
    pub fn render(chunk: &DocumentChunk) -> String {
        let mut out = String::new();
        out.push_str(&chunk_title(chunk));
        out.push_str("\n\n");
        for entry in &chunk.entries {
            out.push_str(&entry.heading.label);
            out.push('\n');
            out.push_str(entry.heading.timestamp_text());
            out.push_str("\n\n");
            out.push_str(&entry.text.blocks.join("\n\n"));
            out.push_str("\n\u{c}\n");
        }
        out
    }
}

impl ChunkWriter for TextWriter {
    fn extension(&self) -> &'static str {
        OutputFormat::Text.extension()
    }

    fn write(&self, chunk: &DocumentChunk, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path).map_err(|e| OrcaError::io(path, e))?;
        file.write_all(Self::render(chunk).as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| OrcaError::io(path, e))
    }
}
