//! Result normalization across the service's result schemas.
//!
//! Different analysis models store their text under different keys. The
//! top-level key selects a [`ResultSchema`] variant, and each variant has its
//! own extraction function:
//!
//! | Discriminator | Variant | Text location |
//! |---------------|---------|---------------|
//! | `readResult` | [`ResultSchema::Read`] | `pages[*].lines[*]` or `blocks[*].lines[*]`, line text in `text` or `content` |
//! | `analyzeResult` | [`ResultSchema::Layout`] | `paragraphs[*].content` |
//! | neither | [`ResultSchema::Unknown`] | |
//!
//! `readResult` wins when a record carries both. Whatever the input,
//! [`normalize`] returns at least one block. When nothing can be recovered
//! the single block is [`NO_TEXT_RECOVERED`]. All text is folded to ASCII.

use serde_json::Value;

use crate::models::{ExtractionQuality, NormalizedText, SchemaKind};

/// Placeholder block for records with no recoverable text.
pub const NO_TEXT_RECOVERED: &str = "[No text recovered.]";

/// Keys tried, in order, for the page list of a read-style result.
const READ_PAGE_KEYS: [&str; 2] = ["pages", "blocks"];
/// Keys tried, in order, for a line's text.
const LINE_TEXT_KEYS: [&str; 2] = ["text", "content"];

/// A result record tagged by the schema it was recognized as.
#[derive(Debug, Clone, Copy)]
pub enum ResultSchema<'a> {
    /// Holds the `readResult` object.
    Read(&'a Value),
    /// Holds the `analyzeResult` object.
    Layout(&'a Value),
    Unknown,
}

impl<'a> ResultSchema<'a> {
    pub fn detect(record: &'a Value) -> Self {
        if let Some(read) = record.get("readResult") {
            ResultSchema::Read(read)
        } else if let Some(layout) = record.get("analyzeResult") {
            ResultSchema::Layout(layout)
        } else {
            ResultSchema::Unknown
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            ResultSchema::Read(_) => SchemaKind::Read,
            ResultSchema::Layout(_) => SchemaKind::Layout,
            ResultSchema::Unknown => SchemaKind::Unknown,
        }
    }
}

/// Blocks pulled out of a record plus a count of malformed elements.
struct Extraction {
    blocks: Vec<String>,
    dropped: usize,
}

/// Extract ordered text blocks from a result record.
pub fn normalize(record: &Value) -> NormalizedText {
    let schema = ResultSchema::detect(record);
    let extraction = match schema {
        ResultSchema::Read(read) => extract_read(read),
        ResultSchema::Layout(layout) => extract_layout(layout),
        ResultSchema::Unknown => {
            tracing::warn!("unrecognized result schema; no text recovered");
            None
        }
    };

    match extraction {
        Some(Extraction { blocks, dropped }) if !blocks.is_empty() => NormalizedText {
            blocks,
            quality: if dropped == 0 {
                ExtractionQuality::Full
            } else {
                ExtractionQuality::Partial
            },
            schema: schema.kind(),
        },
        other => {
            if other.is_none() && schema.kind() != SchemaKind::Unknown {
                tracing::warn!(schema = ?schema.kind(), "result is missing its expected text fields");
            }
            placeholder(schema.kind())
        }
    }
}

/// Normalized text for a record that could not be read at all.
pub fn placeholder(schema: SchemaKind) -> NormalizedText {
    NormalizedText {
        blocks: vec![NO_TEXT_RECOVERED.to_string()],
        quality: ExtractionQuality::Unrecoverable,
        schema,
    }
}

/// Fold to a plain-ASCII representation.
pub fn transliterate(text: &str) -> String {
    deunicode::deunicode(text)
}

fn extract_read(read: &Value) -> Option<Extraction> {
    let pages = READ_PAGE_KEYS
        .iter()
        .find_map(|key| read.get(*key))?
        .as_array()?;

    let mut blocks = Vec::new();
    let mut dropped = 0;
    for page in pages {
        let Some(lines) = page.get("lines").and_then(|l| l.as_array()) else {
            dropped += 1;
            continue;
        };
        let mut texts = Vec::with_capacity(lines.len());
        for line in lines {
            match line_text(line) {
                Some(text) => texts.push(transliterate(text)),
                None => dropped += 1,
            }
        }
        if !texts.is_empty() {
            blocks.push(texts.join("\n"));
        }
    }
    Some(Extraction { blocks, dropped })
}

fn line_text(line: &Value) -> Option<&str> {
    LINE_TEXT_KEYS
        .iter()
        .find_map(|key| line.get(*key).and_then(|v| v.as_str()))
}

fn extract_layout(layout: &Value) -> Option<Extraction> {
    let paragraphs = layout.get("paragraphs")?.as_array()?;

    let mut blocks = Vec::with_capacity(paragraphs.len());
    let mut dropped = 0;
    for paragraph in paragraphs {
        match paragraph.get("content").and_then(|c| c.as_str()) {
            Some(content) if content.trim().is_empty() => {}
            Some(content) => blocks.push(transliterate(content)),
            None => dropped += 1,
        }
    }
    Some(Extraction { blocks, dropped })
}
