//! # Orca
//!
//! Batch OCR for scanned image collections.
//!
//! Orca drives a remote document-analysis service over a directory of
//! images, keeps one JSON result record per image, and then assembles those
//! records into chunked, paginated documents with one headed section per
//! image.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌──────────────┐   ┌────────────┐
//! │  classify  │──▶│   submit   │──▶│    retry     │──▶│  analyze   │
//! │ media type │   │ sync/async │   │ skip / abort │   │ <stem>.json│
//! └────────────┘   └────────────┘   └──────────────┘   └─────┬──────┘
//!                                                            │
//!                  ┌────────────┐   ┌──────────────┐         │
//!                  │  assemble  │◀──│  normalize   │◀────────┘
//!                  │ chunks+zip │   │ read/layout  │
//!                  └────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! orca analyze data/2022-11                # writes data/2022-11/<model>/*.json
//! orca assemble data/2022-11/prebuilt-read # writes .../megadoc/2022-11_01of01.docx
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`classify`] | Input classification |
//! | [`submit`] | Remote job submission and polling |
//! | [`retry`] | Bounded retry policy |
//! | [`analyze`] | Batch analysis of a directory |
//! | [`normalize`] | Result schema normalization |
//! | [`heading`] | Filename-derived headings |
//! | [`assemble`] | Chunked document assembly |
//! | [`render`] | Chunk output formats |
//! | [`archive`] | Zip packaging |

pub mod analyze;
pub mod archive;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod error;
pub mod heading;
pub mod logging;
pub mod models;
pub mod natsort;
pub mod normalize;
pub mod progress;
pub mod render;
pub mod retry;
pub mod store;
pub mod submit;
