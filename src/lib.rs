// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # rfpress
//!
//! Export pipeline for rich-text proposal documents.
//!
//! A document authored in a rich-text editor is exported two ways:
//!
//! - **Raster PDF**: top-level sections are measured at the page content
//!   width, packed greedily into pages, rendered to bitmaps and embedded as
//!   one full-width image per page.
//! - **Structured DOCX**: a single linear walk emits editable paragraphs with
//!   styled runs (bold, italic, underline, size, color, font, alignment).
//!
//! Both exporters read styles through one [`style::StyleResolver`], so the
//! same snapshot produces the same styles in both outputs.
//!
//! ## Architecture
//!
//! ```text
//! editor snapshot (JSON / HTML)
//!     ↓ snapshot
//! Document ──→ StyleResolver ──┬──→ Rasterizer → Paginator → PdfWriter  (PDF)
//!                              └──→ structured walk → DOCX package       (DOCX)
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use rfpress::{ExportConfig, ExportSession};
//! use rfpress::rendering::SkiaRasterizer;
//!
//! # fn main() -> rfpress::Result<()> {
//! let document = rfpress::snapshot::read_file("proposal.json")?;
//! let session = ExportSession::new(ExportConfig::default());
//!
//! let pdf = session.export_pdf(&document, &mut SkiaRasterizer::new())?;
//! pdf.save_in("out")?;
//!
//! let docx = session.export_docx(&document)?;
//! docx.save_in("out")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `rendering` (default): the `tiny-skia` rasterizer
//! - `cli` (default): the `rfpress` command line tool
//! - `async`: `export_pdf_async`, yielding to tokio between pages
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Document model and style resolution
pub mod model;
pub mod style;

// Editor snapshot readers
pub mod snapshot;

// Section splitting and pagination
pub mod layout;

// Rasterization of sections
pub mod rendering;

// PDF objects and writing
pub mod object;
pub mod writer;

// Exporters and session
pub mod export;

// Re-exports
pub use config::{ExportConfig, PageImageEncoding, PageSize, SectionSplit};
pub use error::{Diagnostic, Error, Result};
pub use export::{
    ExportArtifact, ExportFormat, ExportListener, ExportSession, ExportState, LogListener,
    RasterExporter, StructuredExporter,
};
pub use model::{Document, DocumentNode, NodeKind, TextRun};
