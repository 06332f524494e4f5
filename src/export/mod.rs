//! Export front end.
//!
//! [`ExportSession`] is what a host calls: it guards against overlapping
//! exports, runs the [`RasterExporter`] or [`StructuredExporter`], names the
//! output file, tracks the export state and notifies an [`ExportListener`].
//!
//! ```ignore
//! use rfpress::export::ExportSession;
//! use rfpress::rendering::SkiaRasterizer;
//!
//! let session = ExportSession::new(ExportConfig::default());
//! let pdf = session.export_pdf(&document, &mut SkiaRasterizer::new())?;
//! pdf.save_in("out")?;
//! let docx = session.export_docx(&document)?;
//! docx.save_in("out")?;
//! ```

pub mod docx;
mod raster;
mod structured;

pub use raster::{RasterExporter, RasterOutput, RasterRun};
pub use structured::{
    ParagraphRecord, ParagraphStyle, RunRecord, StructuredExporter, StructuredOutput,
};

use crate::config::ExportConfig;
use crate::error::{Diagnostic, Error, Result};
use crate::model::Document;
use crate::rendering::Rasterizer;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Longest file stem produced from a title.
const MAX_STEM_CHARS: usize = 120;

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Paginated raster PDF
    Pdf,
    /// Structured word-processing document
    Docx,
}

impl ExportFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    /// MIME type of the output.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            },
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "DOCX",
        })
    }
}

/// A finished export, ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// Suggested file name, extension included
    pub file_name: String,
    /// File content
    pub bytes: Vec<u8>,
    /// Format of `bytes`
    pub format: ExportFormat,
    /// Pages (PDF) or paragraphs (DOCX)
    pub units: usize,
    /// Failures recovered from during the export
    pub diagnostics: Vec<Diagnostic>,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its file name.
    pub fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        log::info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Build an output file name from a user-supplied title.
///
/// Characters that are unsafe in file names are replaced with `_` and runs
/// of whitespace collapse to one space. An absent or unusable title falls
/// back to `default_stem`.
pub fn file_name(title: Option<&str>, default_stem: &str, format: ExportFormat) -> String {
    let stem = title
        .map(sanitize_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| {
            let fallback = sanitize_stem(default_stem);
            if fallback.is_empty() {
                "document".to_string()
            } else {
                fallback
            }
        });
    format!("{}.{}", stem, format.extension())
}

fn sanitize_stem(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == '.' || c == ' ')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Host notifications about finished exports.
pub trait ExportListener: Send + Sync {
    /// An export produced an artifact.
    fn on_success(&self, artifact: &ExportArtifact);

    /// An export aborted; no artifact was produced.
    fn on_failure(&self, format: ExportFormat, error: &Error);
}

/// Listener that reports through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl ExportListener for LogListener {
    fn on_success(&self, artifact: &ExportArtifact) {
        log::info!(
            "{} export ready: {} ({} units, {} diagnostics)",
            artifact.format,
            artifact.file_name,
            artifact.units,
            artifact.diagnostics.len()
        );
        for diagnostic in &artifact.diagnostics {
            log::warn!("{}", diagnostic);
        }
    }

    fn on_failure(&self, format: ExportFormat, error: &Error) {
        log::error!("{} export failed: {}", format, error);
    }
}

/// Lifecycle of the most recent export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    /// Nothing exported yet
    #[default]
    Idle,
    /// An export is running
    Walking,
    /// The last export produced an artifact
    Succeeded,
    /// The last export aborted
    Failed,
}

/// Releases the session's busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs exports for a host, one at a time.
pub struct ExportSession {
    config: ExportConfig,
    busy: AtomicBool,
    state: Mutex<ExportState>,
    listener: Box<dyn ExportListener>,
}

impl std::fmt::Debug for ExportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSession")
            .field("config", &self.config)
            .field("busy", &self.is_busy())
            .field("state", &self.state())
            .finish()
    }
}

impl ExportSession {
    /// Create a session that logs outcomes.
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            busy: AtomicBool::new(false),
            state: Mutex::new(ExportState::Idle),
            listener: Box::new(LogListener),
        }
    }

    /// Replace the listener.
    pub fn with_listener(mut self, listener: impl ExportListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// State of the most recent export.
    pub fn state(&self) -> ExportState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an export is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_state(&self, state: ExportState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn file_name(&self, document: &Document, format: ExportFormat) -> String {
        file_name(document.title.as_deref(), &self.config.default_file_stem, format)
    }

    /// Record the outcome of an export and notify the listener.
    fn conclude(
        &self,
        format: ExportFormat,
        outcome: Result<ExportArtifact>,
    ) -> Result<ExportArtifact> {
        match &outcome {
            Ok(artifact) => {
                self.set_state(ExportState::Succeeded);
                self.listener.on_success(artifact);
            },
            Err(e) => {
                self.set_state(ExportState::Failed);
                self.listener.on_failure(format, e);
            },
        }
        outcome
    }

    fn pdf_artifact(&self, document: &Document, output: RasterOutput) -> ExportArtifact {
        ExportArtifact {
            file_name: self.file_name(document, ExportFormat::Pdf),
            bytes: output.bytes,
            format: ExportFormat::Pdf,
            units: output.pages,
            diagnostics: output.diagnostics,
        }
    }

    /// Export the document as a paginated raster PDF.
    pub fn export_pdf<R: Rasterizer + ?Sized>(
        &self,
        document: &Document,
        rasterizer: &mut R,
    ) -> Result<ExportArtifact> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        self.set_state(ExportState::Walking);
        log::info!("Starting PDF export of {} nodes", document.node_count());

        let outcome = RasterExporter::new(self.config.clone())
            .export(document, rasterizer)
            .map(|output| self.pdf_artifact(document, output));
        self.conclude(ExportFormat::Pdf, outcome)
    }

    /// Export the document as a paginated raster PDF, yielding between pages.
    #[cfg(feature = "async")]
    #[cfg_attr(docsrs, doc(cfg(feature = "async")))]
    pub async fn export_pdf_async<R: Rasterizer + ?Sized>(
        &self,
        document: &Document,
        rasterizer: &mut R,
    ) -> Result<ExportArtifact> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        self.set_state(ExportState::Walking);
        log::info!("Starting PDF export of {} nodes", document.node_count());

        let exporter = RasterExporter::new(self.config.clone());
        let outcome = exporter
            .export_async(document, rasterizer)
            .await
            .map(|output| self.pdf_artifact(document, output));
        self.conclude(ExportFormat::Pdf, outcome)
    }

    /// Export the document as DOCX.
    pub fn export_docx(&self, document: &Document) -> Result<ExportArtifact> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        self.set_state(ExportState::Walking);
        log::info!("Starting DOCX export of {} nodes", document.node_count());

        let outcome = StructuredExporter::new(self.config.clone())
            .export(document)
            .map(|output| ExportArtifact {
                file_name: self.file_name(document, ExportFormat::Docx),
                bytes: output.bytes,
                format: ExportFormat::Docx,
                units: output.paragraphs,
                diagnostics: Vec::new(),
            });
        self.conclude(ExportFormat::Docx, outcome)
    }
}
