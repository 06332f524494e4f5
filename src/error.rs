//! Error types for the export pipeline.
//!
//! [`Error`] covers failures that abort an export. Failures the pipeline
//! recovers from locally are reported as [`Diagnostic`] values instead and
//! travel with the finished artifact.

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort an export or a snapshot read.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document has no top-level sections to export
    #[error("No sections found in document")]
    NoSections,

    /// The top-level conversion step failed
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Another export of the same session is still running
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Editor snapshot could not be turned into a document
    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    /// Invalid export configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// DOCX package could not be written
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML/HTML parsing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// A failure the pipeline recovered from.
///
/// Measurement failures drop the affected block from pagination; render
/// failures leave the affected page blank. Neither stops the export.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A block could not be measured (zero, negative or non-finite height)
    MeasurementFailure {
        /// Index of the block in section order
        block: usize,
        /// What went wrong
        reason: String,
    },
    /// A page could not be rendered to a bitmap
    RenderFailure {
        /// Zero-based index of the page group
        page: usize,
        /// What went wrong
        reason: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MeasurementFailure { block, reason } => {
                write!(f, "block {} skipped: {}", block, reason)
            },
            Diagnostic::RenderFailure { page, reason } => {
                write!(f, "page {} left blank: {}", page + 1, reason)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sections_error() {
        let msg = format!("{}", Error::NoSections);
        assert!(msg.contains("No sections"));
    }

    #[test]
    fn test_conversion_error() {
        let err = Error::Conversion("layout exploded".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Conversion failed"));
        assert!(msg.contains("layout exploded"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::RenderFailure {
            page: 2,
            reason: "zero-area bitmap".to_string(),
        };
        assert_eq!(diag.to_string(), "page 3 left blank: zero-area bitmap");

        let diag = Diagnostic::MeasurementFailure {
            block: 0,
            reason: "height 0".to_string(),
        };
        assert!(diag.to_string().starts_with("block 0 skipped"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
