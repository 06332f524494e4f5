//! Readers for editor snapshots.
//!
//! A snapshot is the persisted state of the rich-text editor, either as the
//! editor's JSON tree or as the HTML it renders. Both readers produce a
//! [`Document`]; nodes they do not understand are skipped.

mod html;
mod json;

pub use html::from_html;
pub use json::from_json;

use crate::error::{Error, Result};
use crate::model::Document;
use std::path::Path;

/// Snapshot encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// ProseMirror / TipTap JSON
    Json,
    /// Editor HTML
    Html,
}

impl SnapshotFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(SnapshotFormat::Json),
            "html" | "htm" | "xhtml" => Some(SnapshotFormat::Html),
            _ => None,
        }
    }

    /// Guess the format from content: JSON starts with `{`.
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            SnapshotFormat::Json
        } else {
            SnapshotFormat::Html
        }
    }
}

/// Parse snapshot content in the given format.
pub fn parse(content: &str, format: SnapshotFormat) -> Result<Document> {
    match format {
        SnapshotFormat::Json => from_json(content),
        SnapshotFormat::Html => from_html(content),
    }
}

/// Read a snapshot file, choosing the reader by extension or content.
pub fn read_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Snapshot(format!("cannot read '{}': {}", path.display(), e))
    })?;
    let format = SnapshotFormat::from_path(path).unwrap_or_else(|| SnapshotFormat::sniff(&content));
    log::debug!("Reading {:?} snapshot from {}", format, path.display());
    parse(&content, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SnapshotFormat::from_path(Path::new("draft.JSON")),
            Some(SnapshotFormat::Json)
        );
        assert_eq!(
            SnapshotFormat::from_path(Path::new("draft.htm")),
            Some(SnapshotFormat::Html)
        );
        assert_eq!(SnapshotFormat::from_path(Path::new("draft")), None);
        assert_eq!(SnapshotFormat::sniff("  {\"type\":\"doc\"}"), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::sniff("<p>x</p>"), SnapshotFormat::Html);
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposal.snapshot");
        std::fs::write(&path, "<h2>Approach</h2><p>Phased delivery</p>").unwrap();
        let doc = read_file(&path).unwrap();
        assert_eq!(doc.nodes.len(), 2);

        let missing = read_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(Error::Snapshot(_))));
    }
}
