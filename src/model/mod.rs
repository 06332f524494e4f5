//! Document model: the tree of user-authored rich-text content.
//!
//! A [`Document`] is an immutable snapshot handed to the exporters by
//! reference. Exporters only read it; nothing in the export path takes
//! `&mut Document`.

mod attrs;
mod node;

pub use attrs::{BlockAttrs, Marks, StyleOverrides, TextAlign};
pub use node::{DocumentNode, ImageSource, NodeKind, TextRun};

/// Root of a document snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// User-supplied title, used for file naming and metadata
    pub title: Option<String>,
    /// Top-level nodes in order
    pub nodes: Vec<DocumentNode>,
}

impl Document {
    /// Create a document from top-level nodes.
    pub fn new(nodes: Vec<DocumentNode>) -> Self {
        Self { title: None, nodes }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Whether the document has no top-level nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(DocumentNode::node_count).sum()
    }
}
