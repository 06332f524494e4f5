//! Grouping of top-level nodes into sections.

use crate::config::SectionSplit;
use crate::model::{Document, DocumentNode, NodeKind};
use std::ops::Range;

/// A contiguous range of top-level nodes that paginates as one block.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    /// Position in section order
    pub index: usize,
    /// Index of the first top-level node in the section
    pub start: usize,
    /// Nodes in the range
    pub nodes: &'a [DocumentNode],
}

impl<'a> Section<'a> {
    /// Range of top-level node indices covered by this section.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.nodes.len()
    }
}

/// Split a document into sections.
pub fn split_sections(document: &Document, mode: SectionSplit) -> Vec<Section<'_>> {
    let nodes = &document.nodes;
    let mut ranges: Vec<Range<usize>> = Vec::new();

    match mode {
        SectionSplit::PerNode => {
            ranges.extend((0..nodes.len()).map(|i| i..i + 1));
        },
        SectionSplit::ByHeading => {
            let mut start = 0;
            for (i, node) in nodes.iter().enumerate() {
                if i > start && matches!(node.kind, NodeKind::Heading { .. }) {
                    ranges.push(start..i);
                    start = i;
                }
            }
            if start < nodes.len() {
                ranges.push(start..nodes.len());
            }
        },
    }

    ranges
        .into_iter()
        .enumerate()
        .map(|(index, range)| Section {
            index,
            start: range.start,
            nodes: &nodes[range],
        })
        .collect()
}
