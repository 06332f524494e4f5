//! Greedy pagination of measured blocks.
//!
//! Blocks are packed in order; a block is never split and never moved ahead
//! of its predecessors. A page is closed when the next block would overflow
//! it, unless the page is still empty, which is how a block taller than the
//! budget ends up alone on its own page.

use crate::error::Diagnostic;
use std::ops::Range;

/// A block with its measured height.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    /// Position in section order
    pub index: usize,
    /// Top-level node range the block was rendered from
    pub source: Range<usize>,
    /// Measured height in CSS pixels
    pub height_px: f32,
}

impl RenderedBlock {
    /// Create a measured block.
    pub fn new(index: usize, source: Range<usize>, height_px: f32) -> Self {
        Self {
            index,
            source,
            height_px,
        }
    }
}

/// Blocks assigned to one output page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageGroup {
    /// Blocks in order
    pub blocks: Vec<RenderedBlock>,
}

impl PageGroup {
    /// Cumulative height of the blocks.
    pub fn height_px(&self) -> f32 {
        self.blocks.iter().map(|b| b.height_px).sum()
    }

    /// Top-level node range covered by the page.
    pub fn source(&self) -> Range<usize> {
        match (self.blocks.first(), self.blocks.last()) {
            (Some(first), Some(last)) => first.source.start..last.source.end,
            _ => 0..0,
        }
    }

    /// Whether the page holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Result of pagination.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Pages in order
    pub pages: Vec<PageGroup>,
    /// Blocks that were skipped
    pub diagnostics: Vec<Diagnostic>,
}

/// Packs blocks into pages of a fixed content height.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    max_height_px: f32,
}

impl Paginator {
    /// Create a paginator with the given page content height.
    pub fn new(max_height_px: f32) -> Self {
        Self { max_height_px }
    }

    /// Page content height budget.
    pub fn max_height_px(&self) -> f32 {
        self.max_height_px
    }

    /// Partition blocks into pages.
    pub fn paginate(&self, blocks: impl IntoIterator<Item = RenderedBlock>) -> Pagination {
        let mut pages = Vec::new();
        let mut diagnostics = Vec::new();
        let mut current = PageGroup::default();
        let mut current_height = 0.0f32;

        for block in blocks {
            if !block.height_px.is_finite() || block.height_px <= 0.0 {
                log::warn!(
                    "Skipping block {} (nodes {:?}): measured height {}",
                    block.index,
                    block.source,
                    block.height_px
                );
                diagnostics.push(Diagnostic::MeasurementFailure {
                    block: block.index,
                    reason: format!("measured height {}", block.height_px),
                });
                continue;
            }

            if !current.is_empty() && current_height + block.height_px > self.max_height_px {
                pages.push(std::mem::take(&mut current));
                current_height = 0.0;
            }

            if block.height_px > self.max_height_px {
                log::debug!(
                    "Block {} is {}px tall, exceeds page budget {}px",
                    block.index,
                    block.height_px,
                    self.max_height_px
                );
            }

            current_height += block.height_px;
            current.blocks.push(block);
        }

        if !current.is_empty() {
            pages.push(current);
        }

        log::debug!("Paginated into {} pages", pages.len());
        Pagination { pages, diagnostics }
    }
}
