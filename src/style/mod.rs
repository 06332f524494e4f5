//! Style resolution.
//!
//! Computes the concrete style of every text run from the style model stored
//! on the nodes: configuration defaults, heading defaults, block overrides and
//! run overrides, in increasing priority. Resolution never looks at rendered
//! output, so both exporters see identical styles for the same snapshot.
//!
//! Heading levels 1-3 default to bold at 24, 22 and 20 pt. Other levels,
//! including invalid ones, use the base style.

pub mod css;

use crate::config::ExportConfig;
use crate::model::{DocumentNode, StyleOverrides, TextAlign, TextRun};

/// Default sizes for heading levels 1-3, in points.
const HEADING_SIZES_PT: [f32; 3] = [24.0, 22.0, 20.0];

/// Resolved style of one text run.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDescriptor {
    /// Alignment of the enclosing block
    pub align: TextAlign,
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underline
    pub underline: bool,
    /// Font size in points
    pub font_size_pt: f32,
    /// Uppercase `RRGGBB`, or `None` for the default (black)
    pub color: Option<String>,
    /// Explicit font family, or `None` for the base family
    pub font_family: Option<String>,
}

impl StyleDescriptor {
    /// Font size in half-points (DOCX `w:sz`).
    pub fn half_points(&self) -> u32 {
        (self.font_size_pt * 2.0).round() as u32
    }

    /// Color components, black when no explicit color is set.
    pub fn rgb(&self) -> (u8, u8, u8) {
        self.color
            .as_deref()
            .and_then(css::hex_to_rgb)
            .unwrap_or((0, 0, 0))
    }
}

/// Resolved block-level style of a text-bearing node.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStyle {
    /// Heading level as stored on the node
    pub heading_level: Option<u8>,
    /// Block alignment
    pub align: TextAlign,
    /// Bottom margin in CSS pixels
    pub margin_bottom_px: f32,
    /// Whether runs default to bold
    pub bold: bool,
    /// Default size of runs, in points
    pub font_size_pt: f32,
    /// Overrides inherited from the block and its ancestors
    pub overrides: StyleOverrides,
}

/// Resolves block and run styles against configuration defaults.
#[derive(Debug, Clone)]
pub struct StyleResolver {
    base_font_size_pt: f32,
    block_spacing_px: f32,
}

impl StyleResolver {
    /// Create a resolver using the configuration's base style.
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            base_font_size_pt: config.base_font_size_pt,
            block_spacing_px: config.block_spacing_px,
        }
    }

    /// Base font size in points.
    pub fn base_font_size_pt(&self) -> f32 {
        self.base_font_size_pt
    }

    /// Default spacing after a block, in CSS pixels.
    pub fn block_spacing_px(&self) -> f32 {
        self.block_spacing_px
    }

    /// Resolve the style of a text-bearing block.
    ///
    /// `inherited` carries overrides from enclosing containers (list items,
    /// blockquotes, table cells). Returns `None` for nodes that do not hold
    /// runs directly.
    pub fn resolve_block(
        &self,
        node: &DocumentNode,
        inherited: &StyleOverrides,
    ) -> Option<BlockStyle> {
        if !node.is_text_block() {
            return None;
        }

        let heading_level = node.heading_level();
        let (bold, default_size) = match heading_level {
            Some(level @ 1..=3) => (true, HEADING_SIZES_PT[usize::from(level - 1)]),
            _ => (false, self.base_font_size_pt),
        };

        let overrides = node.attrs.style.inherit_from(inherited);
        let font_size_pt = overrides
            .font_size
            .as_deref()
            .and_then(|size| css::parse_font_size_pt(size, self.base_font_size_pt))
            .unwrap_or(default_size);

        let margin_bottom_px = node
            .attrs
            .margin_bottom
            .filter(|px| px.is_finite() && *px >= 0.0)
            .unwrap_or(self.block_spacing_px);

        Some(BlockStyle {
            heading_level,
            align: node.attrs.align.unwrap_or_default(),
            margin_bottom_px,
            bold,
            font_size_pt,
            overrides,
        })
    }

    /// Resolve the style of one run inside a resolved block.
    ///
    /// Runs without text have nothing to style and resolve to `None`.
    pub fn resolve_run(&self, block: &BlockStyle, run: &TextRun) -> Option<StyleDescriptor> {
        if run.text.is_empty() {
            return None;
        }

        let overrides = run.style.inherit_from(&block.overrides);
        let font_size_pt = run
            .style
            .font_size
            .as_deref()
            .and_then(|size| css::parse_font_size_pt(size, block.font_size_pt))
            .unwrap_or(block.font_size_pt);

        Some(StyleDescriptor {
            align: block.align,
            bold: block.bold || run.marks.bold,
            italic: run.marks.italic,
            underline: run.marks.underline,
            font_size_pt,
            color: overrides.color.as_deref().and_then(css::parse_color),
            font_family: overrides.font_family.as_deref().and_then(css::first_font_family),
        })
    }
}
