//! Configuration for document export.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CSS reference resolution (pixels per inch).
pub const CSS_DPI: f32 = 96.0;

/// PDF user-space resolution (points per inch).
pub const POINTS_PER_INCH: f32 = 72.0;

/// Output page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// US Letter (8.5" x 11")
    #[default]
    Letter,
    /// A4 (210mm x 297mm)
    A4,
    /// Legal (8.5" x 14")
    Legal,
    /// Custom dimensions in points
    Custom(f32, f32),
}

impl PageSize {
    /// Get dimensions in points (1 inch = 72 points).
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom(w, h) => (*w, *h),
        }
    }
}

/// How page bitmaps are embedded in the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageImageEncoding {
    /// JPEG (DCTDecode) with the given quality (1-100)
    Jpeg(u8),
    /// Lossless raw RGB compressed with FlateDecode
    Flate,
}

impl Default for PageImageEncoding {
    fn default() -> Self {
        PageImageEncoding::Jpeg(92)
    }
}

/// How top-level nodes are grouped into paginated blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionSplit {
    /// One block per top-level node
    #[default]
    PerNode,
    /// A heading opens a block; following non-heading nodes join it
    ByHeading,
}

/// Export configuration shared by both exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output page size
    pub page_size: PageSize,
    /// Page margin on every side, in points
    pub margin_pt: f32,
    /// Raster scale relative to CSS pixels
    pub raster_scale: f32,
    /// Page bitmap encoding
    pub image_encoding: PageImageEncoding,
    /// Block grouping for pagination
    pub section_split: SectionSplit,
    /// Base font family
    pub base_font_family: String,
    /// Base font size in points
    pub base_font_size_pt: f32,
    /// Bottom margin of blocks without an explicit one, in CSS pixels
    pub block_spacing_px: f32,
    /// File stem used when the document has no usable title
    pub default_file_stem: String,
    /// Compress PDF streams
    pub compress: bool,
    /// Creator recorded in output metadata
    pub creator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            margin_pt: 36.0,
            raster_scale: 1.5,
            image_encoding: PageImageEncoding::default(),
            section_split: SectionSplit::PerNode,
            base_font_family: "Arial".to_string(),
            base_font_size_pt: 12.0,
            block_spacing_px: 8.0,
            default_file_stem: "document".to_string(),
            compress: true,
            creator: "rfpress".to_string(),
        }
    }
}

impl ExportConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: ExportConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the page margin in points.
    pub fn with_margin(mut self, margin_pt: f32) -> Self {
        self.margin_pt = margin_pt;
        self
    }

    /// Set the raster scale.
    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale;
        self
    }

    /// Set the page bitmap encoding.
    pub fn with_image_encoding(mut self, encoding: PageImageEncoding) -> Self {
        self.image_encoding = encoding;
        self
    }

    /// Set the section grouping.
    pub fn with_section_split(mut self, split: SectionSplit) -> Self {
        self.section_split = split;
        self
    }

    /// Set the base font.
    pub fn with_base_font(mut self, family: impl Into<String>, size_pt: f32) -> Self {
        self.base_font_family = family.into();
        self.base_font_size_pt = size_pt;
        self
    }

    /// Set the fallback file stem.
    pub fn with_default_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.default_file_stem = stem.into();
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Check that the configuration describes a usable page.
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.page_size.dimensions();
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(Error::Config(format!("invalid page size {}x{}", width, height)));
        }
        if self.margin_pt < 0.0 || self.margin_pt * 2.0 >= width.min(height) {
            return Err(Error::Config(format!(
                "margin {}pt leaves no content area",
                self.margin_pt
            )));
        }
        if !(self.raster_scale.is_finite() && self.raster_scale > 0.0) {
            return Err(Error::Config(format!("invalid raster scale {}", self.raster_scale)));
        }
        if let PageImageEncoding::Jpeg(quality) = self.image_encoding {
            if !(1..=100).contains(&quality) {
                return Err(Error::Config(format!("JPEG quality {} outside 1-100", quality)));
            }
        }
        if !(self.base_font_size_pt.is_finite() && self.base_font_size_pt > 0.0) {
            return Err(Error::Config(format!(
                "invalid base font size {}",
                self.base_font_size_pt
            )));
        }
        Ok(())
    }

    /// Page geometry derived from this configuration.
    pub fn geometry(&self) -> PageGeometry {
        let (width_pt, height_pt) = self.page_size.dimensions();
        PageGeometry {
            width_pt,
            height_pt,
            margin_pt: self.margin_pt,
            scale: self.raster_scale,
        }
    }
}

/// Page measurements in the units each stage needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page width in points
    pub width_pt: f32,
    /// Page height in points
    pub height_pt: f32,
    /// Margin in points
    pub margin_pt: f32,
    /// Raster scale
    pub scale: f32,
}

impl PageGeometry {
    /// Content box width in points.
    pub fn content_width_pt(&self) -> f32 {
        self.width_pt - 2.0 * self.margin_pt
    }

    /// Content box height in points.
    pub fn content_height_pt(&self) -> f32 {
        self.height_pt - 2.0 * self.margin_pt
    }

    /// Content width in CSS pixels (layout width).
    pub fn content_width_px(&self) -> f32 {
        pt_to_px(self.content_width_pt())
    }

    /// Content height in CSS pixels (pagination budget).
    pub fn content_height_px(&self) -> f32 {
        pt_to_px(self.content_height_pt())
    }
}

/// Convert points to CSS pixels.
pub fn pt_to_px(pt: f32) -> f32 {
    pt * CSS_DPI / POINTS_PER_INCH
}

/// Convert CSS pixels to points.
pub fn px_to_pt(px: f32) -> f32 {
    px * POINTS_PER_INCH / CSS_DPI
}
