//! Rasterization of document sections.
//!
//! The raster export only needs two capabilities from a rendering engine:
//! measure a run of top-level nodes at a fixed width, and render runs of
//! nodes stacked vertically into a bitmap. [`Rasterizer`] captures exactly
//! that, so the exporter can run against any headless layout engine.
//!
//! The default engine, [`SkiaRasterizer`], is pure Rust:
//!
//! 1. Resolve run styles through [`StyleResolver`]
//! 2. Lay text out into lines with metrics from system fonts (`fontdb` +
//!    `ttf-parser`), falling back to fixed box metrics
//! 3. Paint glyph outlines, rules and images into a `tiny-skia` pixmap
//! 4. Copy the pixmap into an RGB [`Bitmap`]
//!
//! Pixmaps live only for the duration of one `render` call.

#[cfg(feature = "rendering")]
mod fonts;
#[cfg(feature = "rendering")]
mod skia;
#[cfg(feature = "rendering")]
mod text_layout;

#[cfg(feature = "rendering")]
#[cfg_attr(docsrs, doc(cfg(feature = "rendering")))]
pub use fonts::FontBook;
#[cfg(feature = "rendering")]
#[cfg_attr(docsrs, doc(cfg(feature = "rendering")))]
pub use skia::SkiaRasterizer;

use crate::error::Result;
use crate::model::DocumentNode;
use crate::style::StyleResolver;

/// Layout parameters shared by measuring and rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Style resolution for runs
    pub resolver: &'a StyleResolver,
    /// Family used when a run has none
    pub base_font_family: &'a str,
    /// Layout width in CSS pixels
    pub width_px: f32,
    /// Bitmap pixels per CSS pixel
    pub scale: f32,
}

impl RenderContext<'_> {
    /// Bitmap width in pixels.
    pub fn bitmap_width(&self) -> u32 {
        (self.width_px * self.scale).round().max(0.0) as u32
    }
}

/// Headless "render subtree to bitmap at a given width" capability.
pub trait Rasterizer {
    /// Height in CSS pixels of `nodes` laid out at `ctx.width_px`.
    fn measure(&mut self, nodes: &[DocumentNode], ctx: &RenderContext<'_>) -> Result<f32>;

    /// Render `blocks` top to bottom into one bitmap.
    ///
    /// The bitmap is `ctx.bitmap_width()` wide and at least
    /// `min_height_px * ctx.scale` tall.
    fn render(
        &mut self,
        blocks: &[&[DocumentNode]],
        min_height_px: f32,
        ctx: &RenderContext<'_>,
    ) -> Result<Bitmap>;
}

/// An 8-bit RGB raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGB samples, `width * height * 3` bytes
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap filled with one color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 3);
        for _ in 0..count {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Whether the bitmap has no area or inconsistent sample data.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0
            || self.height == 0
            || self.pixels.len() != self.width as usize * self.height as usize * 3
    }

    /// Copy rows `top..top + height` into a new bitmap (clamped to the bounds).
    pub fn crop_rows(&self, top: u32, height: u32) -> Bitmap {
        let top = top.min(self.height);
        let height = height.min(self.height - top);
        let stride = self.width as usize * 3;
        let start = top as usize * stride;
        let end = start + height as usize * stride;
        Bitmap {
            width: self.width,
            height,
            pixels: self.pixels[start..end].to_vec(),
        }
    }

    /// RGB sample at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.pixels.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_bitmap() {
        let bmp = Bitmap::filled(4, 3, [255, 255, 255]);
        assert_eq!(bmp.pixels.len(), 36);
        assert!(!bmp.is_degenerate());
        assert_eq!(bmp.pixel(3, 2), Some([255, 255, 255]));
        assert_eq!(bmp.pixel(4, 0), None);
    }

    #[test]
    fn test_degenerate_bitmap() {
        assert!(Bitmap::filled(0, 10, [0, 0, 0]).is_degenerate());
        let broken = Bitmap {
            width: 2,
            height: 2,
            pixels: vec![0; 5],
        };
        assert!(broken.is_degenerate());
    }

    #[test]
    fn test_crop_rows() {
        let mut bmp = Bitmap::filled(2, 4, [0, 0, 0]);
        // Mark row 2
        for b in &mut bmp.pixels[12..18] {
            *b = 200;
        }
        let slice = bmp.crop_rows(2, 2);
        assert_eq!(slice.height, 2);
        assert_eq!(slice.pixel(0, 0), Some([200, 200, 200]));
        assert_eq!(slice.pixel(0, 1), Some([0, 0, 0]));

        let clamped = bmp.crop_rows(3, 10);
        assert_eq!(clamped.height, 1);
        assert_eq!(bmp.crop_rows(9, 1).height, 0);
    }
}
