//! `tiny-skia` rasterizer.

use super::fonts::{self, FontBook};
use super::text_layout::{self, Item, Layout, TextItem};
use super::{Bitmap, RenderContext, Rasterizer};
use crate::error::{Error, Result};
use crate::model::DocumentNode;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};

/// Pure-Rust rasterizer painting into `tiny-skia` pixmaps.
pub struct SkiaRasterizer {
    fonts: FontBook,
}

impl SkiaRasterizer {
    /// Rasterizer using the system fonts.
    pub fn new() -> Self {
        Self::with_font_book(FontBook::system())
    }

    /// Rasterizer using a prepared font book.
    pub fn with_font_book(fonts: FontBook) -> Self {
        Self { fonts }
    }

    /// Font book in use.
    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }
}

impl Default for SkiaRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for SkiaRasterizer {
    fn measure(&mut self, nodes: &[DocumentNode], ctx: &RenderContext<'_>) -> Result<f32> {
        Ok(text_layout::layout(&mut self.fonts, ctx, nodes).height)
    }

    fn render(
        &mut self,
        blocks: &[&[DocumentNode]],
        min_height_px: f32,
        ctx: &RenderContext<'_>,
    ) -> Result<Bitmap> {
        let layouts: Vec<Layout> = blocks
            .iter()
            .map(|nodes| text_layout::layout(&mut self.fonts, ctx, nodes))
            .collect();
        let total: f32 = layouts.iter().map(|l| l.height).sum();

        let width = ctx.bitmap_width();
        let height = (total.max(min_height_px) * ctx.scale).ceil().max(0.0) as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::Conversion(format!("cannot allocate {}x{} surface", width, height))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let mut top = 0.0f32;
        for layout in &layouts {
            let transform = Transform::from_scale(ctx.scale, ctx.scale).pre_translate(0.0, top);
            for item in &layout.items {
                paint_item(&mut pixmap, item, transform);
            }
            top += layout.height;
        }

        Ok(to_bitmap(&pixmap))
    }
}

fn solid(rgb: (u8, u8, u8)) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb.0, rgb.1, rgb.2, 255);
    paint.anti_alias = true;
    paint
}

fn paint_item(pixmap: &mut Pixmap, item: &Item, transform: Transform) {
    match item {
        Item::Text(text) => paint_text(pixmap, text, transform),
        Item::Rule { x, y, w, h, rgb } => {
            if let Some(rect) = Rect::from_xywh(*x, *y, *w, *h) {
                pixmap.fill_rect(rect, &solid(*rgb), transform, None);
            }
        },
        Item::Frame { x, y, w, h } => {
            if let Some(rect) = Rect::from_xywh(*x, *y, *w, *h) {
                let path = PathBuilder::from_rect(rect);
                let stroke = Stroke {
                    width: 1.0,
                    ..Stroke::default()
                };
                pixmap.stroke_path(&path, &solid((160, 160, 160)), &stroke, transform, None);
            }
        },
        Item::Image { x, y, w, h, image } => {
            let Some(source) = rgba_pixmap(image) else {
                return;
            };
            let sx = w / source.width() as f32;
            let sy = h / source.height() as f32;
            let paint = PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            };
            pixmap.draw_pixmap(
                0,
                0,
                source.as_ref(),
                &paint,
                transform.pre_translate(*x, *y).pre_scale(sx, sy),
                None,
            );
        },
    }
}

fn paint_text(pixmap: &mut Pixmap, text: &TextItem, transform: Transform) {
    let paint = solid(text.rgb);
    let parsed = text.face.as_ref().and_then(|face| face.parse());
    let mut pen = text.x;

    for ch in text.text.chars() {
        let glyph = parsed.as_ref().and_then(|face| {
            let gid = face.glyph_index(ch)?;
            let units = f32::from(face.units_per_em());
            let advance = f32::from(face.glyph_hor_advance(gid)?) * text.size_px / units;
            Some((face, gid, units, advance))
        });

        match glyph {
            Some((face, gid, units, advance)) => {
                let mut outline = GlyphOutline(PathBuilder::new());
                if face.outline_glyph(gid, &mut outline).is_some() {
                    if let Some(path) = outline.0.finish() {
                        let k = text.size_px / units;
                        let glyph_transform =
                            transform.pre_translate(pen, text.baseline).pre_scale(k, -k);
                        pixmap.fill_path(&path, &paint, FillRule::Winding, glyph_transform, None);
                    }
                }
                pen += advance;
            },
            None => {
                let advance = fonts::fallback_advance(ch, text.size_px);
                if !ch.is_whitespace() {
                    let h = text.size_px * 0.6;
                    if let Some(rect) =
                        Rect::from_xywh(pen + advance * 0.1, text.baseline - h, advance * 0.8, h)
                    {
                        pixmap.fill_rect(rect, &paint, transform, None);
                    }
                }
                pen += advance;
            },
        }
    }

    if text.underline {
        let thickness = (text.size_px / 14.0).max(1.0);
        if let Some(rect) = Rect::from_xywh(
            text.x,
            text.baseline + thickness * 1.5,
            text.width,
            thickness,
        ) {
            pixmap.fill_rect(rect, &paint, transform, None);
        }
    }
}

/// Bridges `ttf-parser` outlines into a `tiny-skia` path.
struct GlyphOutline(PathBuilder);

impl ttf_parser::OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}

fn rgba_pixmap(image: &image::RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn to_bitmap(pixmap: &Pixmap) -> Bitmap {
    let mut pixels = Vec::with_capacity(pixmap.pixels().len() * 3);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        pixels.extend_from_slice(&[c.red(), c.green(), c.blue()]);
    }
    Bitmap {
        width: pixmap.width(),
        height: pixmap.height(),
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::model::TextRun;
    use crate::style::StyleResolver;

    fn rasterize(nodes: &[DocumentNode], min_height: f32) -> (f32, Bitmap) {
        let config = ExportConfig::default();
        let resolver = StyleResolver::new(&config);
        let ctx = RenderContext {
            resolver: &resolver,
            base_font_family: "Arial",
            width_px: 200.0,
            scale: 2.0,
        };
        let mut raster = SkiaRasterizer::with_font_book(FontBook::empty());
        let height = raster.measure(nodes, &ctx).unwrap();
        let bitmap = raster.render(&[nodes], min_height, &ctx).unwrap();
        (height, bitmap)
    }

    #[test]
    fn test_bitmap_matches_measured_height() {
        let nodes = [DocumentNode::paragraph("Quarterly report")];
        let (height, bitmap) = rasterize(&nodes, 0.0);
        assert_eq!(bitmap.width, 400);
        assert_eq!(bitmap.height, (height * 2.0).ceil() as u32);
        assert!(!bitmap.is_degenerate());
    }

    #[test]
    fn test_min_height_pads_bitmap() {
        let nodes = [DocumentNode::paragraph("x")];
        let (_, bitmap) = rasterize(&nodes, 300.0);
        assert_eq!(bitmap.height, 600);
        // Padding stays white
        assert_eq!(bitmap.pixel(0, 599), Some([255, 255, 255]));
    }

    #[test]
    fn test_text_paints_pixels() {
        let nodes = [DocumentNode::paragraph_runs(vec![
            TextRun::new("WWWW").color("#000000")
        ])];
        let (_, bitmap) = rasterize(&nodes, 0.0);
        let dark = bitmap.pixels.chunks(3).filter(|px| px[0] < 128).count();
        assert!(dark > 0);
    }

    #[test]
    fn test_empty_block_list_is_rejected() {
        let config = ExportConfig::default();
        let resolver = StyleResolver::new(&config);
        let ctx = RenderContext {
            resolver: &resolver,
            base_font_family: "Arial",
            width_px: 200.0,
            scale: 1.0,
        };
        let mut raster = SkiaRasterizer::with_font_book(FontBook::empty());
        assert!(raster.render(&[], 0.0, &ctx).is_err());
    }
}
