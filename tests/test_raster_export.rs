//! Raster PDF export through the public API.

use rfpress::rendering::{Bitmap, RenderContext, Rasterizer};
use rfpress::{
    Diagnostic, Document, DocumentNode, Error, ExportConfig, PageImageEncoding, PageSize,
    RasterExporter,
};

/// Measures every node at a fixed height and fails on request.
struct FixedHeight {
    node_height: f32,
    fail_measure_containing: Option<&'static str>,
    renders: usize,
}

impl FixedHeight {
    fn new(node_height: f32) -> Self {
        Self {
            node_height,
            fail_measure_containing: None,
            renders: 0,
        }
    }
}

impl Rasterizer for FixedHeight {
    fn measure(&mut self, nodes: &[DocumentNode], _ctx: &RenderContext<'_>) -> rfpress::Result<f32> {
        if let Some(needle) = self.fail_measure_containing {
            if nodes.iter().any(|n| n.plain_text().contains(needle)) {
                return Err(Error::Conversion("detached node".into()));
            }
        }
        Ok(self.node_height * nodes.len() as f32)
    }

    fn render(
        &mut self,
        blocks: &[&[DocumentNode]],
        min_height_px: f32,
        ctx: &RenderContext<'_>,
    ) -> rfpress::Result<Bitmap> {
        self.renders += 1;
        let nodes: usize = blocks.iter().map(|b| b.len()).sum();
        let height = (self.node_height * nodes as f32).max(min_height_px);
        Ok(Bitmap::filled(
            ctx.bitmap_width(),
            (height * ctx.scale).ceil() as u32,
            [240, 240, 240],
        ))
    }
}

fn paragraphs(n: usize) -> Document {
    Document::new(
        (0..n)
            .map(|i| DocumentNode::paragraph(format!("Paragraph {}", i)))
            .collect(),
    )
}

// Letter with 36pt margins: 960px of content per page
fn config() -> ExportConfig {
    ExportConfig::default()
        .with_page_size(PageSize::Letter)
        .with_margin(36.0)
}

#[test]
fn test_page_count_follows_heights() {
    let exporter = RasterExporter::new(config());
    let mut raster = FixedHeight::new(400.0);
    let out = exporter.export(&paragraphs(5), &mut raster).unwrap();
    // [400, 400] [400, 400] [400]
    assert_eq!(out.pages, 3);
    assert_eq!(raster.renders, 3);
    assert!(out.bytes.starts_with(b"%PDF-"));
    assert!(out.bytes.ends_with(b"%%EOF"));
}

#[test]
fn test_measurement_failure_is_skipped() {
    let exporter = RasterExporter::new(config());
    let mut raster = FixedHeight::new(100.0);
    raster.fail_measure_containing = Some("Paragraph 1");
    let out = exporter.export(&paragraphs(3), &mut raster).unwrap();
    assert_eq!(out.pages, 1);
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::MeasurementFailure {
            block: 1,
            reason: "Conversion failed: detached node".to_string(),
        }]
    );
}

#[test]
fn test_zero_sections_is_fatal() {
    let exporter = RasterExporter::new(config());
    let result = exporter.export(&Document::default(), &mut FixedHeight::new(100.0));
    assert!(matches!(result, Err(Error::NoSections)));
}

#[test]
fn test_invalid_config_is_fatal() {
    let exporter = RasterExporter::new(config().with_margin(400.0));
    let result = exporter.export(&paragraphs(1), &mut FixedHeight::new(100.0));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_repeat_export_same_page_count() {
    let exporter = RasterExporter::new(config().with_page_size(PageSize::A4));
    let doc = paragraphs(12);
    let first = exporter.export(&doc, &mut FixedHeight::new(250.0)).unwrap();
    let second = exporter.export(&doc, &mut FixedHeight::new(250.0)).unwrap();
    assert_eq!(first.pages, second.pages);
}

#[test]
fn test_jpeg_and_flate_encodings() {
    let doc = paragraphs(2);
    for (encoding, filter) in [
        (PageImageEncoding::Jpeg(80), "/DCTDecode"),
        (PageImageEncoding::Flate, "/FlateDecode"),
    ] {
        let exporter = RasterExporter::new(config().with_image_encoding(encoding));
        let out = exporter.export(&doc, &mut FixedHeight::new(50.0)).unwrap();
        let text = String::from_utf8_lossy(&out.bytes);
        assert!(text.contains(filter), "missing {}", filter);
        assert!(text.contains("/Subtype /Image"));
    }
}

#[cfg(feature = "rendering")]
mod skia {
    use super::*;
    use rfpress::rendering::{FontBook, SkiaRasterizer};

    fn rasterizer() -> SkiaRasterizer {
        // Box metrics only, so results do not depend on installed fonts
        SkiaRasterizer::with_font_book(FontBook::empty())
    }

    #[test]
    fn test_full_document() {
        let doc = Document::new(vec![
            DocumentNode::heading(1, "Executive Summary"),
            DocumentNode::paragraph("We propose a phased rollout across three regions."),
            DocumentNode::bullet_list(["Discovery", "Pilot", "Rollout"]),
            DocumentNode::code_block("timeline:\n  q1: pilot\n  q2: rollout"),
        ])
        .with_title("Proposal");
        let exporter = RasterExporter::new(config());
        let out = exporter.export(&doc, &mut rasterizer()).unwrap();
        assert_eq!(out.pages, 1);
        assert!(out.diagnostics.is_empty());
        assert!(String::from_utf8_lossy(&out.bytes).contains("/Title (Proposal)"));
    }

    #[test]
    fn test_long_document_spans_pages() {
        let doc = Document::new(
            (0..80)
                .map(|i| DocumentNode::paragraph(format!("Line item {} of the cost breakdown", i)))
                .collect(),
        );
        let exporter = RasterExporter::new(config());
        let (groups, _) = exporter.paginate(&doc, &mut rasterizer()).unwrap();
        assert!(groups.len() > 1);
        let out = exporter.export(&doc, &mut rasterizer()).unwrap();
        assert_eq!(out.pages, groups.len());
    }
}
