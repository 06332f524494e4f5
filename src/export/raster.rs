//! Paginated, raster-based PDF export.
//!
//! Each top-level section is measured at the page content width, the
//! measured blocks are packed into pages, and every page group is rendered
//! to one bitmap that becomes a full-width image on a PDF page. A bitmap
//! taller than one page (the render came out taller than measured) is cut
//! into page-height slices, each on its own page.

use crate::config::{px_to_pt, ExportConfig, PageImageEncoding};
use crate::error::{Diagnostic, Error, Result};
use crate::layout::{split_sections, PageGroup, Paginator, RenderedBlock};
use crate::model::{Document, DocumentNode};
use crate::rendering::{Bitmap, RenderContext, Rasterizer};
use crate::style::StyleResolver;
use crate::writer::{ImageData, PdfWriter, PdfWriterConfig};

/// A finished PDF.
#[derive(Debug, Clone)]
pub struct RasterOutput {
    /// PDF bytes
    pub bytes: Vec<u8>,
    /// Number of PDF pages
    pub pages: usize,
    /// Recovered failures
    pub diagnostics: Vec<Diagnostic>,
}

/// Renders documents into image-per-page PDFs.
#[derive(Debug, Clone)]
pub struct RasterExporter {
    config: ExportConfig,
    resolver: StyleResolver,
}

impl RasterExporter {
    /// Create an exporter for the given configuration.
    pub fn new(config: ExportConfig) -> Self {
        let resolver = StyleResolver::new(&config);
        Self { config, resolver }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn context(&self) -> RenderContext<'_> {
        RenderContext {
            resolver: &self.resolver,
            base_font_family: &self.config.base_font_family,
            width_px: self.config.geometry().content_width_px(),
            scale: self.config.raster_scale,
        }
    }

    /// Measure and paginate a document without rendering it.
    pub fn paginate<R: Rasterizer + ?Sized>(
        &self,
        document: &Document,
        rasterizer: &mut R,
    ) -> Result<(Vec<PageGroup>, Vec<Diagnostic>)> {
        self.config.validate()?;
        let sections = split_sections(document, self.config.section_split);
        if sections.is_empty() {
            return Err(Error::NoSections);
        }

        let ctx = self.context();
        let mut diagnostics = Vec::new();
        let mut blocks = Vec::with_capacity(sections.len());
        for section in &sections {
            match rasterizer.measure(section.nodes, &ctx) {
                Ok(height) => blocks.push(RenderedBlock::new(section.index, section.range(), height)),
                Err(e) => {
                    log::warn!("Failed to measure block {}: {}", section.index, e);
                    diagnostics.push(Diagnostic::MeasurementFailure {
                        block: section.index,
                        reason: e.to_string(),
                    });
                },
            }
        }

        let max_height = self.config.geometry().content_height_px();
        let pagination = Paginator::new(max_height).paginate(blocks);
        diagnostics.extend(pagination.diagnostics);
        log::debug!(
            "{} sections -> {} page groups ({} diagnostics)",
            sections.len(),
            pagination.pages.len(),
            diagnostics.len()
        );
        Ok((pagination.pages, diagnostics))
    }

    /// Begin a stepwise export.
    ///
    /// Fails with [`Error::NoSections`] when the document has no sections or
    /// none of them measured to a positive height.
    pub fn start<'a, R: Rasterizer + ?Sized>(
        &'a self,
        document: &'a Document,
        rasterizer: &mut R,
    ) -> Result<RasterRun<'a>> {
        let (groups, diagnostics) = self.paginate(document, rasterizer)?;
        if groups.is_empty() {
            log::warn!("No renderable sections in document");
            return Err(Error::NoSections);
        }

        let mut pdf_config = PdfWriterConfig::default()
            .with_creator(self.config.creator.clone())
            .with_compress(self.config.compress);
        if let Some(title) = &document.title {
            pdf_config = pdf_config.with_title(title.clone());
        }

        Ok(RasterRun {
            exporter: self,
            document,
            groups,
            next: 0,
            writer: PdfWriter::with_config(pdf_config),
            diagnostics,
        })
    }

    /// Export a document in one go.
    pub fn export<R: Rasterizer + ?Sized>(
        &self,
        document: &Document,
        rasterizer: &mut R,
    ) -> Result<RasterOutput> {
        let mut run = self.start(document, rasterizer)?;
        while run.step(rasterizer)? {}
        run.finish()
    }

    /// Export a document, yielding to the scheduler after every page group.
    #[cfg(feature = "async")]
    #[cfg_attr(docsrs, doc(cfg(feature = "async")))]
    pub async fn export_async<R: Rasterizer + ?Sized>(
        &self,
        document: &Document,
        rasterizer: &mut R,
    ) -> Result<RasterOutput> {
        let mut run = self.start(document, rasterizer)?;
        while run.step(rasterizer)? {
            tokio::task::yield_now().await;
        }
        run.finish()
    }
}

/// An export in progress; renders one page group per [`step`](Self::step).
pub struct RasterRun<'a> {
    exporter: &'a RasterExporter,
    document: &'a Document,
    groups: Vec<PageGroup>,
    next: usize,
    writer: PdfWriter,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RasterRun<'a> {
    /// Number of page groups.
    pub fn total_groups(&self) -> usize {
        self.groups.len()
    }

    /// Page groups rendered so far.
    pub fn completed_groups(&self) -> usize {
        self.next
    }

    /// Whether every page group has been rendered.
    pub fn is_done(&self) -> bool {
        self.next >= self.groups.len()
    }

    /// Render the next page group. Returns `false` once all groups are done.
    pub fn step<R: Rasterizer + ?Sized>(&mut self, rasterizer: &mut R) -> Result<bool> {
        let Some(group) = self.groups.get(self.next) else {
            return Ok(false);
        };
        let index = self.next;
        self.next += 1;

        let blocks: Vec<&[DocumentNode]> = group
            .blocks
            .iter()
            .filter_map(|block| self.document.nodes.get(block.source.clone()))
            .collect();

        let ctx = self.exporter.context();
        match rasterizer.render(&blocks, 0.0, &ctx) {
            Ok(bitmap) if !bitmap.is_degenerate() => self.place_bitmap(&bitmap)?,
            Ok(bitmap) => {
                self.blank_page(index, format!("empty bitmap {}x{}", bitmap.width, bitmap.height))
            },
            Err(e) => self.blank_page(index, e.to_string()),
        }

        log::debug!("Rendered page group {}/{}", index + 1, self.groups.len());
        Ok(!self.is_done())
    }

    fn blank_page(&mut self, page: usize, reason: String) {
        log::warn!("Page group {} left blank: {}", page + 1, reason);
        self.diagnostics.push(Diagnostic::RenderFailure { page, reason });
        let geometry = self.exporter.config.geometry();
        self.writer.add_page(geometry.width_pt, geometry.height_pt).finish();
    }

    fn place_bitmap(&mut self, bitmap: &Bitmap) -> Result<()> {
        let config = &self.exporter.config;
        let geometry = config.geometry();
        let slice_height = (geometry.content_height_px() * config.raster_scale)
            .ceil()
            .max(1.0) as u32;

        if bitmap.height > slice_height {
            log::debug!(
                "Bitmap of {}px exceeds page height {}px, slicing",
                bitmap.height,
                slice_height
            );
        }

        let mut top = 0;
        while top < bitmap.height {
            let slice = bitmap.crop_rows(top, slice_height);
            top += slice.height;

            let image = match config.image_encoding {
                PageImageEncoding::Jpeg(quality) => {
                    ImageData::jpeg_from_rgb(slice.width, slice.height, &slice.pixels, quality)?
                },
                PageImageEncoding::Flate => {
                    ImageData::flate_from_rgb(slice.width, slice.height, &slice.pixels)?
                },
            };

            // Bitmap pixels map back to points through the raster scale
            let natural_w = px_to_pt(slice.width as f32 / config.raster_scale);
            let natural_h = px_to_pt(slice.height as f32 / config.raster_scale);
            let (w, h) = if natural_w > geometry.content_width_pt()
                || natural_h > geometry.content_height_pt()
            {
                image.fit_to_box(geometry.content_width_pt(), geometry.content_height_pt())
            } else {
                (natural_w, natural_h)
            };

            let handle = self.writer.add_image(image);
            let x = geometry.margin_pt;
            let y = geometry.height_pt - geometry.margin_pt - h;
            self.writer
                .add_page(geometry.width_pt, geometry.height_pt)
                .draw_image(handle, x, y, w, h)
                .finish();
        }
        Ok(())
    }

    /// Assemble the PDF.
    pub fn finish(self) -> Result<RasterOutput> {
        let pages = self.writer.page_count();
        let bytes = self.writer.finish()?;
        log::debug!(
            "Raster export finished: {} pages, {} diagnostics",
            pages,
            self.diagnostics.len()
        );
        Ok(RasterOutput {
            bytes,
            pages,
            diagnostics: self.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageSize, SectionSplit};
    use std::io::Read;

    /// Rasterizer with scripted heights: every node measures to its text
    /// length in pixels, and renders grey at that height.
    struct Scripted {
        render_height_factor: f32,
        fail_render: bool,
        /// Paint every row with a color encoding its index
        striped: bool,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                render_height_factor: 1.0,
                fail_render: false,
                striped: false,
            }
        }

        fn row_color(row: u32) -> [u8; 3] {
            [(row & 0xFF) as u8, (row >> 8) as u8, 0x5A]
        }

        fn height(nodes: &[DocumentNode]) -> f32 {
            nodes.iter().map(|n| n.plain_text().len() as f32).sum()
        }
    }

    impl Rasterizer for Scripted {
        fn measure(&mut self, nodes: &[DocumentNode], _ctx: &RenderContext<'_>) -> Result<f32> {
            Ok(Self::height(nodes))
        }

        fn render(
            &mut self,
            blocks: &[&[DocumentNode]],
            min_height_px: f32,
            ctx: &RenderContext<'_>,
        ) -> Result<Bitmap> {
            if self.fail_render {
                return Err(Error::Conversion("surface lost".into()));
            }
            let height: f32 = blocks.iter().map(|b| Self::height(b)).sum::<f32>()
                * self.render_height_factor;
            let rows = (height.max(min_height_px) * ctx.scale).ceil() as u32;
            let mut bitmap = Bitmap::filled(ctx.bitmap_width(), rows, [128, 128, 128]);
            if self.striped {
                let stride = bitmap.width as usize * 3;
                for (row, samples) in bitmap.pixels.chunks_mut(stride).enumerate() {
                    let rgb = Self::row_color(row as u32);
                    for pixel in samples.chunks_mut(3) {
                        pixel.copy_from_slice(&rgb);
                    }
                }
            }
            Ok(bitmap)
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn read_int(bytes: &[u8]) -> usize {
        bytes
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .fold(0, |acc, b| acc * 10 + usize::from(*b - b'0'))
    }

    /// `(height, decoded samples)` of every image XObject, in object order.
    fn page_images(pdf: &[u8]) -> Vec<(u32, Vec<u8>)> {
        let mut images = Vec::new();
        let mut pos = 0;
        while let Some(at) = find(&pdf[pos..], b"/Height ") {
            let height_at = pos + at + b"/Height ".len();
            let height = read_int(&pdf[height_at..]) as u32;
            let length_at = height_at + find(&pdf[height_at..], b"/Length ").unwrap() + 8;
            let length = read_int(&pdf[length_at..]);
            let data_at = length_at + find(&pdf[length_at..], b"stream\n").unwrap() + 7;
            let mut samples = Vec::new();
            flate2::read::ZlibDecoder::new(&pdf[data_at..data_at + length])
                .read_to_end(&mut samples)
                .unwrap();
            images.push((height, samples));
            pos = data_at + length;
        }
        images
    }

    fn block(px: usize) -> DocumentNode {
        DocumentNode::paragraph("x".repeat(px))
    }

    // Letter, margin 36pt: content 540 x 720 pt = 720 x 960 px
    fn exporter() -> RasterExporter {
        RasterExporter::new(
            ExportConfig::default()
                .with_page_size(PageSize::Letter)
                .with_margin(36.0)
                .with_raster_scale(1.0)
                .with_image_encoding(PageImageEncoding::Flate),
        )
    }

    #[test]
    fn test_pages_follow_pagination() {
        let doc = Document::new(vec![block(400), block(400), block(400)]);
        let out = exporter().export(&doc, &mut Scripted::new()).unwrap();
        assert_eq!(out.pages, 2);
        assert!(out.diagnostics.is_empty());
        assert!(out.bytes.starts_with(b"%PDF-1.7"));
    }

    #[test]
    fn test_no_sections() {
        let doc = Document::new(Vec::new());
        assert!(matches!(
            exporter().export(&doc, &mut Scripted::new()),
            Err(Error::NoSections)
        ));
    }

    #[test]
    fn test_all_blocks_empty_is_no_sections() {
        let doc = Document::new(vec![block(0), block(0)]);
        assert!(matches!(
            exporter().export(&doc, &mut Scripted::new()),
            Err(Error::NoSections)
        ));
    }

    #[test]
    fn test_tall_render_is_sliced() {
        let doc = Document::new(vec![block(900)]);
        let mut raster = Scripted::new();
        // Renders at 2.5x the measured height: 2250px over 960px pages
        raster.render_height_factor = 2.5;
        let out = exporter().export(&doc, &mut raster).unwrap();
        assert_eq!(out.pages, 3);
    }

    #[test]
    fn test_slices_cover_bitmap_in_order() {
        let doc = Document::new(vec![block(900)]);
        let mut raster = Scripted::new();
        raster.render_height_factor = 2.5;
        raster.striped = true;
        let out = exporter().export(&doc, &mut raster).unwrap();

        let images = page_images(&out.bytes);
        let heights: Vec<u32> = images.iter().map(|(h, _)| *h).collect();
        assert_eq!(heights, vec![960, 960, 330]);
        assert_eq!(heights.iter().sum::<u32>(), 2250);

        let stride = 720 * 3;
        for (page, (height, samples)) in images.iter().enumerate() {
            assert_eq!(samples.len(), *height as usize * stride);
            for (k, row) in samples.chunks(stride).enumerate() {
                let expected = Scripted::row_color(page as u32 * 960 + k as u32);
                assert_eq!(&row[..3], &expected, "page {} row {}", page, k);
                assert_eq!(&row[stride - 3..], &expected);
            }
        }

        // Page N paints image N
        let text = String::from_utf8_lossy(&out.bytes);
        for n in 1..=3 {
            assert!(text.contains(&format!("/XObject << /Im{} {} 0 R >>", n, n + 2)));
        }
    }

    #[test]
    fn test_render_failure_leaves_blank_page() {
        let doc = Document::new(vec![block(500), block(500)]);
        let mut raster = Scripted::new();
        raster.fail_render = true;
        let out = exporter().export(&doc, &mut raster).unwrap();
        assert_eq!(out.pages, 2);
        assert_eq!(out.diagnostics.len(), 2);
        assert!(matches!(
            out.diagnostics[1],
            Diagnostic::RenderFailure { page: 1, .. }
        ));
    }

    #[test]
    fn test_stepper() {
        let doc = Document::new(vec![block(600), block(600), block(600)]);
        let exporter = exporter();
        let mut raster = Scripted::new();
        let mut run = exporter.start(&doc, &mut raster).unwrap();
        assert_eq!(run.total_groups(), 3);
        assert!(run.step(&mut raster).unwrap());
        assert_eq!(run.completed_groups(), 1);
        assert!(run.step(&mut raster).unwrap());
        assert!(!run.step(&mut raster).unwrap());
        assert!(run.is_done());
        assert!(!run.step(&mut raster).unwrap());
        assert_eq!(run.finish().unwrap().pages, 3);
    }

    #[test]
    fn test_by_heading_sections() {
        let doc = Document::new(vec![
            DocumentNode::heading(1, "x".repeat(100)),
            block(300),
            DocumentNode::heading(1, "x".repeat(100)),
            block(300),
        ]);
        let exporter = RasterExporter::new(
            exporter()
                .config()
                .clone()
                .with_section_split(SectionSplit::ByHeading),
        );
        let (groups, _) = exporter.paginate(&doc, &mut Scripted::new()).unwrap();
        // Two 400px sections fit on one 960px page
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].blocks.len(), 2);
        assert_eq!(groups[0].blocks[1].source, 2..4);
    }

    #[test]
    fn test_title_in_info() {
        let doc = Document::new(vec![block(10)]).with_title("Cover Letter");
        let out = exporter().export(&doc, &mut Scripted::new()).unwrap();
        let text = String::from_utf8_lossy(&out.bytes);
        assert!(text.contains("/Title (Cover Letter)"));
    }
}
