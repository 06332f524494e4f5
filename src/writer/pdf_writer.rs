//! PDF document writer.
//!
//! Assembles complete PDF documents with proper structure:
//! header, body, xref table, and trailer.

use super::content_stream::ContentStreamBuilder;
use super::image_handler::ImageData;
use super::object_serializer::ObjectSerializer;
use crate::error::Result;
use crate::object::Object;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Write;

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Creation timestamp; `None` uses the time of `finish`
    pub creation_date: Option<DateTime<Utc>>,
    /// Whether to compress content streams
    pub compress: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            creator: Some("rfpress".to_string()),
            creation_date: None,
            compress: true,
        }
    }
}

impl PdfWriterConfig {
    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the creator application.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Pin the creation timestamp.
    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Compress data using Flate/Deflate compression.
///
/// Returns compressed bytes suitable for FlateDecode filter.
pub(crate) fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Format a timestamp as a PDF date string.
pub fn pdf_date(date: &DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

/// Handle to an image registered with [`PdfWriter::add_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(usize);

/// A page being built.
pub struct PageBuilder<'a> {
    writer: &'a mut PdfWriter,
    page_index: usize,
}

impl<'a> PageBuilder<'a> {
    /// Place an image at `(x, y)` (lower-left corner) with the given size
    /// in points.
    pub fn draw_image(
        mut self,
        image: ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Self {
        let page = &mut self.writer.pages[self.page_index];
        let name = format!("Im{}", image.0 + 1);
        page.content_builder.draw_image(&name, x, y, width, height);
        page.images.insert(name, image);
        self
    }

    /// Finish building this page and return to the writer.
    pub fn finish(self) -> &'a mut PdfWriter {
        self.writer
    }
}

/// Internal page data.
struct PageData {
    width: f32,
    height: f32,
    content_builder: ContentStreamBuilder,
    /// XObject resource name -> image
    images: HashMap<String, ImageHandle>,
}

/// PDF document writer.
///
/// Builds a complete PDF document from pages of placed images.
pub struct PdfWriter {
    config: PdfWriterConfig,
    pages: Vec<PageData>,
    images: Vec<ImageData>,
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Register an image XObject for use on pages.
    pub fn add_image(&mut self, image: ImageData) -> ImageHandle {
        self.images.push(image);
        ImageHandle(self.images.len() - 1)
    }

    /// Add a page with the given dimensions in points.
    pub fn add_page(&mut self, width: f32, height: f32) -> PageBuilder<'_> {
        let page_index = self.pages.len();
        self.pages.push(PageData {
            width,
            height,
            content_builder: ContentStreamBuilder::new(),
            images: HashMap::new(),
        });
        PageBuilder {
            writer: self,
            page_index,
        }
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build the complete PDF document.
    pub fn finish(self) -> Result<Vec<u8>> {
        let serializer = ObjectSerializer;

        // Object numbering: catalog, pages tree, images, page/content pairs, info
        let catalog_id = 1u32;
        let pages_id = 2u32;
        let first_image_id = 3u32;
        let first_page_id = first_image_id + self.images.len() as u32;
        let info_id = first_page_id + 2 * self.pages.len() as u32;
        let image_id = |handle: &ImageHandle| first_image_id + handle.0 as u32;

        let mut objects: Vec<(u32, Object)> = Vec::with_capacity(info_id as usize);

        let page_refs: Vec<Object> = (0..self.pages.len() as u32)
            .map(|i| ObjectSerializer::reference(first_page_id + 2 * i, 0))
            .collect();

        objects.push((
            catalog_id,
            ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Catalog")),
                ("Pages", ObjectSerializer::reference(pages_id, 0)),
            ]),
        ));
        objects.push((
            pages_id,
            ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Pages")),
                ("Kids", Object::Array(page_refs)),
                ("Count", ObjectSerializer::integer(self.pages.len() as i64)),
            ]),
        ));

        for (i, image) in self.images.iter().enumerate() {
            objects.push((first_image_id + i as u32, image.to_object()));
        }

        for (i, page) in self.pages.iter().enumerate() {
            let page_id = first_page_id + 2 * i as u32;
            let content_id = page_id + 1;

            let raw_content = page.content_builder.build()?;
            let mut content_dict = HashMap::new();
            let content_bytes = if self.config.compress {
                content_dict.insert("Filter".to_string(), ObjectSerializer::name("FlateDecode"));
                compress_data(&raw_content)?
            } else {
                raw_content
            };

            let xobjects: HashMap<String, Object> = page
                .images
                .iter()
                .map(|(name, handle)| {
                    (name.clone(), ObjectSerializer::reference(image_id(handle), 0))
                })
                .collect();

            objects.push((
                page_id,
                ObjectSerializer::dict(vec![
                    ("Type", ObjectSerializer::name("Page")),
                    ("Parent", ObjectSerializer::reference(pages_id, 0)),
                    (
                        "MediaBox",
                        ObjectSerializer::rect(0.0, 0.0, page.width as f64, page.height as f64),
                    ),
                    ("Contents", ObjectSerializer::reference(content_id, 0)),
                    (
                        "Resources",
                        ObjectSerializer::dict(vec![("XObject", Object::Dictionary(xobjects))]),
                    ),
                ]),
            ));
            objects.push((content_id, Object::stream(content_dict, content_bytes)));
        }

        let created = self.config.creation_date.unwrap_or_else(Utc::now);
        let mut info_entries = vec![(
            "CreationDate",
            ObjectSerializer::text_string(&pdf_date(&created)),
        )];
        if let Some(title) = &self.config.title {
            info_entries.push(("Title", ObjectSerializer::text_string(title)));
        }
        if let Some(creator) = &self.config.creator {
            info_entries.push(("Creator", ObjectSerializer::text_string(creator)));
            info_entries.push(("Producer", ObjectSerializer::text_string(creator)));
        }
        objects.push((info_id, ObjectSerializer::dict(info_entries)));

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", self.config.version)?;
        // Binary marker (recommended for binary content)
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (id, obj) in &objects {
            offsets.push(output.len());
            serializer.write_indirect(&mut output, *id, 0, obj)?;
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", objects.len() + 1)?;
        // Object 0 is always free
        writeln!(output, "0000000000 65535 f ")?;
        for offset in &offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(objects.len() as i64 + 1)),
            ("Root", ObjectSerializer::reference(catalog_id, 0)),
            ("Info", ObjectSerializer::reference(info_id, 0)),
        ]);

        writeln!(output, "trailer")?;
        serializer.write_object(&mut output, &trailer)?;
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        log::debug!(
            "Wrote PDF: {} pages, {} images, {} bytes",
            self.pages.len(),
            self.images.len(),
            output.len()
        );
        Ok(output)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn content(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_create_empty_pdf() {
        let mut writer = PdfWriter::new();
        writer.add_page(612.0, 792.0).finish();
        let text = content(&writer.finish().unwrap());

        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("/Type /Catalog"));
        assert!(text.contains("/Type /Pages"));
        assert!(text.contains("/Type /Page "));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("[0 0 612 792]"));
        assert!(text.ends_with("%%EOF"));
    }

    #[test]
    fn test_image_resources_and_placement() {
        let config = PdfWriterConfig::default().with_compress(false);
        let mut writer = PdfWriter::with_config(config);
        let image = ImageData::flate_from_rgb(2, 2, &[0u8; 12]).unwrap();
        let handle = writer.add_image(image);
        writer
            .add_page(612.0, 792.0)
            .draw_image(handle, 36.0, 456.0, 540.0, 300.0)
            .finish();

        let text = content(&writer.finish().unwrap());
        assert!(text.contains("/Subtype /Image"));
        assert!(text.contains("/XObject << /Im1 3 0 R >>"));
        assert!(text.contains("540 0 0 300 36 456 cm"));
        assert!(text.contains("/Im1 Do"));
    }

    #[test]
    fn test_metadata() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let config = PdfWriterConfig::default()
            .with_title("Quarterly Report")
            .with_creator("tests")
            .with_creation_date(date);
        let mut writer = PdfWriter::with_config(config);
        writer.add_page(612.0, 792.0).finish();

        let text = content(&writer.finish().unwrap());
        assert!(text.contains("/Title (Quarterly Report)"));
        assert!(text.contains("/Creator (tests)"));
        assert!(text.contains("/CreationDate (D:20240309140500+00'00')"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut writer = PdfWriter::new();
        writer.add_page(612.0, 792.0).finish();
        writer.add_page(595.0, 842.0).finish();
        let bytes = writer.finish().unwrap();

        let xref = bytes.windows(6).rposition(|w| w == b"\nxref\n").unwrap() + 1;
        let tail = content(&bytes[xref..]);
        let entries: Vec<usize> = tail
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        // catalog, pages, 2 x (page, content), info
        assert_eq!(entries.len(), 7);
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()));
        }
    }
}
