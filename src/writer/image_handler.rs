//! Image XObjects for PDF generation.
//!
//! Per ISO 32000-1 section 8.9, images are represented as XObjects. Page
//! bitmaps are embedded either as baseline JPEG (DCTDecode) or as
//! zlib-compressed samples (FlateDecode).

use std::collections::HashMap;

use super::pdf_writer::compress_data;
use crate::error::{Error, Result};
use crate::object::Object;

/// Encoding of the embedded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image (DCTDecode filter)
    Jpeg,
    /// Deflate-compressed samples (FlateDecode filter)
    Flate,
}

impl ImageFormat {
    /// PDF filter name for this encoding.
    pub fn filter(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "DCTDecode",
            ImageFormat::Flate => "FlateDecode",
        }
    }
}

/// An 8-bit DeviceRGB image ready for embedding.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Image format
    pub format: ImageFormat,
    /// Encoded image data
    pub data: Vec<u8>,
}

fn check_rgb_len(width: u32, height: u32, rgb: &[u8]) -> Result<()> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(Error::Image(format!(
            "expected {} sample bytes for {}x{}, got {}",
            expected,
            width,
            height,
            rgb.len()
        )));
    }
    Ok(())
}

impl ImageData {
    /// Encode RGB samples as baseline JPEG at the given quality (1-100).
    pub fn jpeg_from_rgb(width: u32, height: u32, rgb: &[u8], quality: u8) -> Result<Self> {
        check_rgb_len(width, height, rgb)?;
        let mut encoded = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100))
            .encode(rgb, width, height, image::ColorType::Rgb8)
            .map_err(|e| Error::Image(format!("JPEG encoding failed: {}", e)))?;
        Ok(Self {
            width,
            height,
            format: ImageFormat::Jpeg,
            data: encoded,
        })
    }

    /// Compress RGB samples with Flate.
    pub fn flate_from_rgb(width: u32, height: u32, rgb: &[u8]) -> Result<Self> {
        check_rgb_len(width, height, rgb)?;
        Ok(Self {
            width,
            height,
            format: ImageFormat::Flate,
            data: compress_data(rgb)?,
        })
    }

    /// Build the PDF Image XObject dictionary.
    pub fn build_xobject_dict(&self) -> HashMap<String, Object> {
        let mut dict = HashMap::new();

        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
        dict.insert("Width".to_string(), Object::Integer(self.width as i64));
        dict.insert("Height".to_string(), Object::Integer(self.height as i64));
        dict.insert("ColorSpace".to_string(), Object::Name("DeviceRGB".to_string()));
        dict.insert("BitsPerComponent".to_string(), Object::Integer(8));
        dict.insert(
            "Filter".to_string(),
            Object::Name(self.format.filter().to_string()),
        );
        dict.insert("Length".to_string(), Object::Integer(self.data.len() as i64));

        dict
    }

    /// The XObject as a stream object.
    pub fn to_object(&self) -> Object {
        Object::stream(self.build_xobject_dict(), self.data.clone())
    }

    /// Get the aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Calculate dimensions to fit within a bounding box while maintaining aspect ratio.
    pub fn fit_to_box(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let aspect = self.aspect_ratio();
        let box_aspect = max_width / max_height;

        if aspect > box_aspect {
            // Wider than the box, constrain by width
            (max_width, max_width / aspect)
        } else {
            (max_height * aspect, max_height)
        }
    }
}
