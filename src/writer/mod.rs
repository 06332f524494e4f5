//! PDF writing for raster exports.
//!
//! ## Architecture
//!
//! ```text
//! page bitmaps
//!     ↓
//! [ImageData] (JPEG / Flate image XObjects)
//!     ↓
//! [ContentStreamBuilder] (image placement operators)
//!     ↓
//! [PdfWriter] (assembles complete PDF structure)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ```ignore
//! use rfpress::writer::{ImageData, PdfWriter};
//!
//! let mut writer = PdfWriter::new();
//! let image = writer.add_image(ImageData::jpeg_from_rgb(w, h, &rgb, 92)?);
//! writer.add_page(612.0, 792.0).draw_image(image, 36.0, 36.0, 540.0, 720.0);
//! let bytes = writer.finish()?;
//! ```

mod content_stream;
mod image_handler;
mod object_serializer;
mod pdf_writer;

pub use content_stream::{ContentStreamBuilder, ContentStreamOp};
pub use image_handler::{ImageData, ImageFormat};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{pdf_date, ImageHandle, PageBuilder, PdfWriter, PdfWriterConfig};
