//! PDF content stream builder.
//!
//! Raster pages only ever place images, so the operator set is the graphics
//! state subset needed for that (ISO 32000-1:2008 Section 8.4 and 8.8).

use super::object_serializer::format_real;
use std::io::Write;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set transformation matrix (cm)
    Transform(f32, f32, f32, f32, f32, f32),
    /// Paint an XObject (Do)
    PaintXObject(String),
}

/// Accumulates content stream operators.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
}

impl ContentStreamBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw operation.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Place an image XObject into the rectangle at `(x, y)` (lower-left)
    /// with the given size, in points.
    pub fn draw_image(
        &mut self,
        resource_id: &str,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> &mut Self {
        self.op(ContentStreamOp::SaveState);
        self.op(ContentStreamOp::Transform(width, 0.0, 0.0, height, x, y));
        self.op(ContentStreamOp::PaintXObject(resource_id.to_string()));
        self.op(ContentStreamOp::RestoreState)
    }

    /// Whether no operations were added.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Serialize the operations, one per line.
    pub fn build(&self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op)?;
            writeln!(buf)?;
        }
        Ok(buf)
    }
}

fn write_op<W: Write>(w: &mut W, op: &ContentStreamOp) -> std::io::Result<()> {
    match op {
        ContentStreamOp::SaveState => write!(w, "q"),
        ContentStreamOp::RestoreState => write!(w, "Q"),
        ContentStreamOp::Transform(a, b, c, d, e, f) => {
            let nums = [a, b, c, d, e, f].map(|n| format_real(f64::from(*n)));
            write!(w, "{} cm", nums.join(" "))
        },
        ContentStreamOp::PaintXObject(name) => write!(w, "/{} Do", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_image_ops() {
        let mut builder = ContentStreamBuilder::new();
        builder.draw_image("Im1", 36.0, 100.5, 540.0, 691.5);
        let content = String::from_utf8(builder.build().unwrap()).unwrap();
        assert_eq!(content, "q\n540 0 0 691.5 36 100.5 cm\n/Im1 Do\nQ\n");
    }

    #[test]
    fn test_empty_builder() {
        let builder = ContentStreamBuilder::new();
        assert!(builder.is_empty());
        assert!(builder.build().unwrap().is_empty());
    }
}
