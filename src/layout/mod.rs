//! Section splitting and pagination for the raster export.

mod paginator;
mod sections;

pub use paginator::{PageGroup, Pagination, Paginator, RenderedBlock};
pub use sections::{split_sections, Section};
