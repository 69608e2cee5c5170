//! Conversions between raster masks and vector geometry

mod lines;
mod polygonize;

pub use lines::{extend_line_ends, rasterize_line};
pub use polygonize::polygonize;
