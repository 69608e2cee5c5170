//! Reading and writing rasters and vector layers

mod features;
mod geotiff;

pub use features::{to_geojson, write_geojson};
pub use geotiff::{read_geotiff, write_geotiff};
