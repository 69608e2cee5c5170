//! # HGVC Core
//!
//! Core types and I/O for hydro-geomorphic valley classification.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Connectivity`: 4/8 neighbour offsets with step lengths
//! - Vector features with ordered attributes
//! - GeoTIFF and GeoJSON I/O

pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{Connectivity, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Connectivity, GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
