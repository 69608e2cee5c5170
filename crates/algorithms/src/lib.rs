//! # HGVC Algorithms
//!
//! Raster and geometry operations consumed by the valley classifier.
//!
//! - **terrain**: slope, curvature
//! - **hydrology**: bounded flood extent, surface area/volume, channel width
//! - **mask**: boolean masks, reclassification, zonal statistics, region labelling
//! - **proximity**: Euclidean distance and raster buffering
//! - **vector**: polygonization, line rasterization and extension

pub mod hydrology;
pub mod mask;
pub mod proximity;
pub mod terrain;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        bankfull_width, flood_extent, surface_volume, SurfaceVolume, WidthRegression,
    };
    pub use crate::mask::{
        extract_by_mask, label_regions, mask_and, mask_and_not, mask_from, mask_or,
        reclassify, zonal_over_mask, Mask, ReclassEntry, Region, ZonalSummary,
    };
    pub use crate::proximity::{buffer_mask, euclidean_distance};
    pub use crate::terrain::{curvature, slope, CurvatureType, SlopeUnits};
    pub use crate::vector::{extend_line_ends, polygonize, rasterize_line};
    pub use hgvc_core::prelude::*;
}
