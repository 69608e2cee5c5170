//! Terrain derivatives from DEMs

mod curvature;
mod slope;

pub use curvature::{curvature, CurvatureType};
pub use slope::{slope, SlopeUnits};
