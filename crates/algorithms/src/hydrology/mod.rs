//! Hydrologic raster operations

mod channel;
mod flood;
mod volume;

pub use channel::{bankfull_width, WidthRegression};
pub use flood::flood_extent;
pub use volume::{surface_volume, SurfaceVolume};
