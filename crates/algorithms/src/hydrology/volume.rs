//! Planimetric area, surface area and volume of a height surface

use hgvc_core::raster::Raster;

/// Area and volume of the valid cells of a height raster above the datum 0
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceVolume {
    /// Planimetric area of valid cells
    pub area_2d: f64,
    /// Surface area of the height surface over those cells
    pub area_3d: f64,
    /// Volume between the surface and the datum, counting heights above it
    pub volume: f64,
    pub cells: usize,
}

/// Integrate a height surface over its valid cells.
///
/// Surface area uses central differences of the heights; a neighbour
/// outside the surface contributes a zero gradient on that side.
pub fn surface_volume(heights: &Raster<f64>) -> SurfaceVolume {
    let (rows, cols) = heights.shape();
    let cs = heights.cell_size();
    let cell_area = heights.cell_area();
    let mut out = SurfaceVolume::default();

    for row in 0..rows {
        for col in 0..cols {
            let h = match heights.value(row, col) {
                Some(v) => v,
                None => continue,
            };
            let at = |r: isize, c: isize| -> f64 {
                if r < 0 || c < 0 {
                    return h;
                }
                heights.value(r as usize, c as usize).unwrap_or(h)
            };
            let (r, c) = (row as isize, col as isize);
            let p = (at(r, c + 1) - at(r, c - 1)) / (2.0 * cs);
            let q = (at(r - 1, c) - at(r + 1, c)) / (2.0 * cs);

            out.cells += 1;
            out.area_2d += cell_area;
            out.area_3d += cell_area * (1.0 + p * p + q * q).sqrt();
            out.volume += h.max(0.0) * cell_area;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hgvc_core::GeoTransform;

    #[test]
    fn test_flat_surface() {
        let mut h: Raster<f64> = Raster::filled(4, 5, 2.0);
        h.set_transform(GeoTransform::new(0.0, 40.0, 10.0, -10.0));
        let sv = surface_volume(&h);
        assert_eq!(sv.cells, 20);
        assert_relative_eq!(sv.area_2d, 2000.0);
        assert_relative_eq!(sv.area_3d, 2000.0);
        assert_relative_eq!(sv.volume, 4000.0);
    }

    #[test]
    fn test_inclined_surface_area() {
        let mut h: Raster<f64> = Raster::new(3, 20);
        h.set_transform(GeoTransform::new(0.0, 30.0, 10.0, -10.0));
        for r in 0..3 {
            for c in 0..20 {
                h.set(r, c, c as f64 * 10.0).unwrap();
            }
        }
        let sv = surface_volume(&h);
        // interior cells sit on a 45 degree plane
        let interior = 3.0 * 18.0 * 100.0 * 2f64.sqrt();
        assert!(sv.area_3d > interior);
        assert!(sv.area_3d < 3.0 * 20.0 * 100.0 * 2f64.sqrt());
    }

    #[test]
    fn test_missing_cells_ignored_and_zero_volume() {
        let mut h: Raster<f64> = Raster::filled(3, 3, f64::NAN);
        h.set_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        h.set(1, 1, 0.0).unwrap();
        let sv = surface_volume(&h);
        assert_eq!(sv.cells, 1);
        assert_relative_eq!(sv.area_2d, 1.0);
        assert_relative_eq!(sv.volume, 0.0);
    }
}
