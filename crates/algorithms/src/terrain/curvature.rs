//! Surface curvature from DEMs
//!
//! Second-order partial derivatives from a 3x3 neighbourhood
//! (Zevenbergen & Thorne 1987):
//!
//! ```text
//! z1 z2 z3
//! z4 z5 z6
//! z7 z8 z9
//! ```
//!
//!   p = (z6 - z4) / 2cs         q = (z2 - z8) / 2cs
//!   r = (z4 - 2z5 + z6) / cs²   t = (z2 - 2z5 + z8) / cs²
//!   s = (z3 - z1 - z9 + z7) / 4cs²
//!
//!   General = -(r + t) / 2
//!   Profile = -(r p² + 2 s p q + t q²) / (p² + q²)
//!   Plan    = -(r q² - 2 s p q + t p²) / (p² + q²)
//!
//! Sign convention: upward-concave surfaces (valley floors, footslopes) are
//! negative, convex crests positive.

use hgvc_core::raster::Raster;
use hgvc_core::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Which curvature to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurvatureType {
    #[default]
    General,
    /// Along the direction of steepest descent
    Profile,
    /// Perpendicular to the direction of steepest descent
    Plan,
}

/// Calculate surface curvature (1/m) from a DEM.
///
/// A neighbour outside the grid or missing is extrapolated linearly through
/// the centre from the opposite neighbour, so a plane stays flat up to its
/// edges. With both neighbours of a pair missing, the centre value is used.
pub fn curvature(dem: &Raster<f64>, curvature_type: CurvatureType) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let cs = dem.cell_size();
    let cs2 = cs * cs;
    let two_cs = 2.0 * cs;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let z5 = match dem.value(row, col) {
                    Some(v) => v,
                    None => continue,
                };
                let at = |dr: isize, dc: isize| -> Option<f64> {
                    let r = row as isize + dr;
                    let c = col as isize + dc;
                    if r < 0 || c < 0 {
                        return None;
                    }
                    dem.value(r as usize, c as usize)
                };
                let z = |dr: isize, dc: isize| -> f64 {
                    at(dr, dc)
                        .or_else(|| at(-dr, -dc).map(|opposite| 2.0 * z5 - opposite))
                        .unwrap_or(z5)
                };

                let (z1, z2, z3) = (z(-1, -1), z(-1, 0), z(-1, 1));
                let (z4, z6) = (z(0, -1), z(0, 1));
                let (z7, z8, z9) = (z(1, -1), z(1, 0), z(1, 1));

                let p = (z6 - z4) / two_cs;
                let q = (z2 - z8) / two_cs;
                let r = (z4 - 2.0 * z5 + z6) / cs2;
                let s = (z3 - z1 - z9 + z7) / (4.0 * cs2);
                let t = (z2 - 2.0 * z5 + z8) / cs2;

                row_data[col] = match curvature_type {
                    CurvatureType::General => -(r + t) / 2.0,
                    CurvatureType::Profile | CurvatureType::Plan => {
                        let p2q2 = p * p + q * q;
                        if p2q2 < 1e-20 {
                            0.0
                        } else if curvature_type == CurvatureType::Profile {
                            -(r * p * p + 2.0 * s * p * q + t * q * q) / p2q2
                        } else {
                            -(r * q * q - 2.0 * s * p * q + t * p * p) / p2q2
                        }
                    }
                };
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hgvc_core::GeoTransform;

    fn surface(f: impl Fn(f64, f64) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(21, 21);
        dem.set_transform(GeoTransform::new(0.0, 21.0, 1.0, -1.0));
        for r in 0..21 {
            for c in 0..21 {
                dem.set(r, c, f(c as f64 - 10.0, 10.0 - r as f64)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_plane_has_zero_curvature() {
        let dem = surface(|x, y| 2.0 * x + y);
        let k = curvature(&dem, CurvatureType::General).unwrap();
        assert_relative_eq!(k.get(10, 10).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_is_flat_at_edges_and_holes() {
        let mut dem = surface(|x, y| 0.5 * x - 0.1 * y);
        dem.set(10, 10, f64::NAN).unwrap();
        let k = curvature(&dem, CurvatureType::General).unwrap();
        for (r, c) in [(0, 0), (0, 10), (20, 10), (10, 20), (9, 10), (10, 11)] {
            assert_relative_eq!(k.get(r, c).unwrap(), 0.0, epsilon = 1e-12);
        }
        assert!(k.get(10, 10).unwrap().is_nan());
    }

    #[test]
    fn test_bowl_is_negative() {
        let dem = surface(|x, y| x * x + y * y);
        let k = curvature(&dem, CurvatureType::General).unwrap();
        // r = t = 2 -> -(2 + 2) / 2
        assert_relative_eq!(k.get(10, 10).unwrap(), -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dome_is_positive() {
        let dem = surface(|x, y| -(x * x + y * y));
        let k = curvature(&dem, CurvatureType::General).unwrap();
        assert!(k.get(5, 5).unwrap() > 0.0);
    }

    #[test]
    fn test_valley_cross_profile() {
        // Trough along y, parabolic across x: plan curvature carries the signal
        let dem = surface(|x, y| x * x + 0.5 * y);
        let plan = curvature(&dem, CurvatureType::Plan).unwrap();
        let profile = curvature(&dem, CurvatureType::Profile).unwrap();
        // On the thalweg the gradient runs down-valley only
        assert_relative_eq!(plan.get(10, 10).unwrap(), -2.0, epsilon = 1e-9);
        assert_relative_eq!(profile.get(10, 10).unwrap(), 0.0, epsilon = 1e-9);
    }
}
