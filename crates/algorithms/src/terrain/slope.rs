//! Slope calculation from DEMs
//!
//! Horn (1981) 3x3 finite differences. The valley solver works on decimal
//! slope (rise over run), which is also the flood cost surface.

use hgvc_core::raster::Raster;
use hgvc_core::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeUnits {
    /// Rise over run (tan of the slope angle)
    #[default]
    Decimal,
    Degrees,
    Percent,
}

/// Calculate slope from a DEM
///
/// ```text
/// a b c
/// d e f
/// g h i
/// ```
///
/// dz/dx = ((c + 2f + i) - (a + 2d + g)) / (8 * cellsize)
/// dz/dy = ((g + 2h + i) - (a + 2b + c)) / (8 * cellsize)
///
/// A neighbour outside the grid or missing is extrapolated linearly through
/// the centre from the opposite neighbour, so every valid cell gets a slope
/// and a plane keeps its gradient up to the border. With both neighbours of
/// a pair missing, the centre value is used.
pub fn slope(dem: &Raster<f64>, units: SlopeUnits) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let cs = dem.cell_size();
    if !(cs > 0.0) {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: cs.to_string(),
            reason: "must be positive".into(),
        });
    }
    let eight_cs = 8.0 * cs;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for col in 0..cols {
                let e = match dem.value(row, col) {
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
                        .or_else(|| at(-dr, -dc).map(|opposite| 2.0 * e - opposite))
                        .unwrap_or(e)
                };

                let (a, b, c) = (z(-1, -1), z(-1, 0), z(-1, 1));
                let (d, f) = (z(0, -1), z(0, 1));
                let (g, h, i) = (z(1, -1), z(1, 0), z(1, 1));

                let dz_dx = ((c + 2.0 * f + i) - (a + 2.0 * d + g)) / eight_cs;
                let dz_dy = ((g + 2.0 * h + i) - (a + 2.0 * b + c)) / eight_cs;
                let rise_run = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

                row_data[col] = match units {
                    SlopeUnits::Decimal => rise_run,
                    SlopeUnits::Degrees => rise_run.atan().to_degrees(),
                    SlopeUnits::Percent => rise_run * 100.0,
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
