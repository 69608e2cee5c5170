//! Bankfull channel width from drainage area

use hgvc_core::raster::Raster;
use hgvc_core::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Power-law regression `width = alpha * area^beta`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthRegression {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for WidthRegression {
    fn default() -> Self {
        Self {
            alpha: 2.26,
            beta: 0.31,
        }
    }
}

impl WidthRegression {
    /// Width for one drainage area; `None` for negative or missing areas
    pub fn width(&self, drainage_area: f64) -> Option<f64> {
        (drainage_area.is_finite() && drainage_area >= 0.0)
            .then(|| self.alpha * drainage_area.powf(self.beta))
    }
}

/// Bankfull width raster over a drainage-area raster
pub fn bankfull_width(drainage_area: &Raster<f64>, regression: WidthRegression) -> Result<Raster<f64>> {
    let (rows, cols) = drainage_area.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    drainage_area
                        .value(row, col)
                        .and_then(|a| regression.width(a))
                        .unwrap_or(f64::NAN)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut output = drainage_area.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
