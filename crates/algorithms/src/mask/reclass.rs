//! Range-table reclassification

use hgvc_core::raster::Raster;
use hgvc_core::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;

/// Maps a value range to an output value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReclassEntry {
    pub min: f64,
    pub max: f64,
    pub value: f64,
    pub include_min: bool,
    pub include_max: bool,
}

impl ReclassEntry {
    /// `[min, max)`
    pub fn new(min: f64, max: f64, value: f64) -> Self {
        Self {
            min,
            max,
            value,
            include_min: true,
            include_max: false,
        }
    }

    /// `(min, max]`
    pub fn left_open(min: f64, max: f64, value: f64) -> Self {
        Self {
            min,
            max,
            value,
            include_min: false,
            include_max: true,
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        let above = if self.include_min { v >= self.min } else { v > self.min };
        let below = if self.include_max { v <= self.max } else { v < self.max };
        above && below
    }
}

/// Reclassify valid cells by the first matching entry.
///
/// Unmatched valid cells get `default_value`; missing cells stay NaN.
pub fn reclassify(
    raster: &Raster<f64>,
    classes: &[ReclassEntry],
    default_value: f64,
) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if let Some(v) = raster.value(row, col) {
                    *out = classes
                        .iter()
                        .find(|e| e.contains(v))
                        .map_or(default_value, |e| e.value);
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
