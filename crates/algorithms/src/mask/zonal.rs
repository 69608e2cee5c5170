//! Statistics of a value raster under a mask

use super::{check_shape, Mask};
use hgvc_core::raster::Raster;
use hgvc_core::Result;

/// Summary of the valid values under a mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonalSummary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarise `values` over the selected cells of `zone`.
///
/// Returns `None` when no selected cell carries a valid value.
pub fn zonal_over_mask(values: &Raster<f64>, zone: &Mask) -> Result<Option<ZonalSummary>> {
    check_shape(values, zone)?;

    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for ((row, col), &m) in zone.data().indexed_iter() {
        if m == 0 {
            continue;
        }
        if let Some(v) = values.value(row, col) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
    }

    if count == 0 {
        return Ok(None);
    }

    Ok(Some(ZonalSummary {
        count,
        sum,
        mean: sum / count as f64,
        min,
        max,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::mask_from;
    use approx::assert_relative_eq;

    #[test]
    fn test_summary_under_mask() {
        let values = Raster::from_vec(vec![1.0, 2.0, 3.0, f64::NAN, 10.0, 20.0], 2, 3).unwrap();
        let zone = mask_from(&Raster::from_vec(vec![1, 1, 1, 1, 0, 0], 2, 3).unwrap(), |v: f64| v > 0.0);

        let s = zonal_over_mask(&values, &zone).unwrap().unwrap();
        assert_eq!(s.count, 3);
        assert_relative_eq!(s.mean, 2.0);
        assert_relative_eq!(s.min, 1.0);
        assert_relative_eq!(s.max, 3.0);
    }

    #[test]
    fn test_empty_zone() {
        let values: Raster<f64> = Raster::filled(2, 2, 1.0);
        let zone: Mask = Raster::new(2, 2);
        assert_eq!(zonal_over_mask(&values, &zone).unwrap(), None);
    }
}
