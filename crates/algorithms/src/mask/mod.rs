//! Boolean cell masks and the operations that consume them
//!
//! A mask is a `Raster<u8>` with 1 for selected cells and 0 elsewhere, on the
//! same grid as the rasters it is combined with.

mod reclass;
mod regions;
mod zonal;

pub use reclass::{reclassify, ReclassEntry};
pub use regions::{label_regions, Region};
pub use zonal::{zonal_over_mask, ZonalSummary};

use hgvc_core::raster::{Raster, RasterElement};
use hgvc_core::{Error, Result};
use ndarray::Zip;

/// Selected cells are 1, others 0
pub type Mask = Raster<u8>;

fn check_shape<A: RasterElement, B: RasterElement>(a: &Raster<A>, b: &Raster<B>) -> Result<()> {
    if a.shape() != b.shape() {
        let (er, ec) = a.shape();
        let (ar, ac) = b.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }
    Ok(())
}

/// Mask of valid cells whose value satisfies `predicate`
pub fn mask_from<T, F>(raster: &Raster<T>, predicate: F) -> Mask
where
    T: RasterElement,
    F: Fn(f64) -> bool,
{
    let mut mask = raster.with_same_meta::<u8>(raster.rows(), raster.cols());
    Zip::from(mask.data_mut())
        .and(raster.data())
        .for_each(|m, &v| {
            if !raster.is_nodata(v) && v.to_f64().is_some_and(&predicate) {
                *m = 1;
            }
        });
    mask
}

fn combine(a: &Mask, b: &Mask, op: impl Fn(bool, bool) -> bool) -> Result<Mask> {
    check_shape(a, b)?;
    let mut out = a.with_same_meta::<u8>(a.rows(), a.cols());
    Zip::from(out.data_mut())
        .and(a.data())
        .and(b.data())
        .for_each(|o, &x, &y| *o = u8::from(op(x != 0, y != 0)));
    Ok(out)
}

/// Cells selected in both masks
pub fn mask_and(a: &Mask, b: &Mask) -> Result<Mask> {
    combine(a, b, |x, y| x && y)
}

/// Cells selected in either mask
pub fn mask_or(a: &Mask, b: &Mask) -> Result<Mask> {
    combine(a, b, |x, y| x || y)
}

/// Cells selected in `a` but not in `b`
pub fn mask_and_not(a: &Mask, b: &Mask) -> Result<Mask> {
    combine(a, b, |x, y| x && !y)
}

/// Values under the mask, NaN elsewhere
pub fn extract_by_mask(values: &Raster<f64>, mask: &Mask) -> Result<Raster<f64>> {
    check_shape(values, mask)?;
    let mut out = values.like(f64::NAN);
    out.set_nodata(Some(f64::NAN));
    Zip::from(out.data_mut())
        .and(values.data())
        .and(mask.data())
        .for_each(|o, &v, &m| {
            if m != 0 && !values.is_nodata(v) {
                *o = v;
            }
        });
    Ok(out)
}

/// Number of selected cells
pub fn count(mask: &Mask) -> usize {
    mask.data().iter().filter(|&&m| m != 0).count()
}

/// `(row, col)` of every selected cell, row-major
pub fn cells(mask: &Mask) -> Vec<(usize, usize)> {
    mask.data()
        .indexed_iter()
        .filter(|&(_, &m)| m != 0)
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripes() -> Raster<f64> {
        let mut r: Raster<f64> = Raster::new(4, 4);
        for row in 0..4 {
            for col in 0..4 {
                r.set(row, col, col as f64).unwrap();
            }
        }
        r.set(0, 3, f64::NAN).unwrap();
        r
    }

    #[test]
    fn test_mask_from_skips_nodata() {
        let m = mask_from(&stripes(), |v| v >= 2.0);
        assert_eq!(count(&m), 7);
        assert_eq!(m.get(0, 3).unwrap(), 0);
        assert_eq!(m.get(1, 3).unwrap(), 1);
    }

    #[test]
    fn test_boolean_ops() {
        let r = stripes();
        let a = mask_from(&r, |v| v >= 1.0);
        let b = mask_from(&r, |v| v <= 2.0);
        assert_eq!(count(&mask_and(&a, &b).unwrap()), 8);
        assert_eq!(count(&mask_or(&a, &b).unwrap()), 15);
        assert_eq!(count(&mask_and_not(&a, &b).unwrap()), 3);

        let small: Mask = Raster::new(2, 2);
        assert!(mask_and(&a, &small).is_err());
    }

    #[test]
    fn test_extract_by_mask() {
        let r = stripes();
        let m = mask_from(&r, |v| v == 1.0);
        let e = extract_by_mask(&r, &m).unwrap();
        assert_eq!(e.get(2, 1).unwrap(), 1.0);
        assert!(e.get(2, 2).unwrap().is_nan());
        assert_eq!(cells(&m), vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
    }
}
