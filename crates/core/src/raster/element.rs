//! Cell value trait

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
///
/// Elevation, discharge and drainage-area grids are `f64`; zone ids are
/// `i32`; boolean masks are `u8` (0 / 1).
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Value used for missing cells when none is declared
    fn default_nodata() -> Self;

    /// Whether this value is missing, given the declared no-data value
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Lossy conversion to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_int {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.is_some_and(|nd| *self == nd)
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if !self.is_finite() {
                    return true;
                }
                match nodata {
                    Some(nd) if nd.is_finite() => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    _ => false,
                }
            }
        }
    )*};
}

impl_int!(u8, i16, u16, i32, u32);
impl_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_nodata_includes_nan_and_declared_value() {
        assert!(f64::NAN.is_nodata(None));
        assert!((-9999.0_f64).is_nodata(Some(-9999.0)));
        assert!(!1.5_f64.is_nodata(Some(-9999.0)));
    }

    #[test]
    fn int_nodata_requires_declaration() {
        assert!(!0_i32.is_nodata(None));
        assert!((-1_i32).is_nodata(Some(-1)));
    }
}
