//! Hillslope steepness on each bank
//!
//! The hillslope zone is the ring around the hydro-geomorphic valley bottom,
//! clipped to the valley block and cut in two by the stream course extended
//! past both ends. The largest piece is the right bank by convention, the
//! next largest the left. Each bank's slope is binned at two thresholds and
//! the area share of the bins decides its steepness.

use crate::error::SegmentError;
use geo_types::{LineString, MultiPolygon};
use hgvc_algorithms::mask::{self, label_regions, reclassify, Mask, ReclassEntry};
use hgvc_algorithms::proximity::buffer_mask;
use hgvc_algorithms::vector::{extend_line_ends, polygonize, rasterize_line};
use hgvc_core::Raster;
use tracing::debug;

/// Factor applied to the buffer distance when extending the course to cut
/// the hillslope ring
pub const COURSE_EXTENSION_FACTOR: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HillslopeParams {
    pub hill_buff_dist: f64,
    /// Decimal slope at or below which a cell is low
    pub thresh_low: f64,
    /// Decimal slope above which a cell is high
    pub thresh_up: f64,
    /// Low-bin share needed for a low bank
    pub low_prop: f64,
    /// High-bin share needed for a high bank
    pub high_prop: f64,
}

impl Default for HillslopeParams {
    fn default() -> Self {
        Self {
            hill_buff_dist: 250.0,
            thresh_low: 0.30,
            thresh_up: 0.70,
            low_prop: 0.75,
            high_prop: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Right,
    Left,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Right => "R",
            Side::Left => "L",
        }
    }
}

/// Steepness category of one bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Steepness {
    Low = 1,
    Moderate = 2,
    High = 3,
}

impl Steepness {
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Category from the low and high bin shares
    pub fn from_proportions(low: f64, high: f64, params: &HillslopeParams) -> Self {
        if low >= params.low_prop {
            Steepness::Low
        } else if high >= params.high_prop {
            Steepness::High
        } else {
            Steepness::Moderate
        }
    }
}

/// Code written for a bank; 0 when the bank is absent
pub fn category_code(steepness: Option<Steepness>) -> i64 {
    steepness.map_or(0, Steepness::code)
}

/// Cells of one slope bin on one bank
#[derive(Debug, Clone)]
pub struct SlopeBin {
    /// 1 low, 2 moderate, 3 high
    pub class: u8,
    pub area: f64,
    pub polygon: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct HillslopeSide {
    pub side: Side,
    pub steepness: Steepness,
    /// Area share of the low, moderate and high bins
    pub proportions: [f64; 3],
    pub area: f64,
    /// Non-empty bins only
    pub bins: Vec<SlopeBin>,
}

#[derive(Debug, Clone, Default)]
pub struct Hillslopes {
    pub right: Option<HillslopeSide>,
    pub left: Option<HillslopeSide>,
}

impl Hillslopes {
    pub fn right_category(&self) -> Option<Steepness> {
        self.right.as_ref().map(|s| s.steepness)
    }

    pub fn left_category(&self) -> Option<Steepness> {
        self.left.as_ref().map(|s| s.steepness)
    }

    pub fn sides(&self) -> impl Iterator<Item = &HillslopeSide> {
        self.right.iter().chain(self.left.iter())
    }
}

/// Ring of cells around the valley bottom, cut along the extended course
pub fn hillslope_zone(
    valley_bottom: &Mask,
    block: &Mask,
    course: &LineString<f64>,
    params: &HillslopeParams,
) -> Result<Mask, SegmentError> {
    let ring = buffer_mask(valley_bottom, params.hill_buff_dist)?;
    let ring = mask::mask_and_not(&ring, valley_bottom)?;
    let ring = mask::mask_and(&ring, block)?;

    let cut_line = extend_line_ends(course, COURSE_EXTENSION_FACTOR * params.hill_buff_dist);
    let cut = rasterize_line(&cut_line, block);
    Ok(mask::mask_and_not(&ring, &cut)?)
}

/// Bin the slope of one bank and decide its steepness.
///
/// Returns `None` when the bank holds no valid slope cells.
pub fn classify_side(
    side: Side,
    slope: &Raster<f64>,
    bank: &Mask,
    params: &HillslopeParams,
) -> Result<Option<HillslopeSide>, SegmentError> {
    let values = mask::extract_by_mask(slope, bank)?;
    let table = [
        ReclassEntry::left_open(f64::NEG_INFINITY, params.thresh_low, 1.0),
        ReclassEntry::left_open(params.thresh_low, params.thresh_up, 2.0),
        ReclassEntry::left_open(params.thresh_up, f64::INFINITY, 3.0),
    ];
    let binned = reclassify(&values, &table, f64::NAN)?;
    let cell_area = slope.cell_area();

    let mut areas = [0.0f64; 3];
    let mut bins = Vec::new();
    for class in 1..=3u8 {
        let bin = mask::mask_from(&binned, |v| v == f64::from(class));
        let cells = mask::count(&bin);
        if cells == 0 {
            continue;
        }
        let area = cells as f64 * cell_area;
        areas[usize::from(class - 1)] = area;
        bins.push(SlopeBin {
            class,
            area,
            polygon: polygonize(&bin)?,
        });
    }

    let total: f64 = areas.iter().sum();
    if total <= 0.0 {
        return Ok(None);
    }
    let proportions = areas.map(|a| a / total);
    let steepness = Steepness::from_proportions(proportions[0], proportions[2], params);
    debug!(side = side.as_str(), ?proportions, ?steepness, "hillslope classified");

    Ok(Some(HillslopeSide {
        side,
        steepness,
        proportions,
        area: total,
        bins,
    }))
}

/// Split the hillslope zone into banks and classify them
pub fn classify_hillslopes(
    slope: &Raster<f64>,
    zone: &Mask,
    params: &HillslopeParams,
) -> Result<Hillslopes, SegmentError> {
    let (labels, mut regions) = label_regions(zone);
    regions.sort_by(|a, b| b.area.total_cmp(&a.area));

    let mut banks = Vec::with_capacity(2);
    for region in &regions {
        if banks.len() == 2 {
            break;
        }
        let side = if banks.is_empty() { Side::Right } else { Side::Left };
        let bank = mask::mask_from(&labels, |v| v == f64::from(region.label));
        if let Some(classified) = classify_side(side, slope, &bank, params)? {
            banks.push(classified);
        }
    }

    let mut banks = banks.into_iter();
    Ok(Hillslopes {
        right: banks.next(),
        left: banks.next(),
    })
}
