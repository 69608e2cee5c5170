//! Hydrologic, geomorphic and hydro-geomorphic valley bottoms
//!
//! The hydrologic bottom is the converged Q100 flood. The geomorphic bottom
//! is a second flood, to the depth of the break in slope: the mean flood
//! height over the most concave cells between the bankfull channel and a
//! flood at `h_mult` times the Q100 depth. The hydro-geomorphic bottom is
//! their intersection.

use crate::context::SegmentTerrain;
use crate::error::SegmentError;
use crate::solver::FloodSolution;
use geo::Area;
use geo_types::MultiPolygon;
use hgvc_algorithms::mask::{self, zonal_over_mask, Mask};
use hgvc_algorithms::proximity::{buffer_mask, euclidean_distance};
use hgvc_algorithms::vector::polygonize;
use hgvc_core::raster::Connectivity;
use hgvc_core::Raster;
use tracing::debug;

/// Curvature (1/m) a candidate must fall below to count as concave at all.
///
/// Planar terrain comes out of the curvature kernel as rounding noise of
/// either sign; minima above this are treated as flat.
pub const FLAT_CURVATURE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryParams {
    /// Multiple of the Q100 depth flooded to find break-in-slope candidates
    pub h_mult: f64,
    /// Multiple of the bankfull width excluded around the stream
    pub bf_mult: f64,
    pub bis_cutoff_fraction: f64,
    pub bis_min_depth: f64,
    /// Distance kept from the valley block edge when measuring widths
    pub edge_setback: f64,
}

impl Default for BoundaryParams {
    fn default() -> Self {
        Self {
            h_mult: 2.0,
            bf_mult: 1.0,
            bis_cutoff_fraction: 0.3,
            bis_min_depth: 1.0,
            edge_setback: 5.0,
        }
    }
}

/// How a boundary's width was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthMethod {
    /// Twice the mean distance from the boundary edge to the stream
    Edge,
    /// Area over segment length
    Area,
}

#[derive(Debug, Clone)]
pub struct Boundary {
    pub mask: Mask,
    pub polygon: MultiPolygon<f64>,
    pub area: f64,
    pub width: f64,
    pub width_method: WidthMethod,
}

#[derive(Debug, Clone)]
pub struct ValleyBoundaries {
    pub hydrologic: Boundary,
    pub geomorphic: Boundary,
    pub hydro_geomorphic: Boundary,
    /// Flood depth of the geomorphic bottom
    pub bis_depth: f64,
    /// Cells selected as break in slope
    pub bis_cells: usize,
    /// Curvature below which candidates were selected
    pub curvature_cutoff: Option<f64>,
}

/// Width of a valley bottom by the edge technique.
///
/// Edge cells are bottom cells with a 4-neighbour inside the block but
/// outside the bottom, kept only where they lie farther than `setback` inside
/// the block. An edge cell centre sits half a cell inside the boundary, so
/// half a cell is added to its distance from the stream. Without edge cells
/// the width falls back to area over length.
pub fn boundary_width(
    bottom: &Mask,
    block: &Mask,
    stream_distance: &Raster<f64>,
    setback: f64,
    length: f64,
) -> Result<(f64, WidthMethod), SegmentError> {
    let (rows, cols) = bottom.shape();
    let cs = bottom.cell_size();
    let interior = buffer_mask(block, -setback)?;
    let is_set = |m: &Mask, r: usize, c: usize| m.data()[(r, c)] != 0;

    let mut sum = 0.0;
    let mut n = 0usize;
    for row in 0..rows {
        for col in 0..cols {
            if !is_set(bottom, row, col) || !is_set(&interior, row, col) {
                continue;
            }
            let on_edge = Connectivity::Four
                .neighbors(row, col, rows, cols)
                .any(|(nr, nc, _)| is_set(block, nr, nc) && !is_set(bottom, nr, nc));
            if !on_edge {
                continue;
            }
            if let Some(d) = stream_distance.value(row, col) {
                sum += d + cs / 2.0;
                n += 1;
            }
        }
    }

    if n > 0 {
        return Ok((2.0 * sum / n as f64, WidthMethod::Edge));
    }
    if length <= 0.0 {
        return Err(SegmentError::Numerical("segment length is zero".into()));
    }
    let area = mask::count(bottom) as f64 * bottom.cell_area();
    Ok((area / length, WidthMethod::Area))
}

/// Curvature below which candidate cells count as break in slope.
///
/// `None` when no candidate is more concave than `-FLAT_CURVATURE`.
pub fn break_in_slope_cutoff(
    curvature: &Raster<f64>,
    candidates: &Mask,
    fraction: f64,
) -> Result<Option<f64>, SegmentError> {
    Ok(zonal_over_mask(curvature, candidates)?
        .filter(|z| z.min < -FLAT_CURVATURE)
        .map(|z| z.min * fraction))
}

fn boundary(
    bottom: Mask,
    terrain: &SegmentTerrain,
    stream_distance: &Raster<f64>,
    setback: f64,
) -> Result<Boundary, SegmentError> {
    let (width, width_method) =
        boundary_width(&bottom, &terrain.block, stream_distance, setback, terrain.length)?;
    let polygon = polygonize(&bottom)?;
    Ok(Boundary {
        area: polygon.unsigned_area(),
        polygon,
        mask: bottom,
        width,
        width_method,
    })
}

/// Derive the three valley bottoms from a converged flood.
///
/// Recovered conditions (no break in slope, width fallback) are appended to
/// `notices`.
pub fn build_boundaries(
    terrain: &SegmentTerrain,
    solution: &FloodSolution,
    params: &BoundaryParams,
    notices: &mut Vec<String>,
) -> Result<ValleyBoundaries, SegmentError> {
    let hydrologic = terrain.flood_mask(solution.depth)?;

    let upper = terrain.flood(solution.depth * params.h_mult)?;
    let stream_distance = euclidean_distance(&terrain.stream)?;
    let channel_reach = terrain.bankfull_width * params.bf_mult;
    let channel = mask::mask_from(&stream_distance, |d| d <= channel_reach);
    let candidates = mask::mask_and_not(&mask::mask_from(&upper, |_| true), &channel)?;

    let curvature_cutoff =
        break_in_slope_cutoff(&terrain.curvature, &candidates, params.bis_cutoff_fraction)?;
    let selected = match curvature_cutoff {
        Some(cutoff) => {
            let concave = mask::mask_from(&terrain.curvature, |c| c < cutoff);
            mask::mask_and(&concave, &candidates)?
        }
        None => candidates.like(0),
    };
    let bis_cells = mask::count(&selected);

    let bis_depth = match zonal_over_mask(&upper, &selected)? {
        Some(z) => z.mean.max(params.bis_min_depth),
        None => {
            notices.push(format!(
                "no break in slope found; geomorphic depth set to {}",
                params.bis_min_depth
            ));
            params.bis_min_depth
        }
    };
    debug!(
        depth = solution.depth,
        ?curvature_cutoff,
        bis_cells,
        bis_depth,
        "break in slope located"
    );

    let geomorphic = terrain.flood_mask(bis_depth)?;
    let hydro_geomorphic = mask::mask_and(&geomorphic, &hydrologic)?;

    let setback = params.edge_setback;
    let hydrologic = boundary(hydrologic, terrain, &stream_distance, setback)?;
    let geomorphic = boundary(geomorphic, terrain, &stream_distance, setback)?;
    let hydro_geomorphic = boundary(hydro_geomorphic, terrain, &stream_distance, setback)?;

    for (name, b) in [
        ("hydrologic", &hydrologic),
        ("geomorphic", &geomorphic),
        ("hydro-geomorphic", &hydro_geomorphic),
    ] {
        if b.width_method == WidthMethod::Area {
            notices.push(format!(
                "{name} bottom has no edge away from the block boundary; width from area"
            ));
        }
    }

    Ok(ValleyBoundaries {
        hydrologic,
        geomorphic,
        hydro_geomorphic,
        bis_depth,
        bis_cells,
        curvature_cutoff,
    })
}
