//! Shared run state and per-segment terrain windows
//!
//! `RunContext` owns the read-only inputs of a run plus the rasters derived
//! once for the whole grid (decimal slope, curvature, bankfull width). Each
//! segment works on a `SegmentTerrain`: a copy of its valley block's bounding
//! window with everything outside the block masked out, so segments never
//! share mutable state. Derivatives are taken on the full DEM before masking,
//! so cells on a block edge see the terrain beyond it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::error::{RunError, SegmentError};
use crate::registry::SegmentRecord;
use crate::solver::{ChannelCrossSection, FloodSurface, ReachHydraulics};
use geo_types::LineString;
use hgvc_algorithms::hydrology::{bankfull_width, flood_extent, surface_volume};
use hgvc_algorithms::mask::{self, Mask};
use hgvc_algorithms::terrain::{curvature, slope, CurvatureType, SlopeUnits};
use hgvc_algorithms::vector::rasterize_line;
use hgvc_core::io::read_geotiff;
use hgvc_core::{Raster, RasterElement};
use tracing::{debug, info};

/// Gradient used when the stream course is perfectly flat
pub const MIN_REACH_SLOPE: f64 = 0.001;

/// Locations of the input rasters
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub dem: PathBuf,
    pub drainage_area: PathBuf,
    pub discharge: PathBuf,
    pub blocks: PathBuf,
}

/// Input grids, all on the DEM's grid
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub dem: Raster<f64>,
    pub drainage_area: Raster<f64>,
    /// Q100 discharge
    pub discharge: Raster<f64>,
    /// Valley block of every segment, as the segment id
    pub blocks: Raster<i32>,
}

fn read<T: RasterElement>(path: &Path) -> Result<Raster<T>, RunError> {
    read_geotiff(path).map_err(|source| RunError::Input {
        path: path.to_path_buf(),
        source,
    })
}

impl RunInputs {
    pub fn load(paths: &InputPaths) -> Result<Self, RunError> {
        let inputs = Self {
            dem: read(&paths.dem)?,
            drainage_area: read(&paths.drainage_area)?,
            discharge: read(&paths.discharge)?,
            blocks: read(&paths.blocks)?,
        };
        inputs.validate()?;
        Ok(inputs)
    }

    /// All rasters must share the DEM's north-up, square-celled grid
    pub fn validate(&self) -> Result<(), RunError> {
        let gt = self.dem.transform();
        if !gt.is_north_up() || !gt.has_square_cells() {
            return Err(RunError::Grid(
                "the DEM must be north-up with square cells".into(),
            ));
        }
        if !self.dem.same_grid(&self.drainage_area) {
            return Err(RunError::Grid("drainage area differs from the DEM".into()));
        }
        if !self.dem.same_grid(&self.discharge) {
            return Err(RunError::Grid("discharge differs from the DEM".into()));
        }
        if !self.dem.same_grid(&self.blocks) {
            return Err(RunError::Grid("valley blocks differ from the DEM".into()));
        }
        Ok(())
    }
}

/// Inclusive cell bounds of one valley block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellBox {
    row_min: usize,
    row_max: usize,
    col_min: usize,
    col_max: usize,
}

impl CellBox {
    fn include(&mut self, row: usize, col: usize) {
        self.row_min = self.row_min.min(row);
        self.row_max = self.row_max.max(row);
        self.col_min = self.col_min.min(col);
        self.col_max = self.col_max.max(col);
    }
}

/// Read-only state shared by every segment of a run
#[derive(Debug)]
pub struct RunContext {
    pub config: RunConfig,
    pub inputs: RunInputs,
    slope: Raster<f64>,
    curvature: Raster<f64>,
    bankfull: Raster<f64>,
    blocks: HashMap<i32, CellBox>,
}

impl RunContext {
    pub fn new(config: RunConfig, inputs: RunInputs) -> Result<Self, RunError> {
        config.validate().map_err(RunError::Config)?;
        inputs.validate()?;

        let slope = slope(&inputs.dem, SlopeUnits::Decimal).map_err(RunError::Derive)?;
        let curvature =
            curvature(&inputs.dem, CurvatureType::General).map_err(RunError::Derive)?;
        let bankfull = bankfull_width(&inputs.drainage_area, config.width_regression())
            .map_err(RunError::Derive)?;

        let mut blocks: HashMap<i32, CellBox> = HashMap::new();
        for ((row, col), &id) in inputs.blocks.data().indexed_iter() {
            if inputs.blocks.is_nodata(id) || id <= 0 {
                continue;
            }
            blocks
                .entry(id)
                .and_modify(|b| b.include(row, col))
                .or_insert(CellBox {
                    row_min: row,
                    row_max: row,
                    col_min: col,
                    col_max: col,
                });
        }
        info!(
            rows = inputs.dem.rows(),
            cols = inputs.dem.cols(),
            cell_size = inputs.dem.cell_size(),
            blocks = blocks.len(),
            "run context ready"
        );

        Ok(Self {
            config,
            inputs,
            slope,
            curvature,
            bankfull,
            blocks,
        })
    }

    /// Cut out and prepare the terrain of one segment
    pub fn terrain(&self, record: &SegmentRecord) -> Result<SegmentTerrain, SegmentError> {
        let length = match record.length {
            Some(l) if l.is_finite() && l > 0.0 => l,
            Some(l) => {
                return Err(SegmentError::MissingData(format!(
                    "segment length must be positive, got {l}"
                )))
            }
            None => return Err(SegmentError::MissingData("segment length is missing".into())),
        };

        let block_id = i32::try_from(record.id)
            .map_err(|_| SegmentError::MissingData(format!("id {} has no valley block", record.id)))?;
        let bbox = self
            .blocks
            .get(&block_id)
            .copied()
            .ok_or_else(|| SegmentError::MissingData("no valley block for this segment".into()))?;

        let (rows, cols) = self.inputs.dem.shape();
        let row0 = bbox.row_min.saturating_sub(1);
        let col0 = bbox.col_min.saturating_sub(1);
        let row1 = (bbox.row_max + 2).min(rows);
        let col1 = (bbox.col_max + 2).min(cols);
        let (wr, wc) = (row1 - row0, col1 - col0);

        let blocks = self.inputs.blocks.window(row0, col0, wr, wc)?;
        let block = mask::mask_from(&blocks, |v| v == f64::from(block_id));

        let dem = mask::extract_by_mask(&self.inputs.dem.window(row0, col0, wr, wc)?, &block)?;
        let slope = mask::extract_by_mask(&self.slope.window(row0, col0, wr, wc)?, &block)?;
        let curvature =
            mask::extract_by_mask(&self.curvature.window(row0, col0, wr, wc)?, &block)?;
        let discharge = self.inputs.discharge.window(row0, col0, wr, wc)?;
        let bankfull = self.bankfull.window(row0, col0, wr, wc)?;

        let stream = mask::mask_and(&rasterize_line(&record.course, &block), &block)?;
        let stream_cells = mask::cells(&stream);
        if stream_cells.is_empty() {
            return Err(SegmentError::MissingData(
                "stream course does not cross its valley block".into(),
            ));
        }

        let elevations: Vec<f64> = stream_cells.iter().filter_map(|&(r, c)| dem.value(r, c)).collect();
        if elevations.is_empty() {
            return Err(SegmentError::MissingData("no DEM values on the stream course".into()));
        }
        let min_elev = elevations.iter().copied().fold(f64::INFINITY, f64::min);
        let max_elev = elevations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut reach_slope = (max_elev - min_elev) / length;
        if reach_slope == 0.0 {
            reach_slope = MIN_REACH_SLOPE;
        }

        let q100 = stream_cells
            .iter()
            .filter_map(|&(r, c)| discharge.value(r, c))
            .fold(0.0f64, f64::max);
        let discharge_fallback = q100 <= 0.0;
        let q100 = if discharge_fallback {
            self.config.fallback_discharge
        } else {
            q100
        };

        let widths: Vec<f64> = stream_cells
            .iter()
            .filter_map(|&(r, c)| bankfull.value(r, c))
            .collect();
        if widths.is_empty() {
            return Err(SegmentError::MissingData(
                "no drainage area on the stream course".into(),
            ));
        }
        let bankfull_width = widths.iter().sum::<f64>() / widths.len() as f64;

        debug!(
            segment = record.id,
            window = ?(wr, wc),
            stream_cells = stream_cells.len(),
            reach_slope,
            q100,
            bankfull_width,
            "segment terrain extracted"
        );

        Ok(SegmentTerrain {
            dem,
            slope,
            curvature,
            block,
            stream,
            stream_cells,
            course: record.course.clone(),
            length,
            reach_slope,
            min_elev,
            max_elev,
            q100,
            discharge_fallback,
            target_discharge: q100 * self.config.q_tolerance_mult,
            bankfull_width,
        })
    }
}

/// Terrain of one valley block, cut to its bounding window
#[derive(Debug, Clone)]
pub struct SegmentTerrain {
    /// Elevations, NaN outside the block
    pub dem: Raster<f64>,
    /// Decimal slope, NaN outside the block
    pub slope: Raster<f64>,
    /// General curvature of the full DEM, NaN outside the block
    pub curvature: Raster<f64>,
    pub block: Mask,
    pub stream: Mask,
    pub stream_cells: Vec<(usize, usize)>,
    pub course: LineString<f64>,
    pub length: f64,
    /// Reach-averaged gradient along the stream course
    pub reach_slope: f64,
    pub min_elev: f64,
    pub max_elev: f64,
    /// Q100 read on the stream course, after fallback
    pub q100: f64,
    /// Whether the fallback discharge replaced a zero reading
    pub discharge_fallback: bool,
    pub target_discharge: f64,
    pub bankfull_width: f64,
}

impl SegmentTerrain {
    /// Heights above the channel of every cell flooded at `depth`
    pub fn flood(&self, depth: f64) -> Result<Raster<f64>, SegmentError> {
        Ok(flood_extent(&self.stream_cells, &self.slope, depth)?)
    }

    /// Cells flooded at `depth`
    pub fn flood_mask(&self, depth: f64) -> Result<Mask, SegmentError> {
        Ok(mask::mask_from(&self.flood(depth)?, |_| true))
    }

    pub fn hydraulics(&self) -> ReachHydraulics {
        ReachHydraulics {
            length: self.length,
            slope: self.reach_slope,
            target_discharge: self.target_discharge,
        }
    }
}

impl FloodSurface for SegmentTerrain {
    fn cross_section(&self, depth: f64) -> Result<ChannelCrossSection, SegmentError> {
        let sv = surface_volume(&self.flood(depth)?);
        Ok(ChannelCrossSection {
            area_2d: sv.area_2d,
            area_3d: sv.area_3d,
            volume: sv.volume,
        })
    }
}
