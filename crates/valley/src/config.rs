//! Run configuration
//!
//! Every constant of the classification is a field here, with the reference
//! values as defaults. A JSON file may set any subset of fields; the CLI then
//! overrides individual ones.

use crate::boundaries::BoundaryParams;
use crate::classify::ClassifyParams;
use crate::error::RunError;
use crate::hillslope::HillslopeParams;
use crate::solver::SolverParams;
use hgvc_algorithms::hydrology::WidthRegression;
use hgvc_core::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one classification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Manning's roughness coefficient
    pub mannings_n: f64,
    /// Certainty multiplier applied to the raster Q100
    pub q_tolerance_mult: f64,
    /// Relative discharge error accepted as converged
    pub diff_tol: f64,
    /// Smallest resolvable flood depth (vertical resolution of the DEM)
    pub flood_min: f64,
    /// Iterations allowed below `flood_min` before the depth is pinned there
    pub iter_max: usize,
    /// Hard cap on solver iterations
    pub max_iterations: usize,
    /// Q100 used when the discharge raster reads 0 on the stream course
    pub fallback_discharge: f64,
    /// Bankfull width regression coefficient
    pub alpha: f64,
    /// Bankfull width regression exponent
    pub beta: f64,
    /// Inner exclusion buffer, in bankfull widths
    pub bf_mult: f64,
    /// Upper flood used to bound the break-in-slope search, in converged depths
    pub h_mult: f64,
    /// Fraction of the minimum curvature below which cells count as break-in-slope
    pub bis_cutoff_fraction: f64,
    pub bis_min_depth: f64,
    /// Setback from the valley block edge ignored by the edge width technique
    pub edge_setback: f64,
    /// Hillslope search distance beyond the valley bottom
    pub hill_buff_dist: f64,
    pub hs_thresh_low: f64,
    pub hs_thresh_up: f64,
    /// Share of gentle slopes needed for a Low hillslope
    pub hs_low_prop: f64,
    /// Share of steep slopes needed for a High hillslope
    pub hs_high_prop: f64,
    /// Debris runout length per coupled hillslope
    pub debris_runout: f64,
    pub coupling_threshold: f64,
    /// Largest valley/bankfull width ratio still counted as confined
    pub confined_ratio: f64,
    /// Width ratio below which two steep sides make a canyon rather than a gorge
    pub canyon_ratio: f64,
    pub glacial_min_width: f64,
    pub glacial_min_elev: f64,
    /// First segment id to process
    pub start_id: i64,
    /// Maximum number of segments to launch
    pub segment_limit: Option<usize>,
    /// Process segments concurrently
    pub parallel: bool,
    /// Recorded in the run log header
    pub analyst: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mannings_n: 0.03,
            q_tolerance_mult: 2.0,
            diff_tol: 0.1,
            flood_min: 0.5,
            iter_max: 4,
            max_iterations: 12,
            fallback_discharge: 20.0,
            alpha: 2.26,
            beta: 0.31,
            bf_mult: 1.0,
            h_mult: 2.0,
            bis_cutoff_fraction: 0.3,
            bis_min_depth: 1.0,
            edge_setback: 5.0,
            hill_buff_dist: 250.0,
            hs_thresh_low: 0.30,
            hs_thresh_up: 0.70,
            hs_low_prop: 0.75,
            hs_high_prop: 0.25,
            debris_runout: 15.0,
            coupling_threshold: 0.75,
            confined_ratio: 7.0,
            canyon_ratio: 3.0,
            glacial_min_width: 100.0,
            glacial_min_elev: 2500.0,
            start_id: 0,
            segment_limit: None,
            parallel: false,
            analyst: None,
        }
    }
}

fn invalid(name: &'static str, value: impl ToString, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl RunConfig {
    /// Read a JSON configuration file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, RunError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| RunError::Input {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reject parameter sets the solver or classifier cannot work with
    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("mannings_n", self.mannings_n),
            ("q_tolerance_mult", self.q_tolerance_mult),
            ("diff_tol", self.diff_tol),
            ("flood_min", self.flood_min),
            ("fallback_discharge", self.fallback_discharge),
            ("alpha", self.alpha),
            ("h_mult", self.h_mult),
            ("bis_min_depth", self.bis_min_depth),
            ("hill_buff_dist", self.hill_buff_dist),
            ("debris_runout", self.debris_runout),
            ("confined_ratio", self.confined_ratio),
            ("canyon_ratio", self.canyon_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, value, "must be a positive number"));
            }
        }

        let non_negative = [
            ("bf_mult", self.bf_mult),
            ("edge_setback", self.edge_setback),
            ("beta", self.beta),
            ("coupling_threshold", self.coupling_threshold),
            ("glacial_min_width", self.glacial_min_width),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(name, value, "must be zero or positive"));
            }
        }

        if !(self.bis_cutoff_fraction > 0.0 && self.bis_cutoff_fraction <= 1.0) {
            return Err(invalid(
                "bis_cutoff_fraction",
                self.bis_cutoff_fraction,
                "must lie in (0, 1]",
            ));
        }
        if !(self.hs_thresh_low >= 0.0 && self.hs_thresh_low < self.hs_thresh_up) {
            return Err(invalid(
                "hs_thresh_low",
                self.hs_thresh_low,
                "must be non-negative and below hs_thresh_up",
            ));
        }
        for (name, value) in [("hs_low_prop", self.hs_low_prop), ("hs_high_prop", self.hs_high_prop)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, value, "must be a proportion in [0, 1]"));
            }
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", self.max_iterations, "must be at least 1"));
        }
        if self.segment_limit == Some(0) {
            return Err(invalid("segment_limit", 0, "must be at least 1 when set"));
        }
        Ok(())
    }

    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            mannings_n: self.mannings_n,
            diff_tol: self.diff_tol,
            flood_min: self.flood_min,
            iter_max: self.iter_max,
            max_iterations: self.max_iterations,
            ..SolverParams::default()
        }
    }

    pub fn width_regression(&self) -> WidthRegression {
        WidthRegression {
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    pub fn boundary_params(&self) -> BoundaryParams {
        BoundaryParams {
            h_mult: self.h_mult,
            bf_mult: self.bf_mult,
            bis_cutoff_fraction: self.bis_cutoff_fraction,
            bis_min_depth: self.bis_min_depth,
            edge_setback: self.edge_setback,
        }
    }

    pub fn hillslope_params(&self) -> HillslopeParams {
        HillslopeParams {
            hill_buff_dist: self.hill_buff_dist,
            thresh_low: self.hs_thresh_low,
            thresh_up: self.hs_thresh_up,
            low_prop: self.hs_low_prop,
            high_prop: self.hs_high_prop,
        }
    }

    pub fn classify_params(&self) -> ClassifyParams {
        ClassifyParams {
            debris_runout: self.debris_runout,
            coupling_threshold: self.coupling_threshold,
            confined_ratio: self.confined_ratio,
            canyon_ratio: self.canyon_ratio,
            glacial_min_width: self.glacial_min_width,
            glacial_min_elev: self.glacial_min_elev,
        }
    }
}
