//! # HGVC Valley
//!
//! Stream-segment valley bottom delineation and valley type classification.
//!
//! For every segment of a stream network the crate converges a Q100 flood
//! depth under Manning's equation, derives the hydrologic, geomorphic
//! (break-in-slope) and hydro-geomorphic valley bottoms, grades the steepness
//! of both banks and assigns a valley type.
//!
//! - **registry**: segment records read from preprocessing
//! - **context**: shared run inputs and per-segment terrain windows
//! - **solver**: Manning convergence solver
//! - **boundaries**: valley bottom delineation and widths
//! - **hillslope**: bank steepness
//! - **classify**: valley type decision table
//! - **batch**, **runlog**, **output**: run orchestration and results

pub mod batch;
pub mod boundaries;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod hillslope;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod runlog;
pub mod solver;

pub use error::{RunError, SegmentError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{execute, run_batch, RunSummary, SegmentOutcome};
    pub use crate::boundaries::{Boundary, BoundaryParams, ValleyBoundaries, WidthMethod};
    pub use crate::classify::{classify, Classification, ClassifyInputs, ClassifyParams, ValleyType};
    pub use crate::config::RunConfig;
    pub use crate::context::{InputPaths, RunContext, RunInputs, SegmentTerrain};
    pub use crate::error::{RunError, SegmentError};
    pub use crate::hillslope::{HillslopeParams, HillslopeSide, Hillslopes, Side, Steepness};
    pub use crate::output::OutputLayers;
    pub use crate::pipeline::{process_segment, SegmentResult};
    pub use crate::registry::{SegmentRecord, SegmentRegistry};
    pub use crate::runlog::RunLog;
    pub use crate::solver::{
        FloodSolution, FloodSurface, ManningSolver, SolverParams, Termination,
    };
}
