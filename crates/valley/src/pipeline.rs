//! Per-segment processing: solver, boundaries, hillslopes, classification

use crate::boundaries::{build_boundaries, ValleyBoundaries};
use crate::classify::{classify, Classification, ClassifyInputs};
use crate::context::RunContext;
use crate::error::SegmentError;
use crate::hillslope::{classify_hillslopes, hillslope_zone, Hillslopes};
use crate::registry::SegmentRecord;
use crate::solver::{FloodSolution, ManningSolver, Termination};
use tracing::{debug, warn};

/// Everything derived for one segment
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub sequence: usize,
    pub id: i64,
    pub slope_class: i64,
    pub length: f64,
    pub bankfull_width: f64,
    /// Reach-averaged gradient
    pub gradient: f64,
    pub min_elev: f64,
    pub q100: f64,
    pub target_discharge: f64,
    pub solution: FloodSolution,
    pub boundaries: ValleyBoundaries,
    pub hillslopes: Hillslopes,
    pub classification: Classification,
    /// Recovered conditions worth recording in the run log
    pub notices: Vec<String>,
}

/// Solve, delineate and classify one segment
pub fn process_segment(
    ctx: &RunContext,
    record: &SegmentRecord,
) -> Result<SegmentResult, SegmentError> {
    let config = &ctx.config;
    let mut notices = Vec::new();

    let terrain = ctx.terrain(record)?;
    if terrain.discharge_fallback {
        notices.push(format!(
            "Q100 reads zero on the stream; using {} before tolerance",
            config.fallback_discharge
        ));
    }

    let solver = ManningSolver::new(config.solver_params());
    let solution = solver.solve(&terrain, &terrain.hydraulics())?;
    if solution.termination != Termination::Converged {
        warn!(
            segment = record.id,
            termination = solution.termination.as_str(),
            q_diff = solution.q_diff,
            "solver did not converge"
        );
        notices.push(format!(
            "solver stopped on {} after {} iterations at depth {:.2} (q_diff {:.3})",
            solution.termination.as_str(),
            solution.iterations,
            solution.depth,
            solution.q_diff
        ));
    }

    let boundaries = build_boundaries(&terrain, &solution, &config.boundary_params(), &mut notices)?;

    let hillslope_params = config.hillslope_params();
    let zone = hillslope_zone(
        &boundaries.hydro_geomorphic.mask,
        &terrain.block,
        &terrain.course,
        &hillslope_params,
    )?;
    let hillslopes = classify_hillslopes(&terrain.slope, &zone, &hillslope_params)?;
    if hillslopes.right.is_none() {
        notices.push("no hillslopes present".into());
    }

    let classification = classify(
        &ClassifyInputs {
            slope_class: record.slope_class,
            valley_width: boundaries.hydro_geomorphic.width,
            bankfull_width: terrain.bankfull_width,
            min_elev: terrain.min_elev,
            right: hillslopes.right_category(),
            left: hillslopes.left_category(),
        },
        &config.classify_params(),
    );
    debug!(
        segment = record.id,
        class = classification.valley_type.abbreviation(),
        width_ratio = classification.width_ratio,
        coupling = classification.coupling,
        "segment classified"
    );

    Ok(SegmentResult {
        sequence: record.sequence,
        id: record.id,
        slope_class: record.slope_class,
        length: terrain.length,
        bankfull_width: terrain.bankfull_width,
        gradient: terrain.reach_slope,
        min_elev: terrain.min_elev,
        q100: terrain.q100,
        target_discharge: terrain.target_discharge,
        solution,
        boundaries,
        hillslopes,
        classification,
        notices,
    })
}
