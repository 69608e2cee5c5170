//! Manning convergence solver
//!
//! Finds the flood depth whose inundated cross-section carries the target
//! discharge under Manning's equation. Each iteration floods the valley to
//! the current depth, reduces the flood to a mean cross-section
//! (area × depth − volume, over reach length) and relaxes the depth towards
//! the target with a damped, step-clamped update.

use crate::error::SegmentError;
use tracing::debug;

/// Area and volume of one flood, as measured on the terrain
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelCrossSection {
    /// Planimetric flooded area
    pub area_2d: f64,
    /// Wetted surface area
    pub area_3d: f64,
    /// Volume of ground standing above the channel inside the flood
    pub volume: f64,
}

/// Anything that can be flooded to a depth and measured
pub trait FloodSurface {
    fn cross_section(&self, depth: f64) -> Result<ChannelCrossSection, SegmentError>;
}

/// Reach properties the solver needs besides the terrain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReachHydraulics {
    pub length: f64,
    /// Reach-averaged gradient, already floored
    pub slope: f64,
    pub target_discharge: f64,
}

/// Convergence controls
#[derive(Debug, Clone, PartialEq)]
pub struct SolverParams {
    pub mannings_n: f64,
    pub diff_tol: f64,
    pub flood_min: f64,
    pub iter_max: usize,
    pub max_iterations: usize,
    /// Depth escalations tried when a flood holds no volume
    pub zero_volume_retries: usize,
    pub zero_volume_growth: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            mannings_n: 0.03,
            diff_tol: 0.1,
            flood_min: 0.5,
            iter_max: 4,
            max_iterations: 12,
            zero_volume_retries: 3,
            zero_volume_growth: 1.5,
        }
    }
}

/// Why the solver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative discharge error within tolerance
    Converged,
    /// Iteration cap reached; the best evaluation is reported
    IterationCap,
    /// Depth stayed below the resolvable floor too often; pinned at the floor
    DepthFloor,
    /// No flood volume even after escalation; pinned at the floor with Q = 0
    ZeroVolume,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::IterationCap => "iteration cap",
            Termination::DepthFloor => "depth floor",
            Termination::ZeroVolume => "zero volume",
        }
    }
}

/// Correction applied to a proposed depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    None,
    /// Step above 3x: square root taken
    Dampened,
    /// Step below 0.3x: squared
    Amplified,
}

/// One solver iteration, kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub depth: f64,
    pub q_calc: f64,
    pub q_diff: f64,
    pub divisor: f64,
    pub clamp: Clamp,
    pub next_depth: f64,
}

/// Final state of the solver for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct FloodSolution {
    /// Depth whose cross-section produced `q_calc`
    pub depth: f64,
    pub q_calc: f64,
    pub q_diff: f64,
    pub target: f64,
    pub slope: f64,
    pub xc_area: f64,
    pub wetted_perimeter: f64,
    pub hydraulic_radius: f64,
    pub top_width: f64,
    pub cross_section: ChannelCrossSection,
    pub iterations: usize,
    pub termination: Termination,
    pub trace: Vec<IterationRecord>,
}

/// Empirical first guess of flood depth from discharge
pub fn initial_depth(discharge: f64) -> f64 {
    0.208 * discharge.powf(0.428)
}

/// Relaxation divisor for 1-based iteration `n`: 2 up to the fifth
/// iteration, then growing by 1.4 per iteration.
pub fn divisor(n: usize) -> f64 {
    if n <= 5 {
        2.0
    } else {
        2.0 * 1.4f64.powi((n - 5) as i32)
    }
}

/// Limit a depth step to between 0.3x and 3x the previous depth.
///
/// Steps beyond the limits (strictly) are replaced by the square root
/// (overshoot) or the square (undershoot) of the proposal; if that still
/// falls outside the band it is bounded to the nearer limit.
pub fn clamp_step(previous: f64, proposed: f64) -> (f64, Clamp) {
    let ratio = proposed / previous;
    let (value, clamp) = if ratio > 3.0 {
        (proposed.sqrt(), Clamp::Dampened)
    } else if ratio < 0.3 {
        (proposed * proposed, Clamp::Amplified)
    } else {
        return (proposed, Clamp::None);
    };
    (value.clamp(0.3 * previous, 3.0 * previous), clamp)
}

/// Hydraulic reduction of one flood
#[derive(Debug, Clone, Copy)]
struct Evaluation {
    depth: f64,
    xs: ChannelCrossSection,
    xc_area: f64,
    wetted_perimeter: f64,
    hydraulic_radius: f64,
    top_width: f64,
    q_calc: f64,
    q_diff: f64,
}

/// Iterative depth solver
#[derive(Debug, Clone, Default)]
pub struct ManningSolver {
    params: SolverParams,
}

impl ManningSolver {
    pub fn new(params: SolverParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    fn evaluate(&self, depth: f64, xs: ChannelCrossSection, reach: &ReachHydraulics) -> Evaluation {
        let length = reach.length;
        let xc_area = ((xs.area_2d * depth - xs.volume) / length).max(0.0);
        let wetted_perimeter = xs.area_3d / length;
        let hydraulic_radius = if wetted_perimeter > 0.0 {
            xc_area / wetted_perimeter
        } else {
            0.0
        };
        let q_calc = hydraulic_radius.powf(2.0 / 3.0) * xc_area * reach.slope.sqrt()
            / self.params.mannings_n;
        let q_diff = (reach.target_discharge - q_calc).abs() / reach.target_discharge;
        Evaluation {
            depth,
            xs,
            xc_area,
            wetted_perimeter,
            hydraulic_radius,
            top_width: xs.area_2d / length,
            q_calc,
            q_diff,
        }
    }

    fn finish(
        &self,
        eval: Evaluation,
        reach: &ReachHydraulics,
        iterations: usize,
        termination: Termination,
        trace: Vec<IterationRecord>,
    ) -> FloodSolution {
        debug!(
            depth = eval.depth,
            q_calc = eval.q_calc,
            q_diff = eval.q_diff,
            iterations,
            termination = termination.as_str(),
            "solver finished"
        );
        FloodSolution {
            depth: eval.depth,
            q_calc: eval.q_calc,
            q_diff: eval.q_diff,
            target: reach.target_discharge,
            slope: reach.slope,
            xc_area: eval.xc_area,
            wetted_perimeter: eval.wetted_perimeter,
            hydraulic_radius: eval.hydraulic_radius,
            top_width: eval.top_width,
            cross_section: eval.xs,
            iterations,
            termination,
            trace,
        }
    }

    /// Converge the flood depth for one reach.
    ///
    /// Returns the converged solution, or the best available one when the
    /// iteration cap, the depth floor or the zero-volume guard ends the
    /// search. Non-finite arithmetic is a `SegmentError::Numerical`.
    pub fn solve<S: FloodSurface>(
        &self,
        surface: &S,
        reach: &ReachHydraulics,
    ) -> Result<FloodSolution, SegmentError> {
        let p = &self.params;
        for (name, v) in [
            ("reach length", reach.length),
            ("target discharge", reach.target_discharge),
            ("reach slope", reach.slope),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SegmentError::Numerical(format!("{name} must be positive, got {v}")));
            }
        }

        let mut depth = initial_depth(reach.target_discharge);
        let mut below_floor = 0usize;
        let mut best: Option<Evaluation> = None;
        let mut trace = Vec::new();
        let mut n = 0usize;

        loop {
            let mut xs = surface.cross_section(depth)?;
            let mut retries = 0;
            while xs.volume <= 0.0 && retries < p.zero_volume_retries {
                depth *= p.zero_volume_growth;
                retries += 1;
                debug!(depth, retries, "empty flood, raising depth");
                xs = surface.cross_section(depth)?;
            }
            if xs.volume <= 0.0 {
                let xs = surface.cross_section(p.flood_min)?;
                let mut eval = self.evaluate(p.flood_min, xs, reach);
                eval.q_calc = 0.0;
                eval.q_diff = 1.0;
                return Ok(self.finish(eval, reach, n, Termination::ZeroVolume, trace));
            }

            n += 1;
            let eval = self.evaluate(depth, xs, reach);
            if !eval.q_calc.is_finite() {
                return Err(SegmentError::Numerical(format!(
                    "discharge is not finite at depth {depth:.3}"
                )));
            }
            if best.map_or(true, |b| eval.q_diff < b.q_diff) {
                best = Some(eval);
            }

            if eval.q_diff <= p.diff_tol {
                return Ok(self.finish(eval, reach, n, Termination::Converged, trace));
            }
            if n >= p.max_iterations {
                let best = best.unwrap_or(eval);
                return Ok(self.finish(best, reach, n, Termination::IterationCap, trace));
            }
            if eval.q_calc <= 0.0 {
                return Err(SegmentError::Numerical(format!(
                    "no conveyance at depth {depth:.3}: cross-sectional area is zero"
                )));
            }

            let div = divisor(n);
            let proposed =
                depth * (1.0 - (eval.q_calc - reach.target_discharge) / eval.q_calc / div);
            let (next, clamp) = clamp_step(depth, proposed);
            if !(next.is_finite() && next > 0.0) {
                return Err(SegmentError::Numerical(format!(
                    "depth update diverged from {depth:.3} to {next}"
                )));
            }
            trace.push(IterationRecord {
                iteration: n,
                depth,
                q_calc: eval.q_calc,
                q_diff: eval.q_diff,
                divisor: div,
                clamp,
                next_depth: next,
            });
            depth = next;

            if depth < p.flood_min {
                below_floor += 1;
                if below_floor > p.iter_max {
                    let xs = surface.cross_section(p.flood_min)?;
                    let eval = self.evaluate(p.flood_min, xs, reach);
                    return Ok(self.finish(eval, reach, n, Termination::DepthFloor, trace));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;

    /// Trapezoidal channel with a flat bed and constant side slopes
    struct Trapezoid {
        length: f64,
        bed: f64,
        side: f64,
    }

    impl FloodSurface for Trapezoid {
        fn cross_section(&self, depth: f64) -> Result<ChannelCrossSection, SegmentError> {
            let run = depth / self.side;
            Ok(ChannelCrossSection {
                area_2d: self.length * (self.bed + 2.0 * run),
                area_3d: self.length * (self.bed + 2.0 * run * (1.0 + self.side * self.side).sqrt()),
                volume: self.length * depth * run,
            })
        }
    }

    fn channel() -> Trapezoid {
        Trapezoid {
            length: 100.0,
            bed: 5.0,
            side: 0.2,
        }
    }

    fn reach(target: f64) -> ReachHydraulics {
        ReachHydraulics {
            length: 100.0,
            slope: 0.01,
            target_discharge: target,
        }
    }

    fn discharge_at(depth: f64) -> f64 {
        let solver = ManningSolver::default();
        let xs = channel().cross_section(depth).unwrap();
        solver.evaluate(depth, xs, &reach(1.0)).q_calc
    }

    /// Returns an empty flood below `threshold`, recording every request
    struct Shallow {
        threshold: f64,
        requests: RefCell<Vec<f64>>,
    }

    impl FloodSurface for Shallow {
        fn cross_section(&self, depth: f64) -> Result<ChannelCrossSection, SegmentError> {
            self.requests.borrow_mut().push(depth);
            if depth < self.threshold {
                Ok(ChannelCrossSection {
                    area_2d: 100.0,
                    area_3d: 100.0,
                    volume: 0.0,
                })
            } else {
                channel().cross_section(depth)
            }
        }
    }

    #[test]
    fn test_cross_section_reduction() {
        let solver = ManningSolver::default();
        let xs = channel().cross_section(1.0).unwrap();
        let e = solver.evaluate(1.0, xs, &reach(1.0));
        // bed 5 + two 5 m banks: A = 15 - 5 = 10 m²
        assert_relative_eq!(e.xc_area, 10.0, epsilon = 1e-9);
        assert_relative_eq!(e.top_width, 15.0, epsilon = 1e-9);
        assert_relative_eq!(e.wetted_perimeter, 5.0 + 10.0 * 1.04f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_converges_to_known_depth() {
        let target = discharge_at(1.6);
        let sol = ManningSolver::default().solve(&channel(), &reach(target)).unwrap();

        assert_eq!(sol.termination, Termination::Converged);
        assert!(sol.q_diff <= 0.1);
        assert!(sol.q_calc > 0.0);
        assert!((sol.depth - 1.6).abs() < 0.25, "depth {}", sol.depth);
        assert_relative_eq!(sol.target, target);
    }

    #[test]
    fn test_tight_tolerance_hits_iteration_cap() {
        let solver = ManningSolver::new(SolverParams {
            diff_tol: 0.0,
            ..SolverParams::default()
        });
        let sol = solver.solve(&channel(), &reach(discharge_at(2.0))).unwrap();

        if sol.termination == Termination::IterationCap {
            assert_eq!(sol.iterations, 12);
            assert_eq!(sol.trace.len(), 11);
            let min_trace = sol.trace.iter().map(|t| t.q_diff).fold(f64::INFINITY, f64::min);
            assert!(sol.q_diff <= min_trace + 1e-12);
        } else {
            assert_eq!(sol.termination, Termination::Converged);
            assert_eq!(sol.q_diff, 0.0);
        }
    }

    #[test]
    fn test_trace_properties() {
        // nothing short of an exact hit stops before the cap
        let solver = ManningSolver::new(SolverParams {
            diff_tol: 0.0,
            ..SolverParams::default()
        });
        let sol = solver.solve(&channel(), &reach(discharge_at(6.0) * 3.0)).unwrap();
        assert_eq!(sol.termination, Termination::IterationCap);
        assert_eq!(sol.trace.len(), 11);

        for pair in sol.trace.windows(2) {
            assert!(pair[1].divisor >= pair[0].divisor);
        }
        assert!(sol.trace[..5].iter().all(|t| t.divisor == 2.0));
        for pair in sol.trace[4..].windows(2) {
            assert!(pair[1].divisor > pair[0].divisor);
        }
        for t in &sol.trace {
            let ratio = t.next_depth / t.depth;
            assert!((0.3..=3.0).contains(&ratio), "step ratio {ratio}");
            assert!(t.q_calc >= 0.0);
        }
    }

    #[test]
    fn test_divisor_schedule() {
        assert_eq!(divisor(1), 2.0);
        assert_eq!(divisor(5), 2.0);
        assert_relative_eq!(divisor(6), 2.8);
        assert_relative_eq!(divisor(7), 3.92);
    }

    #[test]
    fn test_clamp_boundaries() {
        assert_eq!(clamp_step(1.0, 3.0), (3.0, Clamp::None));
        assert_eq!(clamp_step(1.0, 0.3), (0.3, Clamp::None));

        let (d, c) = clamp_step(4.0, 16.0);
        assert_eq!(c, Clamp::Dampened);
        assert_relative_eq!(d, 4.0);

        // sub-unit depths grow under the square root: sqrt(1.0) stays 5x, bounded to 0.6
        let (d, c) = clamp_step(0.2, 1.0);
        assert_eq!(c, Clamp::Dampened);
        assert_relative_eq!(d, 0.6);

        // sqrt(16) = 4 from 1.0 -> bounded to 3.0
        let (d, c) = clamp_step(1.0, 16.0);
        assert_eq!(c, Clamp::Dampened);
        assert_relative_eq!(d, 3.0);

        let (d, c) = clamp_step(2.0, 0.5);
        assert_eq!(c, Clamp::Amplified);
        assert_relative_eq!(d, 0.6);
    }

    #[test]
    fn test_zero_volume_escalation_then_floor() {
        let surface = Shallow {
            threshold: f64::INFINITY,
            requests: RefCell::new(Vec::new()),
        };
        let target = 20.0;
        let sol = ManningSolver::default().solve(&surface, &reach(target)).unwrap();

        let d0 = initial_depth(target);
        let requests = surface.requests.borrow();
        assert_eq!(requests.len(), 5);
        assert_relative_eq!(requests[1], d0 * 1.5, epsilon = 1e-12);
        assert_relative_eq!(requests[3], d0 * 3.375, epsilon = 1e-12);
        assert_relative_eq!(requests[4], 0.5);

        assert_eq!(sol.termination, Termination::ZeroVolume);
        assert_eq!(sol.q_calc, 0.0);
        assert_eq!(sol.depth, 0.5);
    }

    #[test]
    fn test_escalation_recovers() {
        let d0 = initial_depth(discharge_at(1.0));
        let surface = Shallow {
            threshold: d0 * 1.4,
            requests: RefCell::new(Vec::new()),
        };
        let sol = ManningSolver::default()
            .solve(&surface, &reach(discharge_at(1.0)))
            .unwrap();
        assert_ne!(sol.termination, Termination::ZeroVolume);
        assert_relative_eq!(surface.requests.borrow()[1], d0 * 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_tiny_target_pins_depth_floor() {
        let solver = ManningSolver::new(SolverParams {
            iter_max: 0,
            ..SolverParams::default()
        });
        let sol = solver.solve(&channel(), &reach(0.01)).unwrap();
        assert_eq!(sol.termination, Termination::DepthFloor);
        assert_eq!(sol.depth, 0.5);
        assert!(sol.q_calc > 0.0);
    }

    #[test]
    fn test_invalid_reach_is_numerical_error() {
        let err = ManningSolver::default()
            .solve(&channel(), &reach(0.0))
            .unwrap_err();
        assert!(matches!(err, SegmentError::Numerical(_)));
    }
}
