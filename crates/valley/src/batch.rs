//! Batch runner
//!
//! Segments are independent given the shared read-only context, so the batch
//! may run them on the rayon pool. A failing segment is recorded and the
//! batch carries on; outcomes always come back in registry order.

use crate::context::RunContext;
use crate::error::{RunError, SegmentError};
use crate::output::OutputLayers;
use crate::pipeline::{process_segment, SegmentResult};
use crate::registry::{SegmentRecord, SegmentRegistry};
use crate::runlog::RunLog;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// File name of the run log in the output directory
pub const RUN_LOG_FILE: &str = "run.log";

#[derive(Debug)]
pub enum SegmentOutcome {
    Complete(Box<SegmentResult>),
    Failed {
        sequence: usize,
        id: i64,
        error: SegmentError,
    },
}

impl SegmentOutcome {
    pub fn sequence(&self) -> usize {
        match self {
            SegmentOutcome::Complete(r) => r.sequence,
            SegmentOutcome::Failed { sequence, .. } => *sequence,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            SegmentOutcome::Complete(r) => r.id,
            SegmentOutcome::Failed { id, .. } => *id,
        }
    }

    pub fn result(&self) -> Option<&SegmentResult> {
        match self {
            SegmentOutcome::Complete(r) => Some(&**r),
            SegmentOutcome::Failed { .. } => None,
        }
    }
}

fn run_one(ctx: &RunContext, record: &SegmentRecord) -> SegmentOutcome {
    match process_segment(ctx, record) {
        Ok(result) => {
            info!(
                segment = record.id,
                class = result.classification.valley_type.abbreviation(),
                "segment complete"
            );
            SegmentOutcome::Complete(Box::new(result))
        }
        Err(e) => {
            error!(segment = record.id, error = %e, "segment failed");
            SegmentOutcome::Failed {
                sequence: record.sequence,
                id: record.id,
                error: e,
            }
        }
    }
}

/// Process the selected segments of the registry.
///
/// Selection honours `start_id` and `segment_limit` from the configuration.
/// `progress` is called once per finished segment, from worker threads when
/// the run is parallel.
pub fn run_batch<F>(ctx: &RunContext, registry: &SegmentRegistry, progress: F) -> Vec<SegmentOutcome>
where
    F: Fn(&SegmentOutcome) + Sync,
{
    let selected = registry.select(ctx.config.start_id, ctx.config.segment_limit);
    info!(
        selected = selected.len(),
        total = registry.len(),
        parallel = ctx.config.parallel,
        "processing segments"
    );

    let finish = |record: &SegmentRecord| {
        let outcome = run_one(ctx, record);
        progress(&outcome);
        outcome
    };

    let mut outcomes: Vec<SegmentOutcome> = if ctx.config.parallel {
        selected.par_iter().map(finish).collect()
    } else {
        selected.iter().map(finish).collect()
    };
    outcomes.sort_by_key(SegmentOutcome::sequence);
    outcomes
}

/// What a finished run produced
#[derive(Debug)]
pub struct RunSummary {
    pub outcomes: Vec<SegmentOutcome>,
    pub completed: usize,
    pub failed: usize,
    pub files: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Run the batch and write the layers and run log into `out_dir`
pub fn execute<F>(
    ctx: &RunContext,
    registry: &SegmentRegistry,
    out_dir: &Path,
    mut log: RunLog,
    progress: F,
) -> Result<RunSummary, RunError>
where
    F: Fn(&SegmentOutcome) + Sync,
{
    std::fs::create_dir_all(out_dir)?;

    let outcomes = run_batch(ctx, registry, progress);
    for outcome in &outcomes {
        log.record(outcome);
    }

    let layers = OutputLayers::from_results(outcomes.iter().filter_map(SegmentOutcome::result));
    let mut files = layers.write(out_dir)?;
    log.note("");
    for file in &files {
        log.note(&format!("Wrote {}", file.display()));
    }

    let log_path = out_dir.join(RUN_LOG_FILE);
    log.save(&log_path)?;
    files.push(log_path);

    info!(
        completed = log.completed(),
        failed = log.failed(),
        elapsed_s = log.elapsed().as_secs_f64(),
        "run finished"
    );

    Ok(RunSummary {
        completed: log.completed(),
        failed: log.failed(),
        elapsed: log.elapsed(),
        outcomes,
        files,
    })
}
