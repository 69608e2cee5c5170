//! HGVC CLI - valley bottom delineation and valley type classification

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hgvc_core::io::read_geotiff;
use hgvc_core::Raster;
use hgvc_valley::prelude::*;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hgvc")]
#[command(author, version, about = "Valley bottom delineation and valley type classification", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every selected segment and write the output layers
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        overrides: ConfigArgs,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Run the flood solver for one segment and print its convergence trace
    Solve {
        #[command(flatten)]
        inputs: InputArgs,
        /// Segment id
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        overrides: ConfigArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Filled DEM (GeoTIFF)
    #[arg(long)]
    dem: PathBuf,
    /// Upstream drainage area (GeoTIFF, DEM grid)
    #[arg(long)]
    drainage_area: PathBuf,
    /// Q100 discharge (GeoTIFF, DEM grid)
    #[arg(long)]
    discharge: PathBuf,
    /// Valley blocks labelled by segment id (GeoTIFF, DEM grid)
    #[arg(long)]
    blocks: PathBuf,
    /// Segment registry (JSON)
    #[arg(long)]
    segments: PathBuf,
}

impl InputArgs {
    fn paths(&self) -> InputPaths {
        InputPaths {
            dem: self.dem.clone(),
            drainage_area: self.drainage_area.clone(),
            discharge: self.discharge.clone(),
            blocks: self.blocks.clone(),
        }
    }

    fn describe(&self) -> [(&'static str, &Path); 5] {
        [
            ("dem", self.dem.as_path()),
            ("drainage_area", self.drainage_area.as_path()),
            ("discharge", self.discharge.as_path()),
            ("blocks", self.blocks.as_path()),
            ("segments", self.segments.as_path()),
        ]
    }
}

#[derive(Args)]
struct ConfigArgs {
    /// Configuration file (JSON); flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Manning's roughness coefficient
    #[arg(long)]
    mannings_n: Option<f64>,
    /// Multiplier applied to the Q100 reading
    #[arg(long)]
    q_tolerance: Option<f64>,
    /// Relative discharge tolerance for convergence
    #[arg(long)]
    diff_tol: Option<f64>,
    /// Smallest resolvable flood depth
    #[arg(long)]
    flood_min: Option<f64>,
    /// Bankfull width regression coefficient
    #[arg(long)]
    alpha: Option<f64>,
    /// Bankfull width regression exponent
    #[arg(long)]
    beta: Option<f64>,
    /// Hillslope buffer distance
    #[arg(long)]
    hill_buff_dist: Option<f64>,
    /// Decimal slope at or below which hillslope cells are low
    #[arg(long)]
    hs_thresh_low: Option<f64>,
    /// Decimal slope above which hillslope cells are high
    #[arg(long)]
    hs_thresh_up: Option<f64>,
    /// Debris runout length
    #[arg(long)]
    debris_runout: Option<f64>,
    /// Elevation above which wide valleys are glacially influenced
    #[arg(long)]
    glacial_elev: Option<f64>,
    /// Stop after this many segments
    #[arg(long)]
    segment_limit: Option<usize>,
    /// First segment id to process
    #[arg(long)]
    start_id: Option<i64>,
    /// Process segments in parallel
    #[arg(long)]
    parallel: bool,
    /// Name recorded in the run log
    #[arg(long)]
    analyst: Option<String>,
}

impl ConfigArgs {
    fn load(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => RunConfig::default(),
        };

        let set = |field: &mut f64, value: Option<f64>| {
            if let Some(v) = value {
                *field = v;
            }
        };
        set(&mut config.mannings_n, self.mannings_n);
        set(&mut config.q_tolerance_mult, self.q_tolerance);
        set(&mut config.diff_tol, self.diff_tol);
        set(&mut config.flood_min, self.flood_min);
        set(&mut config.alpha, self.alpha);
        set(&mut config.beta, self.beta);
        set(&mut config.hill_buff_dist, self.hill_buff_dist);
        set(&mut config.hs_thresh_low, self.hs_thresh_low);
        set(&mut config.hs_thresh_up, self.hs_thresh_up);
        set(&mut config.debris_runout, self.debris_runout);
        set(&mut config.glacial_min_elev, self.glacial_elev);
        if self.segment_limit.is_some() {
            config.segment_limit = self.segment_limit;
        }
        if let Some(id) = self.start_id {
            config.start_id = id;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.analyst.is_some() {
            config.analyst = self.analyst.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{elapsed_precise} [{bar:40.cyan/blue}] {pos}/{len} segments {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

fn load(inputs: &InputArgs, config: RunConfig) -> Result<(RunContext, SegmentRegistry)> {
    let pb = spinner("Reading inputs...");
    let registry = SegmentRegistry::load(&inputs.segments).context("Failed to read segments")?;
    let rasters = RunInputs::load(&inputs.paths()).context("Failed to read input rasters")?;
    pb.set_message("Deriving slope and bankfull width...");
    let ctx = RunContext::new(config, rasters).context("Failed to prepare run")?;
    pb.finish_and_clear();
    info!(
        "Input: {} x {}, {} segments",
        ctx.inputs.dem.cols(),
        ctx.inputs.dem.rows(),
        registry.len()
    );
    Ok((ctx, registry))
}

fn print_info(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(input).context("Failed to read raster")?;
    pb.finish_and_clear();

    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
    Ok(())
}

fn print_trace(id: i64, terrain: &SegmentTerrain, solution: &FloodSolution) {
    println!("Segment {id}");
    println!("  Length: {:.1}", terrain.length);
    println!("  Gradient: {:.5}", terrain.reach_slope);
    println!(
        "  Q100: {:.3}{}  target: {:.3}",
        terrain.q100,
        if terrain.discharge_fallback { " (fallback)" } else { "" },
        terrain.target_discharge
    );
    println!();
    println!("  iter     depth      q_calc    q_diff  divisor  clamp      next");
    for r in &solution.trace {
        println!(
            "  {:>4} {:>9.4} {:>11.4} {:>9.4} {:>8.3}  {:<9} {:>8.4}",
            r.iteration,
            r.depth,
            r.q_calc,
            r.q_diff,
            r.divisor,
            format!("{:?}", r.clamp),
            r.next_depth
        );
    }
    println!();
    println!(
        "  {} after {} iterations",
        solution.termination.as_str(),
        solution.iterations
    );
    println!(
        "  depth {:.4}  q_calc {:.4}  q_diff {:.4}",
        solution.depth, solution.q_calc, solution.q_diff
    );
    println!(
        "  area {:.3}  radius {:.4}  top width {:.3}",
        solution.xc_area, solution.hydraulic_radius, solution.top_width
    );
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => print_info(&input)?,

        Commands::Run {
            inputs,
            out,
            overrides,
        } => {
            let config = overrides.load()?;
            let log = RunLog::new(&config, &inputs.describe());
            let (ctx, registry) = load(&inputs, config)?;

            let selected = registry
                .select(ctx.config.start_id, ctx.config.segment_limit)
                .len();
            let pb = progress_bar(selected);
            let start = Instant::now();
            let summary = execute(&ctx, &registry, &out, log, |outcome| {
                pb.set_message(format!("id {}", outcome.id()));
                pb.inc(1);
            })
            .context("Run failed")?;
            pb.finish_and_clear();

            println!(
                "{} segments: {} complete, {} failed",
                summary.outcomes.len(),
                summary.completed,
                summary.failed
            );
            for file in &summary.files {
                println!("  {}", file.display());
            }
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Solve {
            inputs,
            id,
            overrides,
        } => {
            let config = overrides.load()?;
            let (ctx, registry) = load(&inputs, config)?;
            let Some(record) = registry.get(id) else {
                bail!("Segment {id} is not in {}", inputs.segments.display());
            };

            let terrain = ctx
                .terrain(record)
                .with_context(|| format!("Segment {id} cannot be prepared"))?;
            let solver = ManningSolver::new(ctx.config.solver_params());
            let solution = solver
                .solve(&terrain, &terrain.hydraulics())
                .with_context(|| format!("Solver failed for segment {id}"))?;
            print_trace(id, &terrain, &solution);
        }
    }

    Ok(())
}
