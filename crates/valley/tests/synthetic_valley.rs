//! End-to-end tests on a synthetic U-shaped valley.
//!
//! The valley is 60×60 cells of 10 m, draining south along column 30 at a
//! gradient of 0.01. A 90 m wide floor rising 0.2 m per cell is flanked by
//! walls at a slope of 0.6. One valley block (id 1) covers the whole grid.
//!
//! Flood heights above the channel are therefore the same on every row:
//! about 0.16, 0.39 and 0.61 m on the floor, 2.27 m at the wall toe. The only
//! concave cells off the channel are the toe cells, four cells out.

use hgvc_core::io::write_geotiff;
use hgvc_core::{GeoTransform, Raster};
use approx::assert_relative_eq;
use hgvc_valley::prelude::*;
use std::path::Path;

const SIZE: usize = 60;
const MID: usize = 30;

fn transform() -> GeoTransform {
    GeoTransform::new(0.0, SIZE as f64 * 10.0, 10.0, -10.0)
}

fn grid<T: hgvc_core::RasterElement>(fill: T) -> Raster<T> {
    let mut r = Raster::filled(SIZE, SIZE, fill);
    r.set_transform(transform());
    r
}

fn valley_dem() -> Raster<f64> {
    let mut dem = grid(0.0);
    for row in 0..SIZE {
        for col in 0..SIZE {
            let d = (col as f64 - MID as f64).abs();
            let across = if d <= 4.0 { 0.2 * d } else { 0.8 + 6.0 * (d - 4.0) };
            let along = 0.1 * (SIZE - 1 - row) as f64;
            dem.set(row, col, 1000.0 + along + across).unwrap();
        }
    }
    dem
}

fn inputs(discharge: f64) -> RunInputs {
    RunInputs {
        dem: valley_dem(),
        drainage_area: grid(50.0),
        discharge: grid(discharge),
        blocks: grid(1i32),
    }
}

const REGISTRY: &str = r#"{ "segments": [
    { "id": 1, "length": 590.0, "slope_class": 2, "course": [[305.0, 595.0], [305.0, 5.0]] },
    { "id": 2, "slope_class": 3, "course": [[305.0, 595.0], [305.0, 5.0]] },
    { "id": 3, "length": 100.0, "slope_class": 1, "course": [[305.0, 595.0], [305.0, 5.0]] }
] }"#;

/// Same valley, cut into block 1 (rows 0..40) and block 2 (rows 40..60)
fn split_inputs() -> RunInputs {
    let mut blocks = grid(1i32);
    for row in 40..SIZE {
        for col in 0..SIZE {
            blocks.set(row, col, 2).unwrap();
        }
    }
    RunInputs {
        blocks,
        ..inputs(30.0)
    }
}

const SPLIT_REGISTRY: &str = r#"{ "segments": [
    { "id": 1, "length": 390.0, "slope_class": 2, "course": [[305.0, 595.0], [305.0, 205.0]] },
    { "id": 2, "length": 190.0, "slope_class": 2, "course": [[305.0, 195.0], [305.0, 5.0]] }
] }"#;

fn registry() -> SegmentRegistry {
    SegmentRegistry::from_json_str(REGISTRY).expect("registry parses")
}

fn context(config: RunConfig, discharge: f64) -> RunContext {
    RunContext::new(config, inputs(discharge)).expect("context builds")
}

// ---------------------------------------------------------------------------
// Single segment
// ---------------------------------------------------------------------------

#[test]
fn segment_is_solved_delineated_and_classified() {
    let ctx = context(RunConfig::default(), 30.0);
    let record = registry().get(1).cloned().unwrap();
    let result = process_segment(&ctx, &record).expect("segment processes");

    assert!((result.gradient - 0.01).abs() < 1e-9);
    assert!((result.target_discharge - 60.0).abs() < 1e-9);
    assert!(result.bankfull_width > 0.0);

    let s = &result.solution;
    assert!(s.q_calc >= 0.0);
    assert!(s.depth > 0.0);
    assert!(
        s.termination != Termination::Converged || s.q_diff <= 0.1,
        "converged solution must be within tolerance"
    );

    // the Q100 flood and its double stay on the planar floor
    let b = &result.boundaries;
    assert_eq!(b.curvature_cutoff, None);
    assert_eq!(b.bis_cells, 0);
    assert_eq!(b.bis_depth, 1.0);
    assert!(result.notices.iter().any(|n| n.contains("no break in slope")));

    for ((r, c), &hg) in b.hydro_geomorphic.mask.data().indexed_iter() {
        if hg != 0 {
            assert_ne!(b.hydrologic.mask.get(r, c).unwrap(), 0, "HG cell ({r},{c}) outside Q100");
            assert_ne!(b.geomorphic.mask.get(r, c).unwrap(), 0, "HG cell ({r},{c}) outside BiS");
        }
    }
    assert!(b.hydro_geomorphic.area <= b.hydrologic.area);
    assert!(b.bis_depth >= 1.0);
    for boundary in [&b.hydrologic, &b.geomorphic, &b.hydro_geomorphic] {
        assert!(!boundary.polygon.0.is_empty());
        // seven floor cells: edge cells 30 m out, plus half a cell, doubled
        assert_eq!(boundary.width_method, WidthMethod::Edge);
        assert_relative_eq!(boundary.width, 70.0, epsilon = 1e-9);
    }
    assert_eq!(b.hydro_geomorphic.mask.data(), b.hydrologic.mask.data());

    // the stream splits the hillslope ring into two banks
    let right = result.hillslopes.right.as_ref().expect("right bank");
    let left = result.hillslopes.left.as_ref().expect("left bank");
    for side in [right, left] {
        let total: f64 = side.proportions.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
    assert!(right.area >= left.area);
    assert_eq!(right.steepness, Steepness::Moderate);
    assert_eq!(left.steepness, Steepness::Moderate);

    // 70 m over 2.26 * 50^0.31 = 7.6 m of bankfull channel
    let c = &result.classification;
    assert_relative_eq!(c.width_ratio, 70.0 / (2.26 * 50f64.powf(0.31)), epsilon = 1e-9);
    assert_eq!(c.valley_type, ValleyType::MediumEnergyOpen);
}

#[test]
fn wall_toe_is_the_break_in_slope() {
    let config = RunConfig {
        h_mult: 4.0,
        ..RunConfig::default()
    };
    let ctx = context(config, 30.0);
    let record = registry().get(1).cloned().unwrap();
    let result = process_segment(&ctx, &record).expect("segment processes");
    let b = &result.boundaries;

    // toe curvature -(0.6 - 2 * 0.8 + 6.8) / 2 / 100 on every row, both walls
    let cutoff = b.curvature_cutoff.expect("concave candidates");
    assert_relative_eq!(cutoff, -0.029 * 0.3, epsilon = 1e-9);
    assert_eq!(b.bis_cells, 2 * SIZE);
    assert_relative_eq!(b.bis_depth, 2.2716, epsilon = 1e-3);
    assert!(!result.notices.iter().any(|n| n.contains("no break in slope")));

    for ((r, c), &hg) in b.hydro_geomorphic.mask.data().indexed_iter() {
        let d = (c as i64 - MID as i64).abs();
        assert_eq!(hg != 0, d <= 3, "HG cell ({r},{c})");
    }
}

#[test]
fn block_edge_across_the_floor_is_not_a_break_in_slope() {
    let ctx = RunContext::new(RunConfig::default(), split_inputs()).expect("context builds");
    let reg = SegmentRegistry::from_json_str(SPLIT_REGISTRY).unwrap();

    for id in [1, 2] {
        let result = process_segment(&ctx, reg.get(id).unwrap()).expect("segment processes");
        let b = &result.boundaries;
        assert_eq!(b.curvature_cutoff, None, "segment {id}");
        assert_eq!(b.bis_cells, 0, "segment {id}");
        assert_eq!(b.bis_depth, 1.0, "segment {id}");
        assert_relative_eq!(result.gradient, 0.01, epsilon = 1e-9);
        assert_eq!(result.classification.valley_type, ValleyType::MediumEnergyOpen);
    }
}

#[test]
fn zero_discharge_uses_fallback() {
    let ctx = context(RunConfig::default(), 0.0);
    let record = registry().get(1).cloned().unwrap();
    let result = process_segment(&ctx, &record).expect("segment processes");

    assert!((result.q100 - 20.0).abs() < 1e-12);
    assert!((result.target_discharge - 40.0).abs() < 1e-12);
    assert!((result.solution.target - 40.0).abs() < 1e-12);
    assert!(result.notices.iter().any(|n| n.contains("Q100 reads zero")));
}

#[test]
fn missing_inputs_fail_the_segment() {
    let ctx = context(RunConfig::default(), 30.0);
    let reg = registry();

    let err = process_segment(&ctx, reg.get(2).unwrap()).unwrap_err();
    assert!(matches!(err, SegmentError::MissingData(_)));

    let err = process_segment(&ctx, reg.get(3).unwrap()).unwrap_err();
    assert!(err.to_string().contains("valley block"));
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[test]
fn batch_isolates_failures_and_writes_outputs() {
    let ctx = context(RunConfig::default(), 30.0);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let log = RunLog::new(&ctx.config, &[("dem", Path::new("dem.tif"))]);

    let summary = execute(&ctx, &registry(), &out, log, |_| {}).expect("run finishes");
    assert_eq!(summary.outcomes.len(), 3);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.files.len(), 5);

    let text = std::fs::read_to_string(out.join("run.log")).unwrap();
    assert!(text.contains("SEGMENT 00001 COMPLETE class="));
    assert!(text.contains("SEGMENT 00002 FAILED: missing data"));
    assert!(text.contains("SEGMENT 00003 FAILED"));

    let hg: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("ValleyBottom_HydroGeo.geojson")).unwrap(),
    )
    .unwrap();
    let features = hg["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    let props = &features[0]["properties"];
    assert_eq!(props["ARCID"], 1);
    assert_eq!(props["Slope_Cl"], 2);
    assert!(props["Val_Cl_Abv"].is_string());
    assert_eq!(features[0]["geometry"]["type"], "MultiPolygon");

    let hills: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("Hillslope_categories.geojson")).unwrap(),
    )
    .unwrap();
    let sides: Vec<&str> = hills["features"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["properties"]["R_OR_L"].as_str())
        .collect();
    assert!(sides.contains(&"R"));
    assert!(sides.contains(&"L"));
}

#[test]
fn numerical_failure_is_isolated() {
    // a vanishing reach length blows the Manning discharge up to infinity
    let registry = SegmentRegistry::from_json_str(
        &SPLIT_REGISTRY.replace(r#""length": 190.0"#, r#""length": 1e-300"#),
    )
    .unwrap();
    let ctx = RunContext::new(RunConfig::default(), split_inputs()).expect("context builds");
    let dir = tempfile::tempdir().unwrap();
    let log = RunLog::new(&ctx.config, &[]);

    let summary = execute(&ctx, &registry, dir.path(), log, |_| {}).expect("run finishes");
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.outcomes[0].result().is_some());
    match &summary.outcomes[1] {
        SegmentOutcome::Failed { id, error, .. } => {
            assert_eq!(*id, 2);
            assert!(matches!(error, SegmentError::Numerical(_)), "{error}");
        }
        other => panic!("segment 2 should fail, got {:?}", other.id()),
    }

    let text = std::fs::read_to_string(dir.path().join("run.log")).unwrap();
    assert!(text.contains("SEGMENT 00001 COMPLETE"));
    assert!(text.contains("SEGMENT 00002 FAILED: numerical failure"));
}

#[test]
fn parallel_batch_matches_serial_order() {
    let serial = context(RunConfig::default(), 30.0);
    let parallel = context(
        RunConfig {
            parallel: true,
            ..RunConfig::default()
        },
        30.0,
    );
    let reg = registry();

    let a = run_batch(&serial, &reg, |_| {});
    let b = run_batch(&parallel, &reg, |_| {});
    let ids_a: Vec<i64> = a.iter().map(SegmentOutcome::id).collect();
    let ids_b: Vec<i64> = b.iter().map(SegmentOutcome::id).collect();
    assert_eq!(ids_a, vec![1, 2, 3]);
    assert_eq!(ids_a, ids_b);

    let type_a = a[0].result().unwrap().classification.valley_type;
    let type_b = b[0].result().unwrap().classification.valley_type;
    assert_eq!(type_a, type_b);
}

#[test]
fn start_id_and_limit_select_segments() {
    let ctx = context(
        RunConfig {
            start_id: 2,
            segment_limit: Some(1),
            ..RunConfig::default()
        },
        30.0,
    );
    let outcomes = run_batch(&ctx, &registry(), |_| {});
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].id(), 2);
    assert!(outcomes[0].result().is_none());
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[test]
fn inputs_load_from_geotiff() {
    let dir = tempfile::tempdir().unwrap();
    let paths = InputPaths {
        dem: dir.path().join("dem.tif"),
        drainage_area: dir.path().join("da.tif"),
        discharge: dir.path().join("q100.tif"),
        blocks: dir.path().join("blocks.tif"),
    };
    let src = inputs(30.0);
    write_geotiff(&src.dem, &paths.dem).unwrap();
    write_geotiff(&src.drainage_area, &paths.drainage_area).unwrap();
    write_geotiff(&src.discharge, &paths.discharge).unwrap();
    write_geotiff(&src.blocks, &paths.blocks).unwrap();

    let loaded = RunInputs::load(&paths).expect("inputs load");
    assert_eq!(loaded.dem.shape(), (SIZE, SIZE));
    assert_eq!(loaded.blocks.get(10, 10).unwrap(), 1);
    assert!((loaded.dem.cell_size() - 10.0).abs() < 1e-9);
    assert!(RunContext::new(RunConfig::default(), loaded).is_ok());
}

#[test]
fn misaligned_inputs_are_rejected() {
    let mut bad = inputs(30.0);
    bad.discharge
        .set_transform(GeoTransform::new(5.0, SIZE as f64 * 10.0, 10.0, -10.0));
    let err = RunContext::new(RunConfig::default(), bad).unwrap_err();
    assert!(matches!(err, RunError::Grid(_)));

    let config = RunConfig {
        mannings_n: 0.0,
        ..RunConfig::default()
    };
    let err = RunContext::new(config, inputs(30.0)).unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
}
