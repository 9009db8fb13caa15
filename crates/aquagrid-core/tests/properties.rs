//! End-to-end checks of the grid's core guarantees.
use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use aquagrid_core::config::ViewerConfig;
use aquagrid_core::coords::INDIA_BOUNDS;
use aquagrid_core::filter::{apply_filters, filter_subset, FilterSpec};
use aquagrid_core::geometry::{fit_to_bounds, point_in_polygon, project, project_ring, rectangle_for_cell, unproject, Transform};
use aquagrid_core::interaction::InteractionController;
use aquagrid_core::record::{records_from_json, CellRecord};
use aquagrid_core::render::color::BACKGROUND;
use aquagrid_core::render::raster::RasterSurface;
use aquagrid_core::render::surface::Surface;
use aquagrid_core::render::{draw_frame, FrameInput};
use aquagrid_core::risk::{compute_risk, compute_risk_with_overrides, risk_breakdown};
use aquagrid_core::synth::pad_to_target;

fn random_transform(rng: &mut StdRng) -> Transform {
    Transform::new(rng.gen_range(-5000.0..5000.0), rng.gen_range(-5000.0..5000.0), rng.gen_range(0.5..50.0))
}

fn random_record(rng: &mut StdRng, i: usize) -> CellRecord {
    let mut r = CellRecord::new(
        format!("R-{i}"),
        rng.gen_range(INDIA_BOUNDS.min_lat..=INDIA_BOUNDS.max_lat),
        rng.gen_range(INDIA_BOUNDS.min_lon..=INDIA_BOUNDS.max_lon),
    );
    for metal in ["As", "Pb", "Cr", "Hg"] {
        if rng.gen_bool(0.6) {
            r.metals.insert(metal.into(), rng.gen_range(0.0..0.2));
        }
        if rng.gen_bool(0.7) {
            r.limits.insert(metal.into(), rng.gen_range(0.001..0.1));
        }
    }
    r.population_density = rng.gen_range(0.0..40_000.0);
    r.industrial_proximity = rng.gen_range(0.0..120.0);
    r.trend = (0..rng.gen_range(0..12)).map(|_| rng.gen_range(0.0..0.1)).collect();
    r.state = ["Punjab", "Bihar", "Kerala"][i % 3].into();
    r
}

fn population(rng: &mut StdRng, n: usize) -> Vec<CellRecord> {
    (0..n).map(|i| random_record(rng, i)).collect()
}

#[test]
fn projection_round_trips() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
        let t = random_transform(&mut rng);
        let lon = rng.gen_range(INDIA_BOUNDS.min_lon..=INDIA_BOUNDS.max_lon);
        let lat = rng.gen_range(INDIA_BOUNDS.min_lat..=INDIA_BOUNDS.max_lat);
        let (x, y) = project(lon, lat, &t);
        let (lon2, lat2) = unproject(x, y, &t);
        assert_abs_diff_eq!(lon2, lon, epsilon = 1e-9);
        assert_abs_diff_eq!(lat2, lat, epsilon = 1e-9);
    }
}

#[test]
fn wheel_zoom_pins_the_point_under_the_cursor() {
    let mut rng = StdRng::seed_from_u64(12);
    let mut c = InteractionController::new(ViewerConfig::default());
    c.resize(1280.0, 720.0);
    for _ in 0..500 {
        let (cx, cy) = (rng.gen_range(0.0..1280.0), rng.gen_range(0.0..720.0));
        let (lon, lat) = unproject(cx, cy, &c.transform());
        c.wheel(cx, cy, rng.gen_range(-600.0..600.0));
        let (x, y) = project(lon, lat, &c.transform());
        assert_abs_diff_eq!(x, cx, epsilon = 1e-6);
        assert_abs_diff_eq!(y, cy, epsilon = 1e-6);
    }
}

#[test]
fn zoom_stays_within_limits() {
    let mut c = InteractionController::new(ViewerConfig::default());
    c.resize(800.0, 600.0);
    for _ in 0..1000 {
        c.wheel(400.0, 300.0, 240.0);
        assert!(c.transform().k >= 0.5);
    }
    for _ in 0..1000 {
        c.wheel(400.0, 300.0, -240.0);
        assert!(c.transform().k <= 50.0);
    }
}

#[test]
fn risk_is_bounded_for_every_input() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut records = population(&mut rng, 500);
    records.push(CellRecord::new("empty", 20.0, 78.0));
    let mut extreme = CellRecord::new("extreme", 20.0, 78.0).with_metal("As", 1e9, 0.0);
    extreme.population_density = 1e12;
    extreme.industrial_proximity = -50.0;
    extreme.trend = vec![0.0, 1e6, -1e6, 1e6];
    records.push(extreme);

    for r in &records {
        let risk = compute_risk(r);
        assert!((0.0..=1.0).contains(&risk), "{}: {risk}", r.id);
    }
}

#[test]
fn raising_a_metal_never_lowers_risk() {
    let mut rng = StdRng::seed_from_u64(14);
    for r in population(&mut rng, 200) {
        let Some((metal, &start)) = r.metals.iter().next() else { continue };
        let before = risk_breakdown(&r);
        let mut overrides = BTreeMap::new();
        overrides.insert(metal.clone(), start + 1.0);
        let after = compute_risk_with_overrides(&r, &overrides);
        assert!(after >= before.total, "{}: {after} < {}", r.id, before.total);
    }
}

#[test]
fn filtering_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(15);
    let records = population(&mut rng, 400);
    let specs = [
        FilterSpec::default(),
        FilterSpec { exceed_only: true, ..FilterSpec::default() },
        FilterSpec { hotspots_only: true, ..FilterSpec::default() },
        FilterSpec { state: Some("Bihar".into()), risk_range: [0.2, 0.7], ..FilterSpec::default() },
        FilterSpec { metals: ["Hg".to_string()].into_iter().collect(), ..FilterSpec::default() },
    ];
    for spec in &specs {
        let once = apply_filters(&records, spec);
        let twice = apply_filters(&once, spec);
        assert_eq!(once, twice);
    }
}

#[test]
fn cell_contains_its_own_centre_but_not_its_neighbour() {
    let mut rng = StdRng::seed_from_u64(16);
    let ring = rectangle_for_cell(20.0, 78.0);
    let cell_width = ring[1].0 - ring[0].0;
    for _ in 0..500 {
        let t = random_transform(&mut rng);
        let screen = project_ring(&ring, &t);
        let (cx, cy) = project(78.0, 20.0, &t);
        let (ex, ey) = project(78.0 + cell_width, 20.0, &t);
        assert!(point_in_polygon(cx, cy, &screen));
        assert!(!point_in_polygon(ex, ey, &screen));
    }
}

#[test]
fn empty_dataset_renders_without_cells() {
    let records: Vec<CellRecord> = Vec::new();
    let subset = filter_subset(&records, &FilterSpec { hotspots_only: true, ..FilterSpec::default() });
    assert!(subset.is_empty());
    assert!(apply_filters(&records, &FilterSpec::default()).is_empty());

    let mut surface = RasterSurface::new(320, 240);
    let stats = draw_frame(&mut surface, &FrameInput::new(&records, &subset, fit_to_bounds(320.0, 240.0))).unwrap();
    assert_eq!(stats.cells, 0);
    // Centre of the map: inside the dashed box, so plain background.
    let bg = [BACKGROUND.r, BACKGROUND.g, BACKGROUND.b, 255];
    assert_eq!(surface.pixel(160, 120), bg);
    assert_eq!(surface.size(), (320, 240));
}

#[test]
fn exceedance_filter_follows_the_limit() {
    let json = r#"[{"Raster_ID": "x", "Heavy_Metals": {"As": 0.06}, "WHO_Limit": {"As": 0.05}}]"#;
    let spec = FilterSpec { exceed_only: true, ..FilterSpec::default() };

    let over = records_from_json(json).unwrap();
    assert_eq!(apply_filters(&over, &spec).len(), 1);

    let under = records_from_json(&json.replace("0.05", "0.07")).unwrap();
    assert!(apply_filters(&under, &spec).is_empty());
}

#[test]
fn hotspot_boundary_is_inclusive() {
    let json = |density: f64| {
        format!(
            r#"[{{"Heavy_Metals": {{"As": 0.06}}, "WHO_Limit": {{"As": 0.05}},
                 "Population_Density": {density}, "Industrial_Proximity": 35, "Trend_Data": []}}]"#
        )
    };
    let spec = FilterSpec { hotspots_only: true, ..FilterSpec::default() };

    let at = records_from_json(&json(5000.0)).unwrap();
    assert_eq!(compute_risk(&at[0]), 0.66);
    assert_eq!(apply_filters(&at, &spec).len(), 1);

    let below = records_from_json(&json(4987.5)).unwrap();
    assert_abs_diff_eq!(compute_risk(&below[0]), 0.6599, epsilon = 1e-12);
    assert!(apply_filters(&below, &spec).is_empty());
}

#[test]
fn padded_collections_filter_and_render() {
    let mut rng = StdRng::seed_from_u64(17);
    let seed = population(&mut rng, 9);
    let records = pad_to_target(seed, 1000, &mut rng);
    assert_eq!(records.len(), 1000);

    let subset = filter_subset(&records, &FilterSpec::default());
    let mut surface = RasterSurface::new(400, 400);
    let stats = draw_frame(&mut surface, &FrameInput::new(&records, &subset, fit_to_bounds(400.0, 400.0))).unwrap();
    assert_eq!(stats.cells, 1000);
}
