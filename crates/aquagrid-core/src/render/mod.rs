//! Layered, back-to-front drawing of the filtered grid.
//!
//! Paint order: background, dashed bounding box, risk-coloured cells with a
//! thin outline, each enabled overlay, compare outlines, hover outline.
//! Drawing is a pure function of [`FrameInput`]; the caller decides when.
pub mod color;
pub mod overlay;
pub mod raster;
pub mod surface;

use log::trace;

use crate::config::ViewerConfig;
use crate::coords::{GeoBounds, INDIA_BOUNDS};
use crate::filter::Subset;
use crate::geometry::{bbox, project, project_ring, Ring, Transform};
use crate::record::CellRecord;
use crate::risk::metal_palette;

use color::{Color, BACKGROUND, COMPARE_OUTLINE, HOVER_OUTLINE, SLATE};
use overlay::{LayerToggles, OverlayPaint};
use surface::{Fill, Stroke, Surface};

/// On/off lengths (px) of the bounding-box dash.
const BOUNDARY_DASH: [f64; 2] = [5.0, 5.0];

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub background: Color,
    pub cell_alpha: f64,
    pub cell_outline_width: f64,
    pub boundary_width: f64,
    pub hover_width: f64,
    pub compare_width: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for RenderStyle {
    fn from(cfg: &ViewerConfig) -> Self {
        Self {
            background: BACKGROUND,
            cell_alpha: cfg.cell_alpha,
            cell_outline_width: cfg.cell_outline_width,
            boundary_width: cfg.boundary_width,
            hover_width: cfg.hover_width,
            compare_width: cfg.compare_width,
        }
    }
}

/// Everything one frame depends on. Record indices refer to `records`.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub records: &'a [CellRecord],
    pub subset: &'a Subset,
    pub transform: Transform,
    pub bounds: GeoBounds,
    pub layers: LayerToggles,
    pub hovered: Option<usize>,
    pub compare: &'a [usize],
    pub style: RenderStyle,
}

impl<'a> FrameInput<'a> {
    /// Base layer only: no overlays, no highlights.
    pub fn new(records: &'a [CellRecord], subset: &'a Subset, transform: Transform) -> Self {
        Self {
            records,
            subset,
            transform,
            bounds: INDIA_BOUNDS,
            layers: LayerToggles::none(),
            hovered: None,
            compare: &[],
            style: RenderStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Cells drawn after culling.
    pub cells: usize,
    pub overlay_passes: usize,
    /// Hover and compare outlines drawn.
    pub highlights: usize,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Draw one frame. A zero-sized surface is left untouched and yields `None`.
pub fn draw_frame<S: Surface + ?Sized>(surface: &mut S, input: &FrameInput<'_>) -> Option<RenderStats> {
    let (w, h) = surface.size();
    if w == 0 || h == 0 {
        return None;
    }
    let t = &input.transform;
    let style = &input.style;

    surface.clear(style.background);
    surface.stroke_path(
        &boundary_path(&input.bounds, t),
        &Stroke::solid(SLATE, style.boundary_width).dashed(BOUNDARY_DASH[0], BOUNDARY_DASH[1]),
    );

    // Project each surviving cell once and reuse it across layers.
    let visible: Vec<(&CellRecord, f64, Ring)> = input
        .subset
        .iter()
        .filter_map(|e| {
            let record = input.records.get(e.index)?;
            let ring = project_ring(&record.ring(), t);
            on_surface(&ring, w, h).then_some((record, e.risk, ring))
        })
        .collect();

    let outline = Stroke::solid(SLATE, style.cell_outline_width);
    for (_, risk, ring) in &visible {
        surface.fill_path(ring, Fill::new(metal_palette(*risk), style.cell_alpha));
        surface.stroke_path(ring, &outline);
    }

    let mut overlay_passes = 0;
    for kind in input.layers.enabled() {
        overlay_passes += 1;
        for (record, _, ring) in &visible {
            match kind.paint(record) {
                Some(OverlayPaint::Fill(fill)) => surface.fill_path(ring, fill),
                Some(OverlayPaint::Outline(stroke)) => surface.stroke_path(ring, &stroke),
                None => {}
            }
        }
    }

    let mut highlights = 0;
    let compare = Stroke::solid(COMPARE_OUTLINE, style.compare_width);
    for &index in input.compare {
        if let Some(ring) = highlight_ring(input, index) {
            surface.stroke_path(&ring, &compare);
            highlights += 1;
        }
    }
    if let Some(ring) = input.hovered.and_then(|index| highlight_ring(input, index)) {
        surface.stroke_path(&ring, &Stroke::solid(HOVER_OUTLINE, style.hover_width));
        highlights += 1;
    }

    trace!("frame: {} cells, {} overlay passes, {} highlights", visible.len(), overlay_passes, highlights);
    Some(RenderStats { cells: visible.len(), overlay_passes, highlights })
}

/// Projected outline of the geographic bounding box.
pub fn boundary_path(bounds: &GeoBounds, t: &Transform) -> [(f64, f64); 5] {
    let corners = [
        (bounds.min_lon, bounds.max_lat),
        (bounds.max_lon, bounds.max_lat),
        (bounds.max_lon, bounds.min_lat),
        (bounds.min_lon, bounds.min_lat),
        (bounds.min_lon, bounds.max_lat),
    ];
    corners.map(|(lon, lat)| project(lon, lat, t))
}

/// Highlights are only drawn for cells that are currently displayed.
fn highlight_ring(input: &FrameInput<'_>, index: usize) -> Option<Ring> {
    if !input.subset.contains(index) {
        return None;
    }
    let record = input.records.get(index)?;
    Some(project_ring(&record.ring(), &input.transform))
}

fn on_surface(ring: &Ring, width: u32, height: u32) -> bool {
    let (x0, y0, x1, y1) = bbox(ring);
    x1 >= 0.0 && y1 >= 0.0 && x0 <= width as f64 && y0 <= height as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_subset, FilterSpec};
    use crate::geometry::fit_to_bounds;
    use overlay::OverlayKind;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear(Color),
        Fill(Color),
        Stroke(Color, Option<[f64; 2]>),
    }

    struct Recorder {
        size: (u32, u32),
        ops: Vec<Op>,
    }

    impl Recorder {
        fn new(w: u32, h: u32) -> Self {
            Self { size: (w, h), ops: Vec::new() }
        }
    }

    impl Surface for Recorder {
        fn size(&self) -> (u32, u32) {
            self.size
        }
        fn clear(&mut self, color: Color) {
            self.ops.push(Op::Clear(color));
        }
        fn fill_path(&mut self, _points: &[(f64, f64)], fill: Fill) {
            self.ops.push(Op::Fill(fill.color));
        }
        fn stroke_path(&mut self, _points: &[(f64, f64)], stroke: &Stroke) {
            self.ops.push(Op::Stroke(stroke.color, stroke.dash));
        }
    }

    fn grid() -> Vec<CellRecord> {
        vec![
            CellRecord::new("a", 20.0, 78.0),
            CellRecord::new("b", 25.0, 85.0).with_metal("As", 0.06, 0.05),
            CellRecord::new("c", 12.0, 75.0),
        ]
    }

    #[test]
    fn zero_sized_surface_is_a_no_op() {
        let records = grid();
        let subset = filter_subset(&records, &FilterSpec::default());
        let mut s = Recorder::new(0, 300);
        assert_eq!(draw_frame(&mut s, &FrameInput::new(&records, &subset, Transform::default())), None);
        assert!(s.ops.is_empty());
    }

    #[test]
    fn empty_subset_draws_only_chrome() {
        let subset = Subset::default();
        let mut s = Recorder::new(800, 600);
        let stats = draw_frame(&mut s, &FrameInput::new(&[], &subset, fit_to_bounds(800.0, 600.0))).unwrap();

        assert_eq!(stats, RenderStats::default());
        assert_eq!(s.ops, vec![Op::Clear(BACKGROUND), Op::Stroke(SLATE, Some(BOUNDARY_DASH))]);
    }

    #[test]
    fn layers_paint_back_to_front() {
        let records = grid();
        let subset = filter_subset(&records, &FilterSpec::default());
        let mut input = FrameInput::new(&records, &subset, fit_to_bounds(800.0, 600.0));
        input.layers.set(OverlayKind::Population, true);
        input.compare = &[2];
        input.hovered = Some(0);

        let mut s = Recorder::new(800, 600);
        let stats = draw_frame(&mut s, &input).unwrap();
        assert_eq!(stats, RenderStats { cells: 3, overlay_passes: 1, highlights: 2 });

        // clear, boundary, 3 × (fill, outline), 3 overlay fills, compare, hover
        assert_eq!(s.ops.len(), 2 + 6 + 3 + 2);
        assert_eq!(s.ops[0], Op::Clear(BACKGROUND));
        assert!(matches!(s.ops[2], Op::Fill(_)));
        assert_eq!(s.ops[3], Op::Stroke(SLATE, None));
        assert_eq!(s.ops[s.ops.len() - 2], Op::Stroke(COMPARE_OUTLINE, None));
        assert_eq!(s.ops[s.ops.len() - 1], Op::Stroke(HOVER_OUTLINE, None));
    }

    #[test]
    fn off_screen_cells_are_culled() {
        let records = grid();
        let subset = filter_subset(&records, &FilterSpec::default());
        // Zoomed far in on the first cell; the others land off-surface.
        let k = 2000.0;
        let t = Transform::new(400.0 - 78.0 * k, 300.0 + 20.0 * k, k);
        let mut s = Recorder::new(800, 600);
        let stats = draw_frame(&mut s, &FrameInput::new(&records, &subset, t)).unwrap();
        assert_eq!(stats.cells, 1);
    }

    #[test]
    fn highlights_ignore_hidden_cells() {
        let records = grid();
        let spec = FilterSpec { exceed_only: true, ..FilterSpec::default() };
        let subset = filter_subset(&records, &spec);
        let mut input = FrameInput::new(&records, &subset, fit_to_bounds(800.0, 600.0));
        input.hovered = Some(0);
        input.compare = &[0, 1];

        let mut s = Recorder::new(800, 600);
        let stats = draw_frame(&mut s, &input).unwrap();
        assert_eq!(stats.cells, 1);
        assert_eq!(stats.highlights, 1);
        assert!(!s.ops.contains(&Op::Stroke(HOVER_OUTLINE, None)));
    }

    #[test]
    fn base_fill_uses_the_subset_risk_colour() {
        let records = grid();
        let subset = filter_subset(&records, &FilterSpec::default());
        let mut s = Recorder::new(800, 600);
        draw_frame(&mut s, &FrameInput::new(&records, &subset, fit_to_bounds(800.0, 600.0))).unwrap();
        let expected: Vec<Op> = subset.iter().map(|e| Op::Fill(metal_palette(e.risk))).collect();
        let fills: Vec<Op> = s.ops.iter().filter(|op| matches!(op, Op::Fill(_))).cloned().collect();
        assert_eq!(fills, expected);
    }
}
