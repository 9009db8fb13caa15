//! Pan, zoom, hover and selection.
//!
//! The controller owns the view transform. Pointer input arrives in
//! surface-local pixels; every handler returns an [`Effect`] telling the host
//! what to redraw, which cursor to show and whether to grab the pointer.
use log::debug;
use serde::Serialize;

use crate::config::ViewerConfig;
use crate::coords::INDIA_BOUNDS;
use crate::filter::Subset;
use crate::geometry::{bbox, fit_to_bounds_with, point_in_polygon, project_ring, Transform};
use crate::record::CellRecord;
use crate::schedule::RedrawReason;

// ── Effects ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    Grabbing,
}

impl Cursor {
    /// CSS `cursor` value.
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Pointer => "pointer",
            Cursor::Grabbing => "grabbing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Acquire,
    Release,
}

/// Host-side consequences of one input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effect {
    pub redraw: Option<RedrawReason>,
    pub cursor: Cursor,
    pub capture: Option<Capture>,
}

impl Effect {
    fn idle(cursor: Cursor) -> Self {
        Self { redraw: None, cursor, capture: None }
    }

    fn redraw(reason: RedrawReason, cursor: Cursor) -> Self {
        Self { redraw: Some(reason), cursor, capture: None }
    }
}

// ── State ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        /// Last pointer position.
        last: (f64, f64),
        /// Total path length since pointer-down.
        travelled: f64,
    },
}

pub struct InteractionController {
    transform: Transform,
    viewport: (f64, f64),
    drag: DragState,
    hovered: Option<usize>,
    selected: Option<usize>,
    compare_mode: bool,
    /// Oldest first.
    compare: Vec<usize>,
    suppress_click: bool,
    cursor: Cursor,
    config: ViewerConfig,
}

impl InteractionController {
    pub fn new(config: ViewerConfig) -> Self {
        let config = config.sanitized();
        Self {
            transform: Transform::default(),
            viewport: (0.0, 0.0),
            drag: DragState::Idle,
            hovered: None,
            selected: None,
            compare_mode: false,
            compare: Vec::new(),
            suppress_click: false,
            cursor: Cursor::Default,
            config,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) -> Effect {
        self.transform = transform;
        Effect::redraw(RedrawReason::Transform, self.cursor)
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn compare_mode(&self) -> bool {
        self.compare_mode
    }

    /// Compare picks, oldest first.
    pub fn compare(&self) -> &[usize] {
        &self.compare
    }

    /// Refit the whole bounding box into a new viewport.
    pub fn resize(&mut self, width: f64, height: f64) -> Effect {
        self.viewport = (width, height);
        self.transform = fit_to_bounds_with(width, height, &INDIA_BOUNDS, self.config.fit_padding, self.config.fit_margin);
        Effect::redraw(RedrawReason::Resize, self.cursor)
    }

    // ── Pointer ──────────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Effect {
        self.drag = DragState::Dragging { last: (x, y), travelled: 0.0 };
        self.suppress_click = false;
        self.cursor = Cursor::Grabbing;
        Effect { redraw: None, cursor: self.cursor, capture: Some(Capture::Acquire) }
    }

    /// Pans while dragging, hit-tests for hover otherwise.
    pub fn pointer_move(&mut self, x: f64, y: f64, records: &[CellRecord], subset: &Subset) -> Effect {
        match self.drag {
            DragState::Dragging { last, travelled } => {
                let (dx, dy) = (x - last.0, y - last.1);
                self.transform.tx += dx;
                self.transform.ty += dy;
                self.drag = DragState::Dragging { last: (x, y), travelled: travelled + dx.hypot(dy) };
                Effect::redraw(RedrawReason::Transform, self.cursor)
            }
            DragState::Idle => {
                let hit = hit_test(x, y, records, subset, &self.transform);
                self.cursor = if hit.is_some() { Cursor::Pointer } else { Cursor::Default };
                if hit == self.hovered {
                    return Effect::idle(self.cursor);
                }
                self.hovered = hit;
                Effect::redraw(RedrawReason::Hover, self.cursor)
            }
        }
    }

    pub fn pointer_up(&mut self, _x: f64, _y: f64) -> Effect {
        let DragState::Dragging { travelled, .. } = self.drag else {
            return Effect::idle(self.cursor);
        };
        self.drag = DragState::Idle;
        self.suppress_click = travelled > self.config.click_slop;
        self.cursor = Cursor::Default;
        Effect { redraw: None, cursor: self.cursor, capture: Some(Capture::Release) }
    }

    /// Pointer left the surface: drop the hover, end any drag.
    pub fn pointer_leave(&mut self) -> Effect {
        let released = self.is_dragging();
        self.drag = DragState::Idle;
        self.cursor = Cursor::Default;
        let redraw = self.hovered.take().map(|_| RedrawReason::Hover);
        Effect { redraw, cursor: self.cursor, capture: released.then_some(Capture::Release) }
    }

    /// Zoom about the cursor: the point under (cx, cy) stays put.
    pub fn wheel(&mut self, cx: f64, cy: f64, delta_y: f64) -> Effect {
        let k = self.transform.k;
        let next = (k * (-delta_y * self.config.wheel_sensitivity).exp())
            .clamp(self.config.min_zoom, self.config.max_zoom);
        if !next.is_finite() || next == k {
            return Effect::idle(self.cursor);
        }
        let ratio = next / k;
        self.transform = Transform {
            tx: cx - (cx - self.transform.tx) * ratio,
            ty: cy - (cy - self.transform.ty) * ratio,
            k: next,
        };
        Effect::redraw(RedrawReason::Transform, self.cursor)
    }

    /// Select (or, in compare mode, toggle) the cell under the pointer.
    /// Ignored mid-drag and right after a drag that travelled past the slop.
    pub fn click(&mut self, x: f64, y: f64, records: &[CellRecord], subset: &Subset) -> Effect {
        if self.is_dragging() {
            return Effect::idle(self.cursor);
        }
        if std::mem::take(&mut self.suppress_click) {
            debug!("click after drag suppressed");
            return Effect::idle(self.cursor);
        }
        let hit = hit_test(x, y, records, subset, &self.transform);

        if self.compare_mode {
            let Some(index) = hit else {
                return Effect::idle(self.cursor);
            };
            if let Some(pos) = self.compare.iter().position(|&i| i == index) {
                self.compare.remove(pos);
            } else {
                if self.compare.len() >= self.config.compare_capacity {
                    self.compare.remove(0);
                }
                self.compare.push(index);
            }
            return Effect::redraw(RedrawReason::Selection, self.cursor);
        }

        if hit == self.selected {
            return Effect::idle(self.cursor);
        }
        self.selected = hit;
        Effect::redraw(RedrawReason::Selection, self.cursor)
    }

    pub fn clear_selection(&mut self) -> Effect {
        match self.selected.take() {
            Some(_) => Effect::redraw(RedrawReason::Selection, self.cursor),
            None => Effect::idle(self.cursor),
        }
    }

    /// Leaving compare mode drops the picks.
    pub fn set_compare_mode(&mut self, on: bool) -> Effect {
        self.compare_mode = on;
        if on || self.compare.is_empty() {
            return Effect::idle(self.cursor);
        }
        self.compare.clear();
        Effect::redraw(RedrawReason::Selection, self.cursor)
    }

    /// Centre the view on a displayed record and select it. `None` when no
    /// displayed record carries `id`.
    pub fn focus(&mut self, id: &str, records: &[CellRecord], subset: &Subset) -> Option<Effect> {
        let (index, record) = subset
            .indices()
            .find_map(|i| records.get(i).filter(|r| r.id == id).map(|r| (i, r)))?;
        let (w, h) = self.viewport;
        let k = self.transform.k;
        self.transform.tx = w / 2.0 - record.lon * k;
        self.transform.ty = h / 2.0 + record.lat * k;
        self.selected = Some(index);
        Some(Effect::redraw(RedrawReason::Transform, self.cursor))
    }

    /// Drop hover and compare picks that are no longer displayed. The
    /// selection survives a filter change so the detail view stays open.
    pub fn retain_displayed(&mut self, subset: &Subset) {
        if self.hovered.is_some_and(|i| !subset.contains(i)) {
            self.hovered = None;
        }
        self.compare.retain(|&i| subset.contains(i));
    }

    /// Forget every index; used when the record collection is replaced.
    pub fn reset_indices(&mut self) {
        self.hovered = None;
        self.selected = None;
        self.compare.clear();
    }
}

// ── Hit testing ──────────────────────────────────────────────────────────────

/// First displayed cell whose projected ring contains (x, y).
pub fn hit_test(x: f64, y: f64, records: &[CellRecord], subset: &Subset, t: &Transform) -> Option<usize> {
    subset.indices().find(|&index| {
        let Some(record) = records.get(index) else {
            return false;
        };
        let ring = project_ring(&record.ring(), t);
        let (x0, y0, x1, y1) = bbox(&ring);
        x >= x0 && x <= x1 && y >= y0 && y <= y1 && point_in_polygon(x, y, &ring)
    })
}
