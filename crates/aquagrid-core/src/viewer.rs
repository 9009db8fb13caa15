//! The grid viewer: dataset, filter, layers, interaction and redraw
//! scheduling behind one host-facing surface.
//!
//! Hosts forward input events and call [`GridViewer::frame`] when the frame
//! they were asked for fires. Every state change goes through the scheduler,
//! so nothing draws synchronously inside an event handler.
use log::{debug, info, warn};

use crate::bookmark::{Bookmarks, KeyValueStore};
use crate::config::ViewerConfig;
use crate::coords::INDIA_BOUNDS;
use crate::error::StoreError;
use crate::filter::{FilterEngine, FilterSpec, Subset};
use crate::geometry::Transform;
use crate::interaction::{Effect, InteractionController};
use crate::record::{CellRecord, Dataset};
use crate::render::overlay::{LayerToggles, OverlayKind};
use crate::render::surface::Surface;
use crate::render::{draw_frame, FrameInput, RenderStats, RenderStyle};
use crate::schedule::{FrameHost, RedrawReason, RedrawScheduler};

pub struct GridViewer<H: FrameHost> {
    dataset: Dataset,
    filter: FilterEngine,
    layers: LayerToggles,
    interaction: InteractionController,
    scheduler: RedrawScheduler<H>,
    bookmarks: Bookmarks,
    style: RenderStyle,
    closed: bool,
}

impl<H: FrameHost> GridViewer<H> {
    pub fn new(host: H, store: Box<dyn KeyValueStore>, config: ViewerConfig) -> Self {
        let config = config.sanitized();
        Self {
            dataset: Dataset::default(),
            filter: FilterEngine::default(),
            layers: config.layers,
            style: RenderStyle::from(&config),
            interaction: InteractionController::new(config),
            scheduler: RedrawScheduler::new(host),
            bookmarks: Bookmarks::new(store),
            closed: false,
        }
    }

    // ── Data & filter ────────────────────────────────────────────────────────

    /// Replace the record collection. Hover, selection and compare picks are
    /// dropped because their indices no longer mean anything.
    pub fn set_records(&mut self, records: Vec<CellRecord>) {
        self.set_dataset(Dataset::new(records));
    }

    pub fn set_dataset(&mut self, dataset: Dataset) {
        info!("viewer dataset replaced: {} records", dataset.len());
        self.dataset = dataset;
        self.filter.rebuild(self.dataset.records());
        self.interaction.reset_indices();
        self.request(RedrawReason::Data);
    }

    /// Install a new filter. Returns `false` when it equals the current one.
    pub fn set_filter(&mut self, spec: FilterSpec) -> bool {
        if !self.filter.set_spec(self.dataset.records(), spec) {
            return false;
        }
        self.interaction.retain_displayed(self.filter.subset());
        self.request(RedrawReason::Filter);
        true
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        self.filter.spec()
    }

    /// Show only the riskiest share of the filtered records.
    pub fn set_hotspot_mode(&mut self, on: bool) -> bool {
        if !self.filter.set_hotspot_mode(self.dataset.records(), on) {
            return false;
        }
        self.interaction.retain_displayed(self.filter.subset());
        self.request(RedrawReason::Filter);
        true
    }

    pub fn hotspot_mode(&self) -> bool {
        self.filter.hotspot_mode()
    }

    pub fn records(&self) -> &[CellRecord] {
        self.dataset.records()
    }

    pub fn subset(&self) -> &Subset {
        self.filter.subset()
    }

    /// Records currently displayed, in source order.
    pub fn display_records(&self) -> Vec<&CellRecord> {
        self.filter.subset().records(self.dataset.records()).collect()
    }

    // ── Layers ───────────────────────────────────────────────────────────────

    pub fn layers(&self) -> LayerToggles {
        self.layers
    }

    pub fn set_layers(&mut self, layers: LayerToggles) {
        if layers != self.layers {
            self.layers = layers;
            self.request(RedrawReason::Layers);
        }
    }

    pub fn toggle_layer(&mut self, kind: OverlayKind) -> bool {
        let on = self.layers.toggle(kind);
        self.request(RedrawReason::Layers);
        on
    }

    // ── View & input ─────────────────────────────────────────────────────────

    pub fn transform(&self) -> Transform {
        self.interaction.transform()
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    /// New viewport size in surface pixels; refits the view.
    pub fn resize(&mut self, width: f64, height: f64) -> Effect {
        let fx = self.interaction.resize(width, height);
        self.apply(fx)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> Effect {
        let fx = self.interaction.pointer_down(x, y);
        self.apply(fx)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Effect {
        let fx = self
            .interaction
            .pointer_move(x, y, self.dataset.records(), self.filter.subset());
        self.apply(fx)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Effect {
        let fx = self.interaction.pointer_up(x, y);
        self.apply(fx)
    }

    pub fn pointer_leave(&mut self) -> Effect {
        let fx = self.interaction.pointer_leave();
        self.apply(fx)
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> Effect {
        let fx = self.interaction.wheel(x, y, delta_y);
        self.apply(fx)
    }

    pub fn click(&mut self, x: f64, y: f64) -> Effect {
        let fx = self
            .interaction
            .click(x, y, self.dataset.records(), self.filter.subset());
        self.apply(fx)
    }

    pub fn set_compare_mode(&mut self, on: bool) -> Effect {
        let fx = self.interaction.set_compare_mode(on);
        self.apply(fx)
    }

    pub fn clear_selection(&mut self) -> Effect {
        let fx = self.interaction.clear_selection();
        self.apply(fx)
    }

    /// Centre on and select a displayed record. Returns `false` if `id` is
    /// not displayed.
    pub fn focus(&mut self, id: &str) -> bool {
        match self.interaction.focus(id, self.dataset.records(), self.filter.subset()) {
            Some(fx) => {
                self.apply(fx);
                true
            }
            None => false,
        }
    }

    pub fn selected_record(&self) -> Option<&CellRecord> {
        self.interaction.selected().and_then(|i| self.dataset.get(i))
    }

    pub fn hovered_record(&self) -> Option<&CellRecord> {
        self.interaction.hovered().and_then(|i| self.dataset.get(i))
    }

    pub fn compare_records(&self) -> Vec<&CellRecord> {
        self.interaction
            .compare()
            .iter()
            .filter_map(|&i| self.dataset.get(i))
            .collect()
    }

    // ── Bookmarks ────────────────────────────────────────────────────────────

    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmarks.contains(id)
    }

    pub fn toggle_bookmark(&mut self, id: &str) -> Result<bool, StoreError> {
        self.bookmarks.toggle(id)
    }

    pub fn bookmarks(&self) -> Vec<String> {
        self.bookmarks.list()
    }

    // ── Frames ───────────────────────────────────────────────────────────────

    pub fn needs_frame(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn host(&self) -> &H {
        self.scheduler.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.scheduler.host_mut()
    }

    /// Run the frame the host was asked for. Does nothing when no redraw is
    /// pending or the viewer is closed; a zero-sized surface is skipped and
    /// picked up again on the next resize.
    pub fn frame<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Option<RenderStats> {
        if self.closed {
            return None;
        }
        self.scheduler.begin_frame()?;
        let stats = self.render(surface);
        if stats.is_none() {
            debug!("frame skipped: surface has no area");
        }
        stats
    }

    /// Draw the current state immediately, bypassing the scheduler.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) -> Option<RenderStats> {
        let input = FrameInput {
            records: self.dataset.records(),
            subset: self.filter.subset(),
            transform: self.interaction.transform(),
            bounds: INDIA_BOUNDS,
            layers: self.layers,
            hovered: self.interaction.hovered(),
            compare: self.interaction.compare(),
            style: self.style,
        };
        draw_frame(surface, &input)
    }

    /// Tear down: withdraw the pending frame and ignore later requests.
    pub fn close(&mut self) {
        if !self.closed {
            self.scheduler.cancel();
            self.closed = true;
            debug!("viewer closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn apply(&mut self, fx: Effect) -> Effect {
        if let Some(reason) = fx.redraw {
            self.request(reason);
        }
        fx
    }

    fn request(&mut self, reason: RedrawReason) {
        if self.closed {
            warn!("redraw ({reason:?}) requested after close; ignored");
            return;
        }
        self.scheduler.request(reason);
    }
}
