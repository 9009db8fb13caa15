//! Browser binding for the groundwater risk grid: a canvas-backed viewer
//! driven by DOM pointer events and `requestAnimationFrame`.
use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use aquagrid_core::bookmark::{KeyValueStore, MemoryStore};
use aquagrid_core::export::{to_csv, to_json};
use aquagrid_core::filter::{search, unique_districts, unique_metals, unique_states, FilterSpec, SEARCH_LIMIT};
use aquagrid_core::interaction::{Capture, Effect};
use aquagrid_core::record::records_from_json;
use aquagrid_core::render::overlay::{LayerToggles, OverlayKind};
use aquagrid_core::risk::risk_breakdown;
use aquagrid_core::summary::{compare_regions, region_summary, DashboardSummary};
use aquagrid_core::synth::pad_to_target;
use aquagrid_core::{GridViewer, ViewerConfig};

pub mod canvas;
pub mod console;
pub mod host;
pub mod storage;

use canvas::CanvasSurface;
use host::{AnimationFrameHost, ListenerGuard};
use storage::LocalStorageStore;

const STORAGE_PREFIX: &str = "aquagrid:";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console::init(log::LevelFilter::Info);
    Ok(())
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Plain JS objects rather than `Map`s, so records read naturally in JS.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value.serialize(&Serializer::json_compatible()).map_err(JsValue::from)
}

// ── Shared state ─────────────────────────────────────────────────────────────

struct Inner {
    viewer: GridViewer<AnimationFrameHost>,
    surface: CanvasSurface,
    dpr: f64,
}

impl Inner {
    /// Event position in canvas device pixels.
    fn device_point(&self, e: &MouseEvent) -> (f64, f64) {
        let rect = self.surface.canvas().get_bounding_client_rect();
        (
            (e.client_x() as f64 - rect.left()) * self.dpr,
            (e.client_y() as f64 - rect.top()) * self.dpr,
        )
    }

    fn apply(&self, fx: Effect, pointer_id: Option<i32>) {
        let canvas = self.surface.canvas();
        let _ = canvas.style().set_property("cursor", fx.cursor.css());
        if let (Some(capture), Some(id)) = (fx.capture, pointer_id) {
            let res = match capture {
                Capture::Acquire => canvas.set_pointer_capture(id),
                Capture::Release => canvas.release_pointer_capture(id),
            };
            if let Err(e) = res {
                log::debug!("pointer capture ({capture:?}) failed: {e:?}");
            }
        }
    }

    fn refit(&mut self, dpr: f64) {
        self.dpr = dpr;
        let (w, h) = self.surface.fit_to_element(dpr);
        self.viewer.resize(w as f64, h as f64);
    }

    fn draw(&mut self) {
        if let Some(stats) = self.viewer.frame(&mut self.surface) {
            log::trace!("frame: {} cells, {} overlay passes", stats.cells, stats.overlay_passes);
        }
    }
}

// ── Exported viewer ──────────────────────────────────────────────────────────

#[wasm_bindgen]
pub struct AquaGrid {
    inner: Rc<RefCell<Inner>>,
    listeners: Vec<ListenerGuard>,
}

#[wasm_bindgen]
impl AquaGrid {
    /// Attach to the `<canvas>` with id `canvas_id`. `config_json` may be
    /// omitted; unknown or missing keys fall back to defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, config_json: Option<String>) -> Result<AquaGrid, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{canvas_id}")))?
            .dyn_into::<HtmlCanvasElement>()?;

        let config = match config_json.as_deref() {
            Some(text) => ViewerConfig::from_json(text).map_err(js_err)?,
            None => ViewerConfig::default(),
        };
        let store: Box<dyn KeyValueStore> = match LocalStorageStore::from_window(&window, STORAGE_PREFIX) {
            Some(s) => Box::new(s),
            None => Box::new(MemoryStore::new()),
        };

        let host = AnimationFrameHost::new(window.clone());
        let slot = host.callback_slot();
        let inner = Rc::new(RefCell::new(Inner {
            viewer: GridViewer::new(host, store, config),
            surface: CanvasSurface::new(canvas.clone())?,
            dpr: window.device_pixel_ratio(),
        }));

        let weak = Rc::downgrade(&inner);
        *slot.borrow_mut() = Some(Closure::new(move |_ts: f64| {
            let Some(inner) = weak.upgrade() else { return };
            match inner.try_borrow_mut() {
                Ok(mut inner) => inner.draw(),
                Err(_) => log::warn!("frame fired while the viewer was busy"),
            };
        }));

        let listeners = Self::listen(&inner, &canvas, &window)?;
        inner.borrow_mut().refit(window.device_pixel_ratio());
        log::info!("grid attached to #{canvas_id}");
        Ok(AquaGrid { inner, listeners })
    }

    // ── Data ─────────────────────────────────────────────────────────────────

    /// Load a record collection (bare array or `{ "records": [...] }`).
    /// With `pad_to`, the set is grown with jittered variants up to that
    /// size. Returns the number of records held.
    #[wasm_bindgen(js_name = loadRecords)]
    pub fn load_records(&self, json: &str, pad_to: Option<u32>) -> Result<u32, JsValue> {
        let mut records = records_from_json(json).map_err(js_err)?;
        if let Some(target) = pad_to {
            records = pad_to_target(records, target as usize, &mut rand::thread_rng());
        }
        let n = records.len() as u32;
        self.inner.borrow_mut().viewer.set_records(records);
        Ok(n)
    }

    /// Replace the filter from a JS object with camelCase keys. Returns
    /// whether the display subset was rebuilt.
    #[wasm_bindgen(js_name = setFilter)]
    pub fn set_filter(&self, spec: JsValue) -> Result<bool, JsValue> {
        let spec: FilterSpec = if spec.is_undefined() || spec.is_null() {
            FilterSpec::default()
        } else {
            serde_wasm_bindgen::from_value(spec)?
        };
        Ok(self.inner.borrow_mut().viewer.set_filter(spec))
    }

    pub fn filter(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.borrow().viewer.filter_spec())
    }

    /// Show only the riskiest 5% of the filtered records. Returns whether
    /// the display subset was rebuilt.
    #[wasm_bindgen(js_name = setHotspotMode)]
    pub fn set_hotspot_mode(&self, on: bool) -> bool {
        self.inner.borrow_mut().viewer.set_hotspot_mode(on)
    }

    #[wasm_bindgen(js_name = hotspotMode)]
    pub fn hotspot_mode(&self) -> bool {
        self.inner.borrow().viewer.hotspot_mode()
    }

    /// Current view as `{ tx, ty, k }` in device pixels.
    pub fn transform(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().viewer.transform())
    }

    #[wasm_bindgen(js_name = displayRecords)]
    pub fn display_records(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().viewer.display_records())
    }

    /// Facet values for the filter controls.
    pub fn facets(&self, state: Option<String>) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct Facets {
            states: Vec<String>,
            districts: Vec<String>,
            metals: Vec<String>,
        }
        let inner = self.inner.borrow();
        let records = inner.viewer.records();
        to_js(&Facets {
            states: unique_states(records),
            districts: unique_districts(records, state.as_deref()),
            metals: unique_metals(records),
        })
    }

    pub fn search(&self, query: &str) -> Result<JsValue, JsValue> {
        let inner = self.inner.borrow();
        let records = inner.viewer.records();
        let hits: Vec<_> = search(records, query, SEARCH_LIMIT)
            .into_iter()
            .filter_map(|i| records.get(i))
            .collect();
        to_js(&hits)
    }

    // ── Layers ───────────────────────────────────────────────────────────────

    pub fn layers(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().viewer.layers())
    }

    #[wasm_bindgen(js_name = setLayers)]
    pub fn set_layers(&self, layers: JsValue) -> Result<(), JsValue> {
        let layers: LayerToggles = serde_wasm_bindgen::from_value(layers)?;
        self.inner.borrow_mut().viewer.set_layers(layers);
        Ok(())
    }

    /// Flip one overlay by name (`landUse`, `industry`, `population`,
    /// `rainfall`, `mining`). Returns the new state.
    #[wasm_bindgen(js_name = toggleLayer)]
    pub fn toggle_layer(&self, name: &str) -> Result<bool, JsValue> {
        let kind: OverlayKind = serde_wasm_bindgen::from_value(JsValue::from_str(name))
            .map_err(|_| JsValue::from_str(&format!("unknown layer {name:?}")))?;
        Ok(self.inner.borrow_mut().viewer.toggle_layer(kind))
    }

    // ── Selection ────────────────────────────────────────────────────────────

    #[wasm_bindgen(js_name = setCompareMode)]
    pub fn set_compare_mode(&self, on: bool) {
        let mut inner = self.inner.borrow_mut();
        let fx = inner.viewer.set_compare_mode(on);
        inner.apply(fx, None);
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&self) {
        let mut inner = self.inner.borrow_mut();
        let fx = inner.viewer.clear_selection();
        inner.apply(fx, None);
    }

    /// Centre on a displayed record and select it.
    pub fn focus(&self, id: &str) -> bool {
        self.inner.borrow_mut().viewer.focus(id)
    }

    /// The selected record with its risk breakdown, or `null`.
    pub fn selected(&self) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct Selected<'a> {
            record: &'a aquagrid_core::CellRecord,
            risk: aquagrid_core::risk::RiskBreakdown,
            bookmarked: bool,
        }
        let inner = self.inner.borrow();
        match inner.viewer.selected_record() {
            Some(record) => to_js(&Selected {
                record,
                risk: risk_breakdown(record),
                bookmarked: inner.viewer.is_bookmarked(&record.id),
            }),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn hovered(&self) -> Result<JsValue, JsValue> {
        match self.inner.borrow().viewer.hovered_record() {
            Some(record) => to_js(record),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn compare(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().viewer.compare_records())
    }

    // ── Summaries & export ───────────────────────────────────────────────────

    pub fn summary(&self) -> Result<JsValue, JsValue> {
        let inner = self.inner.borrow();
        to_js(&DashboardSummary::from_subset(inner.viewer.records(), inner.viewer.subset()))
    }

    #[wasm_bindgen(js_name = regionSummary)]
    pub fn region_summary(&self, state: Option<String>) -> Result<JsValue, JsValue> {
        to_js(&region_summary(self.inner.borrow().viewer.records(), state.as_deref()))
    }

    #[wasm_bindgen(js_name = compareRegions)]
    pub fn compare_regions(&self, a: Option<String>, b: Option<String>) -> Result<JsValue, JsValue> {
        to_js(&compare_regions(self.inner.borrow().viewer.records(), a.as_deref(), b.as_deref()))
    }

    #[wasm_bindgen(js_name = exportCsv)]
    pub fn export_csv(&self) -> Result<String, JsValue> {
        let inner = self.inner.borrow();
        let shown: Vec<_> = inner.viewer.display_records().into_iter().cloned().collect();
        to_csv(&shown).map_err(js_err)
    }

    #[wasm_bindgen(js_name = exportJson)]
    pub fn export_json(&self) -> Result<String, JsValue> {
        let inner = self.inner.borrow();
        let shown: Vec<_> = inner.viewer.display_records().into_iter().cloned().collect();
        to_json(&shown).map_err(js_err)
    }

    // ── Bookmarks ────────────────────────────────────────────────────────────

    #[wasm_bindgen(js_name = toggleBookmark)]
    pub fn toggle_bookmark(&self, id: &str) -> Result<bool, JsValue> {
        self.inner.borrow_mut().viewer.toggle_bookmark(id).map_err(js_err)
    }

    pub fn bookmarks(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().viewer.bookmarks())
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Detach listeners and withdraw the pending frame. Safe to call twice.
    pub fn destroy(&mut self) {
        self.listeners.clear();
        let mut inner = self.inner.borrow_mut();
        if !inner.viewer.is_closed() {
            inner.viewer.close();
            log::info!("grid detached");
        }
    }
}

impl AquaGrid {
    fn listen(
        inner: &Rc<RefCell<Inner>>,
        canvas: &HtmlCanvasElement,
        window: &web_sys::Window,
    ) -> Result<Vec<ListenerGuard>, JsValue> {
        let target: &web_sys::EventTarget = canvas.as_ref();
        let mut out = Vec::new();

        let st = Rc::clone(inner);
        out.push(ListenerGuard::attach(target, "pointerdown", true, move |e: Event| {
            let Some(e) = e.dyn_ref::<PointerEvent>() else { return };
            let mut st = st.borrow_mut();
            let (x, y) = st.device_point(e);
            let fx = st.viewer.pointer_down(x, y);
            st.apply(fx, Some(e.pointer_id()));
        })?);

        let st = Rc::clone(inner);
        out.push(ListenerGuard::attach(target, "pointermove", true, move |e: Event| {
            let Some(e) = e.dyn_ref::<PointerEvent>() else { return };
            let mut st = st.borrow_mut();
            let (x, y) = st.device_point(e);
            let fx = st.viewer.pointer_move(x, y);
            st.apply(fx, Some(e.pointer_id()));
        })?);

        for kind in ["pointerup", "pointercancel"] {
            let st = Rc::clone(inner);
            out.push(ListenerGuard::attach(target, kind, true, move |e: Event| {
                let Some(e) = e.dyn_ref::<PointerEvent>() else { return };
                let mut st = st.borrow_mut();
                let (x, y) = st.device_point(e);
                let fx = st.viewer.pointer_up(x, y);
                st.apply(fx, Some(e.pointer_id()));
            })?);
        }

        let st = Rc::clone(inner);
        out.push(ListenerGuard::attach(target, "pointerleave", true, move |_e: Event| {
            let mut st = st.borrow_mut();
            let fx = st.viewer.pointer_leave();
            st.apply(fx, None);
        })?);

        // Non-passive so the page does not scroll under the map.
        let st = Rc::clone(inner);
        out.push(ListenerGuard::attach(target, "wheel", false, move |e: Event| {
            let Some(e) = e.dyn_ref::<WheelEvent>() else { return };
            e.prevent_default();
            let mut st = st.borrow_mut();
            let (x, y) = st.device_point(e);
            let fx = st.viewer.wheel(x, y, e.delta_y());
            st.apply(fx, None);
        })?);

        let st = Rc::clone(inner);
        out.push(ListenerGuard::attach(target, "click", true, move |e: Event| {
            let Some(e) = e.dyn_ref::<MouseEvent>() else { return };
            let mut st = st.borrow_mut();
            let (x, y) = st.device_point(e);
            let fx = st.viewer.click(x, y);
            st.apply(fx, None);
        })?);

        let st = Rc::clone(inner);
        let win = window.clone();
        out.push(ListenerGuard::attach(window.as_ref(), "resize", true, move |_e: Event| {
            st.borrow_mut().refit(win.device_pixel_ratio());
        })?);

        Ok(out)
    }
}

impl Drop for AquaGrid {
    fn drop(&mut self) {
        self.destroy();
    }
}
