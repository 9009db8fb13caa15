//! `Surface` over a 2D canvas context, in device pixels.
use aquagrid_core::render::color::Color;
use aquagrid_core::render::surface::{Fill, Stroke, Surface};
use js_sys::Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Match the backing store to the element's CSS box times `dpr`.
    /// Returns the new size in device pixels.
    pub fn fit_to_element(&self, dpr: f64) -> (u32, u32) {
        let w = (self.canvas.client_width().max(0) as f64 * dpr).round() as u32;
        let h = (self.canvas.client_height().max(0) as f64 * dpr).round() as u32;
        if self.canvas.width() != w {
            self.canvas.set_width(w);
        }
        if self.canvas.height() != h {
            self.canvas.set_height(h);
        }
        (w, h)
    }

    fn trace(&self, points: &[(f64, f64)]) -> bool {
        let Some((&(x0, y0), rest)) = points.split_first() else {
            return false;
        };
        self.ctx.begin_path();
        self.ctx.move_to(x0, y0);
        for &(x, y) in rest {
            self.ctx.line_to(x, y);
        }
        true
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn clear(&mut self, color: Color) {
        let (w, h) = self.size();
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill_rect(0.0, 0.0, w as f64, h as f64);
    }

    fn fill_path(&mut self, points: &[(f64, f64)], fill: Fill) {
        if points.len() < 3 || !self.trace(points) {
            return;
        }
        self.ctx.close_path();
        self.ctx.set_global_alpha(fill.alpha);
        self.ctx.set_fill_style_str(&fill.color.css());
        self.ctx.fill();
    }

    fn stroke_path(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        if points.len() < 2 || !self.trace(points) {
            return;
        }
        self.ctx.set_global_alpha(stroke.alpha);
        self.ctx.set_stroke_style_str(&stroke.color.css());
        self.ctx.set_line_width(stroke.width);
        let dash = Array::new();
        if let Some([on, off]) = stroke.dash {
            dash.push(&on.into());
            dash.push(&off.into());
        }
        // An empty array resets to a solid line.
        let _ = self.ctx.set_line_dash(&dash);
        self.ctx.stroke();
    }
}
