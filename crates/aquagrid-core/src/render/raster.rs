//! Software raster target over an RGBA image.
//!
//! Fills are even-odd scanline conversions sampled at pixel centres; strokes
//! are expanded into square-capped quads and filled. No anti-aliasing, so
//! the output is bit-for-bit reproducible.
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};

use super::color::Color;
use super::surface::{Fill, Stroke, Surface};
use crate::error::RenderError;
use crate::geometry::bbox;

pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    /// Transparent surface. Zero-sized surfaces are valid and ignore drawing.
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        if self.image.width() == 0 || self.image.height() == 0 {
            return Err(RenderError::InvalidSize {
                width: self.image.width(),
                height: self.image.height(),
            });
        }
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    /// Source-over blend of `color` at `alpha` into one pixel.
    fn blend(&mut self, x: u32, y: u32, color: Color, alpha: f64) {
        let dst = self.image.get_pixel_mut(x, y);
        let [r, g, b, a] = dst.0;
        let mix = |s: u8, d: u8| (s as f64 * alpha + d as f64 * (1.0 - alpha)).round() as u8;
        let out_a = (255.0 * alpha + a as f64 * (1.0 - alpha)).round() as u8;
        *dst = Rgba([mix(color.r, r), mix(color.g, g), mix(color.b, b), out_a]);
    }

    fn fill_segment(&mut self, a: (f64, f64), b: (f64, f64), half: f64, fill: Fill) {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len = dx.hypot(dy);
        if len == 0.0 || !len.is_finite() {
            return;
        }
        // Unit direction scaled to the half width, and its normal.
        let (ux, uy) = (dx / len * half, dy / len * half);
        let (nx, ny) = (-uy, ux);
        let (a, b) = ((a.0 - ux, a.1 - uy), (b.0 + ux, b.1 + uy));
        let quad = [
            (a.0 + nx, a.1 + ny),
            (b.0 + nx, b.1 + ny),
            (b.0 - nx, b.1 - ny),
            (a.0 - nx, a.1 - ny),
            (a.0 + nx, a.1 + ny),
        ];
        self.fill_path(&quad, fill);
    }
}

impl Surface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self, color: Color) {
        let px = Rgba([color.r, color.g, color.b, 255]);
        for p in self.image.pixels_mut() {
            *p = px;
        }
    }

    fn fill_path(&mut self, points: &[(f64, f64)], fill: Fill) {
        let alpha = fill.alpha.clamp(0.0, 1.0);
        let (w, h) = self.size();
        if points.len() < 3 || alpha == 0.0 || w == 0 || h == 0 {
            return;
        }
        let (_, min_y, _, max_y) = bbox(points);
        if !min_y.is_finite() || !max_y.is_finite() {
            return;
        }

        // Rows whose centre lies inside [min_y, max_y].
        let first_row = (min_y - 0.5).ceil().max(0.0);
        let last_row = (max_y - 0.5).floor().min(h as f64 - 1.0);
        if last_row < first_row {
            return;
        }

        let mut xs: Vec<f64> = Vec::with_capacity(8);
        for row in first_row as u32..=last_row as u32 {
            let yc = row as f64 + 0.5;
            xs.clear();
            let mut j = points.len() - 1;
            for i in 0..points.len() {
                let (xi, yi) = points[i];
                let (xj, yj) = points[j];
                if (yi > yc) != (yj > yc) {
                    xs.push(xi + (yc - yi) * (xj - xi) / (yj - yi));
                }
                j = i;
            }
            xs.sort_by(f64::total_cmp);

            for span in xs.chunks_exact(2) {
                // Pixel centres in [span[0], span[1]).
                let first_col = (span[0] - 0.5).ceil().max(0.0);
                let last_col = ((span[1] - 0.5).ceil() - 1.0).min(w as f64 - 1.0);
                if last_col < first_col {
                    continue;
                }
                for col in first_col as u32..=last_col as u32 {
                    self.blend(col, row, fill.color, alpha);
                }
            }
        }
    }

    /// Widths under one pixel are drawn one pixel wide.
    fn stroke_path(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        if points.len() < 2 || stroke.alpha <= 0.0 {
            return;
        }
        let half = stroke.width.max(1.0) / 2.0;
        let fill = Fill::new(stroke.color, stroke.alpha);
        let mut dash = stroke
            .dash
            .filter(|&[on, off]| on > 0.0 && off >= 0.0)
            .map(DashCursor::new);

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match dash.as_mut() {
                None => self.fill_segment(a, b, half, fill),
                Some(cursor) => {
                    for (s, e) in cursor.split(a, b) {
                        self.fill_segment(s, e, half, fill);
                    }
                }
            }
        }
    }
}

/// Walks a dash pattern along consecutive segments, carrying the phase over.
struct DashCursor {
    pattern: [f64; 2],
    on: bool,
    remaining: f64,
}

impl DashCursor {
    fn new(pattern: [f64; 2]) -> Self {
        Self { pattern, on: true, remaining: pattern[0] }
    }

    fn split(&mut self, a: (f64, f64), b: (f64, f64)) -> Vec<((f64, f64), (f64, f64))> {
        let len = (b.0 - a.0).hypot(b.1 - a.1);
        let at = |t: f64| (a.0 + (b.0 - a.0) * t / len, a.1 + (b.1 - a.1) * t / len);
        let mut out = Vec::new();
        if len == 0.0 || !len.is_finite() {
            return out;
        }
        let mut t = 0.0;
        while t < len {
            let step = self.remaining.min(len - t);
            if self.on && step > 0.0 {
                out.push((at(t), at(t + step)));
            }
            t += step;
            self.remaining -= step;
            if self.remaining <= 0.0 {
                self.on = !self.on;
                self.remaining = if self.on { self.pattern[0] } else { self.pattern[1] };
            }
        }
        out
    }
}
