use super::color::Color;

/// Solid fill at partial opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub color: Color,
    /// 0-1.
    pub alpha: f64,
}

impl Fill {
    pub fn new(color: Color, alpha: f64) -> Self {
        Self { color, alpha }
    }
}

/// Outline style. `dash` is an (on, off) length pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub alpha: f64,
    pub width: f64,
    pub dash: Option<[f64; 2]>,
}

impl Stroke {
    pub fn solid(color: Color, width: f64) -> Self {
        Self { color, alpha: 1.0, width, dash: None }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn dashed(mut self, on: f64, off: f64) -> Self {
        self.dash = Some([on, off]);
        self
    }
}

/// A 2D raster target in device pixels, origin top-left.
///
/// Fills treat a path as a closed polygon. Strokes follow the points as
/// given, so outlines pass rings whose last vertex repeats the first.
pub trait Surface {
    /// (width, height) in device pixels.
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, color: Color);

    fn fill_path(&mut self, points: &[(f64, f64)], fill: Fill);

    fn stroke_path(&mut self, points: &[(f64, f64)], stroke: &Stroke);
}
