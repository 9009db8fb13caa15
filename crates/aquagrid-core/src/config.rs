//! Host-tunable viewer settings.
//!
//! Risk weights are deliberately absent; they live as constants in `risk`.
use serde::{Deserialize, Serialize};

use crate::geometry::{FIT_MARGIN, FIT_PADDING_PX};
use crate::render::overlay::LayerToggles;

/// Viewer settings, read from JSON. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Pixels kept clear around the bounding box when fitting. Default 40.
    pub fit_padding: f64,
    /// 0-1, default 0.8. Shrinks the fitted scale so the box never touches the edge.
    pub fit_margin: f64,
    /// Default 0.5.
    pub min_zoom: f64,
    /// Default 50.
    pub max_zoom: f64,
    /// Exponent per wheel delta unit. Default 0.001.
    pub wheel_sensitivity: f64,
    /// 0-1, default 0.7. Opacity of the risk fill.
    pub cell_alpha: f64,
    pub cell_outline_width: f64,
    pub boundary_width: f64,
    pub hover_width: f64,
    pub compare_width: f64,
    /// Pointer travel in px past which a press is a drag, not a click. Default 3.
    pub click_slop: f64,
    /// Cells held in compare mode. Default 2.
    pub compare_capacity: usize,
    pub layers: LayerToggles,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fit_padding: FIT_PADDING_PX,
            fit_margin: FIT_MARGIN,
            min_zoom: 0.5,
            max_zoom: 50.0,
            wheel_sensitivity: 0.001,
            cell_alpha: 0.7,
            cell_outline_width: 0.5,
            boundary_width: 2.0,
            hover_width: 3.0,
            compare_width: 2.0,
            click_slop: 3.0,
            compare_capacity: 2,
            layers: LayerToggles::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(text).map(Self::sanitized)
    }

    /// Repair values that would break the zoom clamp or the fit.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let positive = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };

        self.min_zoom = positive(self.min_zoom, defaults.min_zoom);
        self.max_zoom = positive(self.max_zoom, defaults.max_zoom);
        if self.min_zoom > self.max_zoom {
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        self.fit_margin = positive(self.fit_margin, defaults.fit_margin);
        self.wheel_sensitivity = positive(self.wheel_sensitivity, defaults.wheel_sensitivity);
        if !self.fit_padding.is_finite() || self.fit_padding < 0.0 {
            self.fit_padding = defaults.fit_padding;
        }
        if !self.click_slop.is_finite() || self.click_slop < 0.0 {
            self.click_slop = defaults.click_slop;
        }
        self.cell_alpha = if self.cell_alpha.is_finite() { self.cell_alpha.clamp(0.0, 1.0) } else { defaults.cell_alpha };
        self.compare_capacity = self.compare_capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(ViewerConfig::from_json("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_json_overrides_named_fields() {
        let cfg = ViewerConfig::from_json(r#"{"maxZoom": 20, "layers": {"rainfall": true}}"#).unwrap();
        assert_eq!(cfg.max_zoom, 20.0);
        assert_eq!(cfg.min_zoom, 0.5);
        assert!(cfg.layers.rainfall && cfg.layers.land_use);
    }

    #[test]
    fn inverted_and_invalid_values_are_repaired() {
        let cfg = ViewerConfig::from_json(r#"{"minZoom": 10, "maxZoom": 2, "wheelSensitivity": -1, "compareCapacity": 0}"#)
            .unwrap();
        assert_eq!((cfg.min_zoom, cfg.max_zoom), (2.0, 10.0));
        assert_eq!(cfg.wheel_sensitivity, 0.001);
        assert_eq!(cfg.compare_capacity, 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json("{maxZoom:").is_err());
    }
}
