//! Thematic overlays drawn over the risk base layer.
//!
//! Each kind is a pure function of one record. Banded layers stay in
//! 0.1-0.3 alpha so the risk colour underneath stays readable; the mining
//! layer marks only the cells next to a mine, and marks them heavily.
use serde::{Deserialize, Serialize};

use super::color::{Color, AMBER, EMERALD, RED};
use super::surface::{Fill, Stroke};
use crate::record::{CellRecord, LandUse};

const LAND_USE_ALPHA: f64 = 0.1;
const INDUSTRY_ALPHA: f64 = 0.3;
const INDUSTRY_WIDTH: f64 = 1.0;
const POPULATION_ALPHA: f64 = 0.12;
const RAINFALL_ALPHA: f64 = 0.12;
const MINING_ALPHA: f64 = 0.5;
/// Cells closer than this to a mine, km, are marked.
pub const MINING_RADIUS_KM: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayKind {
    LandUse,
    Industry,
    Population,
    Rainfall,
    Mining,
}

/// What an overlay puts on top of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayPaint {
    Fill(Fill),
    Outline(Stroke),
}

impl OverlayKind {
    /// Paint order, back to front.
    pub const ALL: [OverlayKind; 5] = [
        OverlayKind::LandUse,
        OverlayKind::Industry,
        OverlayKind::Population,
        OverlayKind::Rainfall,
        OverlayKind::Mining,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OverlayKind::LandUse => "Land use",
            OverlayKind::Industry => "Industrial proximity",
            OverlayKind::Population => "Population density",
            OverlayKind::Rainfall => "Rainfall",
            OverlayKind::Mining => "Mining areas",
        }
    }

    /// `None` when this layer leaves the cell untouched.
    pub fn paint(self, record: &CellRecord) -> Option<OverlayPaint> {
        let paint = match self {
            OverlayKind::LandUse => {
                OverlayPaint::Fill(Fill::new(land_use_color(&record.land_use), LAND_USE_ALPHA))
            }
            OverlayKind::Industry => OverlayPaint::Outline(
                Stroke::solid(industry_color(record.industrial_proximity), INDUSTRY_WIDTH)
                    .with_alpha(INDUSTRY_ALPHA),
            ),
            OverlayKind::Population => {
                OverlayPaint::Fill(Fill::new(population_color(record.population_density), POPULATION_ALPHA))
            }
            OverlayKind::Rainfall => {
                OverlayPaint::Fill(Fill::new(rainfall_color(record.rainfall), RAINFALL_ALPHA))
            }
            OverlayKind::Mining if record.mining_proximity < MINING_RADIUS_KM => {
                OverlayPaint::Fill(Fill::new(MINE_BROWN, MINING_ALPHA))
            }
            OverlayKind::Mining => return None,
        };
        Some(paint)
    }
}

const MINE_BROWN: Color = Color::rgb(120, 53, 15);

fn land_use_color(land_use: &LandUse) -> Color {
    match land_use {
        LandUse::Urban => Color::hex(0x3b82f6),
        LandUse::Industrial => Color::hex(0x06b6d4),
        LandUse::Agri => Color::hex(0x22c55e),
        LandUse::Mixed => Color::hex(0xf59e0b),
        LandUse::Forest | LandUse::Other(_) => Color::hex(0x94a3b8),
    }
}

/// Distance bands in km; nearer industry reads hotter.
fn industry_color(km: f64) -> Color {
    if km >= 100.0 {
        Color::hex(0x22c55e)
    } else if km >= 50.0 {
        Color::hex(0xfacc15)
    } else if km >= 10.0 {
        Color::hex(0xf97316)
    } else {
        RED
    }
}

fn population_color(density: f64) -> Color {
    if density >= 20_000.0 {
        RED
    } else if density >= 5_000.0 {
        AMBER
    } else {
        EMERALD
    }
}

/// Annual rainfall in mm.
fn rainfall_color(mm: f64) -> Color {
    if mm >= 2_000.0 {
        Color::hex(0x1d4ed8)
    } else if mm >= 1_000.0 {
        Color::hex(0x3b82f6)
    } else {
        Color::hex(0x93c5fd)
    }
}

// ── Toggles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerToggles {
    pub land_use: bool,
    pub industry: bool,
    pub population: bool,
    pub rainfall: bool,
    pub mining: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self { land_use: true, industry: true, population: true, rainfall: false, mining: false }
    }
}

impl LayerToggles {
    pub fn none() -> Self {
        Self { land_use: false, industry: false, population: false, rainfall: false, mining: false }
    }

    pub fn is_enabled(&self, kind: OverlayKind) -> bool {
        match kind {
            OverlayKind::LandUse => self.land_use,
            OverlayKind::Industry => self.industry,
            OverlayKind::Population => self.population,
            OverlayKind::Rainfall => self.rainfall,
            OverlayKind::Mining => self.mining,
        }
    }

    pub fn set(&mut self, kind: OverlayKind, on: bool) {
        let slot = match kind {
            OverlayKind::LandUse => &mut self.land_use,
            OverlayKind::Industry => &mut self.industry,
            OverlayKind::Population => &mut self.population,
            OverlayKind::Rainfall => &mut self.rainfall,
            OverlayKind::Mining => &mut self.mining,
        };
        *slot = on;
    }

    /// Flip one layer; returns its new state.
    pub fn toggle(&mut self, kind: OverlayKind) -> bool {
        let on = !self.is_enabled(kind);
        self.set(kind, on);
        on
    }

    pub fn enabled(&self) -> impl Iterator<Item = OverlayKind> + '_ {
        OverlayKind::ALL.into_iter().filter(|k| self.is_enabled(*k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_of(paint: OverlayPaint) -> f64 {
        match paint {
            OverlayPaint::Fill(f) => f.alpha,
            OverlayPaint::Outline(s) => s.alpha,
        }
    }

    #[test]
    fn banded_overlays_stay_translucent() {
        let mut rec = CellRecord::new("o", 20.0, 78.0);
        rec.land_use = LandUse::Other("Wetland".into());
        rec.rainfall = 2500.0;
        for kind in OverlayKind::ALL.into_iter().filter(|k| *k != OverlayKind::Mining) {
            let a = alpha_of(kind.paint(&rec).unwrap());
            assert!((0.1..=0.3).contains(&a), "{kind:?} alpha {a}");
        }
    }

    #[test]
    fn mining_marks_only_cells_near_a_mine() {
        let mut rec = CellRecord::new("m", 23.8, 86.4);
        rec.mining_proximity = 2.9;
        assert_eq!(
            OverlayKind::Mining.paint(&rec),
            Some(OverlayPaint::Fill(Fill::new(Color::rgb(120, 53, 15), 0.5)))
        );
        rec.mining_proximity = MINING_RADIUS_KM;
        assert_eq!(OverlayKind::Mining.paint(&rec), None);
        rec.mining_proximity = 40.0;
        assert_eq!(OverlayKind::Mining.paint(&rec), None);
    }

    #[test]
    fn industry_is_an_outline_banded_by_distance() {
        let mut rec = CellRecord::new("i", 20.0, 78.0);
        let mut colour_at = |km: f64| {
            rec.industrial_proximity = km;
            match OverlayKind::Industry.paint(&rec) {
                Some(OverlayPaint::Outline(s)) => s.color,
                other => panic!("industry overlay should outline, got {other:?}"),
            }
        };
        assert_eq!(colour_at(2.0), RED);
        assert_eq!(colour_at(10.0), Color::hex(0xf97316));
        assert_eq!(colour_at(75.0), Color::hex(0xfacc15));
        assert_eq!(colour_at(100.0), Color::hex(0x22c55e));
    }

    #[test]
    fn population_and_rainfall_thresholds() {
        assert_eq!(population_color(20_000.0), RED);
        assert_eq!(population_color(5_000.0), AMBER);
        assert_eq!(population_color(4_999.0), EMERALD);
        assert_eq!(rainfall_color(999.0), Color::hex(0x93c5fd));
        assert_eq!(rainfall_color(1_000.0), Color::hex(0x3b82f6));
    }

    #[test]
    fn toggles_default_and_flip() {
        let mut t = LayerToggles::default();
        assert_eq!(
            t.enabled().collect::<Vec<_>>(),
            vec![OverlayKind::LandUse, OverlayKind::Industry, OverlayKind::Population]
        );
        assert!(t.toggle(OverlayKind::Rainfall));
        assert!(!t.toggle(OverlayKind::LandUse));
        assert_eq!(t.enabled().last(), Some(OverlayKind::Rainfall));
        assert_eq!(LayerToggles::none().enabled().count(), 0);
    }

    #[test]
    fn toggles_read_partial_json() {
        let t: LayerToggles = serde_json::from_str(r#"{"rainfall": true, "landUse": false}"#).unwrap();
        assert!(t.rainfall && !t.land_use && t.industry && t.population && !t.mining);
        let t: LayerToggles = serde_json::from_str(r#"{"mining": true}"#).unwrap();
        assert!(t.is_enabled(OverlayKind::Mining));
    }
}
