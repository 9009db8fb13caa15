//! Planar projection and cell polygons.
//!
//! The view is a plain affine map from degrees to surface pixels:
//!   x =  lon · k + tx
//!   y = −lat · k + ty        (surface y grows downward)
//!
//! Cells are approximated as 3 km squares in lon/lat degrees, with the
//! longitude half-width widened by 1/cos(lat) so the square stays roughly
//! square on the ground.
use serde::{Deserialize, Serialize};

use crate::coords::{GeoBounds, INDIA_BOUNDS};

// ── Constants ────────────────────────────────────────────────────────────────

/// Edge length of one grid cell in kilometres.
pub const CELL_SIZE_KM: f64 = 3.0;
/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.0;
/// Floor on km per degree of longitude; keeps dLon finite near the poles.
pub const MIN_KM_PER_DEG_LON: f64 = 1e-6;
/// Padding (px) kept free on every side by [`fit_to_bounds`].
pub const FIT_PADDING_PX: f64 = 40.0;
/// Extra shrink applied on top of the aspect-preserving fit.
pub const FIT_MARGIN: f64 = 0.8;
/// Denominator guard in the ray-casting crossing test.
pub const PIP_EPSILON: f64 = 1e-9;

/// Closed cell ring as (lon, lat) vertices; the last vertex repeats the first.
pub type Ring = [(f64, f64); 5];

// ── View transform ───────────────────────────────────────────────────────────

/// Pan offset and scale of the current view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub tx: f64,
    pub ty: f64,
    /// Pixels per degree.
    pub k: f64,
}

impl Transform {
    pub fn new(tx: f64, ty: f64, k: f64) -> Self {
        Self { tx, ty, k }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self { tx: 0.0, ty: 0.0, k: 1.0 }
    }
}

#[inline]
pub fn project(lon: f64, lat: f64, t: &Transform) -> (f64, f64) {
    (lon * t.k + t.tx, -lat * t.k + t.ty)
}

/// Inverse of [`project`]: surface pixel → (lon, lat).
#[inline]
pub fn unproject(x: f64, y: f64, t: &Transform) -> (f64, f64) {
    ((x - t.tx) / t.k, -(y - t.ty) / t.k)
}

/// Fit the whole grid extent into a `width × height` viewport.
pub fn fit_to_bounds(width: f64, height: f64) -> Transform {
    fit_to_bounds_with(width, height, &INDIA_BOUNDS, FIT_PADDING_PX, FIT_MARGIN)
}

/// Centre `bounds` in the viewport minus `padding` on each side, scaled by
/// `min(sx, sy) · margin` so neither axis clips.
///
/// Viewports smaller than twice the padding collapse to a 1 px content box
/// rather than producing a non-positive scale.
pub fn fit_to_bounds_with(
    width: f64,
    height: f64,
    bounds: &GeoBounds,
    padding: f64,
    margin: f64,
) -> Transform {
    let w = (width - padding * 2.0).max(1.0);
    let h = (height - padding * 2.0).max(1.0);
    let lon_span = bounds.lon_span();
    let lat_span = bounds.lat_span();

    let sx = w / lon_span;
    let sy = h / lat_span;
    let k = sx.min(sy) * margin;

    let map_w = lon_span * k;
    let map_h = lat_span * k;
    let tx = padding + (w - map_w) / 2.0 - bounds.min_lon * k;
    let ty = padding + (h - map_h) / 2.0 + bounds.max_lat * k;
    Transform { tx, ty, k }
}

// ── Cell polygons ────────────────────────────────────────────────────────────

/// Half extents (dLon/2, dLat/2) in degrees of the cell centred at `lat`.
pub fn cell_half_extents(lat: f64) -> (f64, f64) {
    let d_lat = CELL_SIZE_KM / KM_PER_DEGREE;
    let km_per_deg_lon = KM_PER_DEGREE * lat.to_radians().cos();
    let d_lon = CELL_SIZE_KM / km_per_deg_lon.max(MIN_KM_PER_DEG_LON);
    (d_lon / 2.0, d_lat / 2.0)
}

/// Closed 5-vertex ring for the cell centred at (`lat`, `lon`), counter-clockwise
/// from the south-west corner.
pub fn rectangle_for_cell(lat: f64, lon: f64) -> Ring {
    let (half_lon, half_lat) = cell_half_extents(lat);
    [
        (lon - half_lon, lat - half_lat),
        (lon + half_lon, lat - half_lat),
        (lon + half_lon, lat + half_lat),
        (lon - half_lon, lat + half_lat),
        (lon - half_lon, lat - half_lat),
    ]
}

pub fn project_ring(ring: &Ring, t: &Transform) -> Ring {
    ring.map(|(lon, lat)| project(lon, lat, t))
}

/// (min_x, min_y, max_x, max_y) of a set of points.
pub fn bbox(points: &[(f64, f64)]) -> (f64, f64, f64, f64) {
    points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
    )
}

/// Even-odd ray casting: cast a horizontal ray to +x from the query point and
/// toggle on every edge it crosses.
pub fn point_in_polygon(px: f64, py: f64, poly: &[(f64, f64)]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        let crosses = (yi > py) != (yj > py)
            && px < (xj - xi) * (py - yi) / (yj - yi + PIP_EPSILON) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn transforms() -> Vec<Transform> {
        vec![
            Transform::default(),
            Transform::new(-1400.0, 820.0, 20.0),
            Transform::new(12.5, -3.25, 0.5),
            Transform::new(-3.9e4, 1.9e3, 50.0),
            fit_to_bounds(1280.0, 720.0),
        ]
    }

    #[test]
    fn unproject_inverts_project() {
        for t in transforms() {
            let mut lat = INDIA_BOUNDS.min_lat;
            while lat <= INDIA_BOUNDS.max_lat {
                let mut lon = INDIA_BOUNDS.min_lon;
                while lon <= INDIA_BOUNDS.max_lon {
                    let (x, y) = project(lon, lat, &t);
                    let (lon2, lat2) = unproject(x, y, &t);
                    assert_abs_diff_eq!(lon, lon2, epsilon = 1e-9);
                    assert_abs_diff_eq!(lat, lat2, epsilon = 1e-9);
                    lon += 1.75;
                }
                lat += 1.5;
            }
        }
    }

    #[test]
    fn fit_centres_bounds_in_viewport() {
        let (w, h) = (1200.0, 900.0);
        let t = fit_to_bounds(w, h);
        let (x0, y0) = project(INDIA_BOUNDS.min_lon, INDIA_BOUNDS.max_lat, &t);
        let (x1, y1) = project(INDIA_BOUNDS.max_lon, INDIA_BOUNDS.min_lat, &t);

        assert!(x0 >= FIT_PADDING_PX && y0 >= FIT_PADDING_PX);
        assert!(x1 <= w - FIT_PADDING_PX && y1 <= h - FIT_PADDING_PX);
        assert_abs_diff_eq!((x0 + x1) / 2.0, w / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!((y0 + y1) / 2.0, h / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn fit_preserves_aspect_using_smaller_axis() {
        let t = fit_to_bounds(2000.0, 500.0);
        let expected = (500.0 - 80.0) / INDIA_BOUNDS.lat_span() * FIT_MARGIN;
        assert_abs_diff_eq!(t.k, expected, epsilon = 1e-12);
    }

    #[test]
    fn fit_on_tiny_viewport_keeps_positive_scale() {
        let t = fit_to_bounds(10.0, 0.0);
        assert!(t.k > 0.0 && t.k.is_finite());
    }

    #[test]
    fn ring_is_closed_and_sized() {
        let ring = rectangle_for_cell(20.0, 78.0);
        assert_eq!(ring[0], ring[4]);
        let d_lat = ring[2].1 - ring[0].1;
        let d_lon = ring[1].0 - ring[0].0;
        assert_abs_diff_eq!(d_lat, 3.0 / 111.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d_lon, 3.0 / (111.0 * 20f64.to_radians().cos()), epsilon = 1e-12);
    }

    #[test]
    fn ring_near_pole_stays_finite() {
        let ring = rectangle_for_cell(90.0, 0.0);
        for (lon, lat) in ring {
            assert!(lon.is_finite() && lat.is_finite());
        }
    }

    #[test]
    fn own_centre_inside_neighbour_centre_outside() {
        let ring = rectangle_for_cell(20.0, 78.0);
        let (half_lon, _) = cell_half_extents(20.0);
        for t in transforms() {
            let poly = project_ring(&ring, &t);
            let (cx, cy) = project(78.0, 20.0, &t);
            assert!(point_in_polygon(cx, cy, &poly), "centre missed under {t:?}");

            let (ex, ey) = project(78.0 + half_lon * 2.0, 20.0, &t);
            assert!(!point_in_polygon(ex, ey, &poly), "east neighbour hit under {t:?}");
        }
    }

    #[test]
    fn degenerate_polygon_never_contains() {
        assert!(!point_in_polygon(0.0, 0.0, &[(0.0, 0.0), (1.0, 1.0)]));
    }

    #[test]
    fn bbox_spans_points() {
        let b = bbox(&[(1.0, 5.0), (-2.0, 3.0), (4.0, -1.0)]);
        assert_eq!(b, (-2.0, -1.0, 4.0, 5.0));
    }
}
