//! Distance and projection helpers for position samples.
//!
//! Distances are always meters. Projection maps a position onto the drawing
//! surface relative to the session origin, using screen orientation (y grows
//! downwards).

use serde::{Deserialize, Serialize};

use crate::render::Viewport;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Scale applied to a latitude/longitude delta (in degrees) by the local
/// projection. This is the Earth radius applied directly to degrees, so it is
/// a display heuristic rather than a metric conversion.
pub const DEGREES_TO_METERS: f64 = EARTH_RADIUS_M;

/// Divisor turning projected meters into drawing-surface pixels.
pub const METERS_PER_PIXEL: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A raw position reading. Geographic positions come from a receiver,
/// planar ones are meters in a local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Geographic(GeoCoord),
    Planar { x: f64, y: f64 },
}

impl Position {
    pub fn geographic(lat: f64, lon: f64) -> Self {
        Position::Geographic(GeoCoord::new(lat, lon))
    }

    pub fn planar(x: f64, y: f64) -> Self {
        Position::Planar { x, y }
    }

    pub fn as_geo(&self) -> Option<GeoCoord> {
        match self {
            Position::Geographic(c) => Some(*c),
            Position::Planar { .. } => None,
        }
    }
}

/// Great-circle distance in meters between two coordinates given in degrees.
pub fn distance_between(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` slightly outside [0, 1] near antipodes
    let a = a.clamp(0.0, 1.0);

    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn planar_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// Distance between two positions of the same kind, `None` when they differ.
pub fn position_distance(a: &Position, b: &Position) -> Option<f64> {
    match (a, b) {
        (Position::Geographic(p), Position::Geographic(q)) => {
            Some(distance_between(p.lat, p.lon, q.lat, q.lon))
        }
        (Position::Planar { x: x1, y: y1 }, Position::Planar { x: x2, y: y2 }) => {
            Some(planar_distance(*x1, *y1, *x2, *y2))
        }
        _ => None,
    }
}

/// Equirectangular projection of `coord` around `origin`, centred on the surface.
///
/// Only meaningful for spans of a few tens of kilometres.
pub fn project(coord: GeoCoord, origin: GeoCoord, surface: &Viewport) -> (f64, f64) {
    let mean_lat = ((coord.lat + origin.lat) / 2.0).to_radians();
    let x = DEGREES_TO_METERS * (coord.lon - origin.lon) * mean_lat.cos();
    let y = DEGREES_TO_METERS * (coord.lat - origin.lat);
    to_surface(x, y, surface)
}

/// Projection for planar meters, sharing the pixel scale of [`project`].
pub fn project_planar(x: f64, y: f64, origin: (f64, f64), surface: &Viewport) -> (f64, f64) {
    to_surface(x - origin.0, y - origin.1, surface)
}

/// Project any position against an origin of the same kind.
pub fn project_position(
    position: &Position,
    origin: &Position,
    surface: &Viewport,
) -> Option<(f64, f64)> {
    match (position, origin) {
        (Position::Geographic(c), Position::Geographic(o)) => Some(project(*c, *o, surface)),
        (Position::Planar { x, y }, Position::Planar { x: ox, y: oy }) => {
            Some(project_planar(*x, *y, (*ox, *oy), surface))
        }
        _ => None,
    }
}

fn to_surface(x_m: f64, y_m: f64, surface: &Viewport) -> (f64, f64) {
    (
        x_m / METERS_PER_PIXEL + surface.width / 2.0,
        surface.height / 2.0 - y_m / METERS_PER_PIXEL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Viewport {
        Viewport::new(200.0, 100.0)
    }

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert_eq!(distance_between(51.5, -0.12, 51.5, -0.12), 0.0);
        assert_eq!(distance_between(0.0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (51.5074, -0.1278, 48.8566, 2.3522),
            (-33.86, 151.2, 40.71, -74.0),
            (0.0, 179.9, 0.0, -179.9),
        ];
        for (a, b, c, d) in pairs {
            assert_eq!(distance_between(a, b, c, d), distance_between(c, d, a, b));
        }
    }

    #[test]
    fn london_to_paris() {
        let d = distance_between(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 343_560.0).abs() < 1_000.0, "got {d}");
    }

    #[test]
    fn antipodal_points_are_finite() {
        let d = distance_between(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);

        let d = distance_between(90.0, 0.0, -90.0, 0.0);
        assert!(d.is_finite());

        let d = distance_between(45.0, 10.0, -45.0, -170.0);
        assert!(!d.is_nan());
    }

    #[test]
    fn tiny_separation_is_not_nan() {
        let d = distance_between(10.0, 10.0, 10.0 + 1e-12, 10.0);
        assert!(d >= 0.0 && d < 1e-3);
    }

    #[test]
    fn one_thousandth_degree_of_latitude() {
        let d = distance_between(0.0, 0.0, 0.001, 0.0);
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn planar_distance_is_euclidean() {
        assert_eq!(planar_distance(0.0, 0.0, 3.0, 4.0), 5.0);
    }

    #[test]
    fn mixed_positions_have_no_distance() {
        let a = Position::geographic(0.0, 0.0);
        let b = Position::planar(1.0, 1.0);
        assert_eq!(position_distance(&a, &b), None);
        assert_eq!(project_position(&a, &b, &surface()), None);
    }

    #[test]
    fn origin_projects_to_surface_centre() {
        let origin = GeoCoord::new(51.5, -0.12);
        assert_eq!(project(origin, origin, &surface()), (100.0, 50.0));
        assert_eq!(project_planar(7.0, 3.0, (7.0, 3.0), &surface()), (100.0, 50.0));
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let origin = GeoCoord::new(0.0, 0.0);
        let (_, y) = project(GeoCoord::new(0.0001, 0.0), origin, &surface());
        assert!(y < 50.0);
        let (x, _) = project(GeoCoord::new(0.0, 0.0001), origin, &surface());
        assert!(x > 100.0);
    }

    #[test]
    fn projection_keeps_heuristic_scale() {
        let origin = GeoCoord::new(0.0, 0.0);
        let (_, y) = project(GeoCoord::new(0.001, 0.0), origin, &surface());
        let expected = 50.0 - DEGREES_TO_METERS * 0.001 / METERS_PER_PIXEL;
        assert!((y - expected).abs() < 1e-9);
    }

    #[test]
    fn planar_projection_uses_pixel_divisor() {
        let (x, y) = project_planar(20.0, 10.0, (0.0, 0.0), &surface());
        assert_eq!((x, y), (102.0, 49.0));
    }
}
