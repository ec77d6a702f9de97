//! Route drawing, independent of the terminal backend.
//!
//! The tracker stores route points in drawing-surface coordinates; this module
//! turns them into primitives on any [`DrawingSurface`].

use ratatui::style::Color;

use crate::session::RoutePoint;

/// Braille cells carry 2x4 dots, which is the terminal's "device pixel ratio".
pub const DOTS_PER_CELL_X: f64 = 2.0;
pub const DOTS_PER_CELL_Y: f64 = 4.0;

pub const ROUTE_COLOR: Color = Color::Rgb(0x4C, 0xAF, 0x50);
pub const CURRENT_COLOR: Color = Color::Rgb(0xF4, 0x43, 0x36);
pub const START_MARKER_RADIUS: f64 = 6.0;
pub const CURRENT_MARKER_RADIUS: f64 = 4.0;

/// Logical size of the drawing surface in dots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Surface for a terminal area of `cols` x `rows` cells.
    pub fn from_cells(cols: u16, rows: u16) -> Self {
        Self {
            width: f64::from(cols) * DOTS_PER_CELL_X,
            height: f64::from(rows) * DOTS_PER_CELL_Y,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_cells(80, 20)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
}

/// Opaque 2D drawing sink.
pub trait DrawingSurface {
    fn clear(&mut self);
    fn polyline(&mut self, points: &[(f64, f64)], style: StrokeStyle);
    fn marker(&mut self, at: (f64, f64), radius: f64, style: StrokeStyle);
}

/// Draw the recorded route: polyline in capture order, a start marker at the
/// origin and a current-position marker at the last point. Fewer than two
/// points leaves the surface blank.
pub fn render_route<S: DrawingSurface + ?Sized>(points: &[RoutePoint], surface: &mut S) {
    surface.clear();
    if points.len() < 2 {
        return;
    }

    let path: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    surface.polyline(&path, StrokeStyle { color: ROUTE_COLOR });

    surface.marker(
        path[0],
        START_MARKER_RADIUS,
        StrokeStyle { color: ROUTE_COLOR },
    );
    if let Some(last) = path.last() {
        surface.marker(
            *last,
            CURRENT_MARKER_RADIUS,
            StrokeStyle {
                color: CURRENT_COLOR,
            },
        );
    }
}

/// Axis-aligned bounds of a set of points, padded so markers stay visible.
pub fn route_bounds(points: &[RoutePoint], padding: f64) -> Option<([f64; 2], [f64; 2])> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in points.iter().skip(1) {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some((
        [min_x - padding, max_x + padding],
        [min_y - padding, max_y + padding],
    ))
}
