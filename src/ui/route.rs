use itertools::Itertools;
use ratatui::{
    style::Color,
    widgets::canvas::{Circle, Context, Line, Points},
};

use crate::render::{route_bounds, DrawingSurface, StrokeStyle, Viewport, START_MARKER_RADIUS};
use crate::session::RoutePoint;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Polyline { points: Vec<(f64, f64)>, color: Color },
    Marker { at: (f64, f64), radius: f64, color: Color },
}

/// Collects route primitives in surface coordinates (y down) and paints them
/// on a ratatui canvas (y up).
#[derive(Debug, Default, Clone)]
pub struct ShapeBuffer {
    shapes: Vec<Shape>,
}

impl ShapeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn paint(&self, ctx: &mut Context) {
        for shape in &self.shapes {
            match shape {
                Shape::Polyline { points, color } => {
                    for ((x1, y1), (x2, y2)) in points.iter().copied().tuple_windows() {
                        ctx.draw(&Line {
                            x1,
                            y1: -y1,
                            x2,
                            y2: -y2,
                            color: *color,
                        });
                    }
                }
                Shape::Marker { at, radius, color } => {
                    let (x, y) = (at.0, -at.1);
                    // filled: concentric rings down to the centre dot
                    let mut r = *radius;
                    while r >= 1.0 {
                        ctx.draw(&Circle {
                            x,
                            y,
                            radius: r,
                            color: *color,
                        });
                        r -= 1.0;
                    }
                    ctx.draw(&Points {
                        coords: &[(x, y)],
                        color: *color,
                    });
                }
            }
        }
    }
}

impl DrawingSurface for ShapeBuffer {
    fn clear(&mut self) {
        self.shapes.clear();
    }

    fn polyline(&mut self, points: &[(f64, f64)], style: StrokeStyle) {
        self.shapes.push(Shape::Polyline {
            points: points.to_vec(),
            color: style.color,
        });
    }

    fn marker(&mut self, at: (f64, f64), radius: f64, style: StrokeStyle) {
        self.shapes.push(Shape::Marker {
            at,
            radius,
            color: style.color,
        });
    }
}

/// Canvas x and y bounds. The fixed view shows the whole drawing surface;
/// the fitted view zooms onto the route.
pub fn canvas_bounds(surface: Viewport, route: &[RoutePoint], fit: bool) -> ([f64; 2], [f64; 2]) {
    let fixed = ([0.0, surface.width], [-surface.height, 0.0]);
    if !fit || route.len() < 2 {
        return fixed;
    }
    match route_bounds(route, START_MARKER_RADIUS * 2.0) {
        Some((x, y)) => (x, [-y[1], -y[0]]),
        None => fixed,
    }
}
