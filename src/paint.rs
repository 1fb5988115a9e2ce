//! Display list types shared by renderers and surfaces.
//!
//! Renderers never touch pixels. They describe a frame as an ordered list of
//! [`PaintOp`]s in surface-local coordinates (bottom-left origin, Y up), and
//! each [`OverlaySurface`](crate::surface::OverlaySurface) turns that list into
//! whatever its compositor understands. Ops are composited source-over in
//! list order.

use crate::geometry::{Point, Rect};

/// A straight-alpha RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn scale_alpha(self, factor: f64) -> Self {
        self.with_alpha(self.a * factor)
    }

    /// Linear interpolation, `t = 0` gives `self`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color::rgba(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Clamp every component into `[0, 1]`, replacing NaN with 0.
    pub fn sanitized(self) -> Color {
        let c = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Color::rgba(c(self.r), c(self.g), c(self.b), c(self.a))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// A closed shape boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Outline {
    Circle { center: Point, radius: f64 },
    /// Closed polygon; the last vertex connects back to the first.
    Polygon(Vec<Point>),
}

impl Outline {
    /// Even-odd containment test.
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Outline::Circle { center, radius } => point.distance_to(*center) < *radius,
            Outline::Polygon(vertices) => {
                let mut inside = false;
                let n = vertices.len();
                for i in 0..n {
                    let a = vertices[i];
                    let b = vertices[(i + n - 1) % n];
                    if (a.y > point.y) != (b.y > point.y) {
                        let cross_x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
                        if point.x < cross_x {
                            inside = !inside;
                        }
                    }
                }
                inside
            }
        }
    }

    /// Shortest distance from `point` to the boundary.
    pub fn distance_to_edge(&self, point: Point) -> f64 {
        match self {
            Outline::Circle { center, radius } => (point.distance_to(*center) - radius).abs(),
            Outline::Polygon(vertices) => {
                let n = vertices.len();
                (0..n)
                    .map(|i| segment_distance(point, vertices[i], vertices[(i + 1) % n]))
                    .fold(f64::INFINITY, f64::min)
            }
        }
    }
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(Point::new(a.x + t * dx, a.y + t * dy))
}

/// One drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    /// Reset the whole surface to fully transparent.
    Clear,
    /// Fill `rect`, leaving `hole` untouched (even-odd cut).
    FillWithHole {
        rect: Rect,
        hole: Option<Outline>,
        color: Color,
    },
    /// Circular band between two radii, colored by distance from the center.
    RadialGradientRing {
        center: Point,
        inner_radius: f64,
        outer_radius: f64,
        inner_color: Color,
        outer_color: Color,
    },
    /// The region inside `outer` but outside `inner`.
    FillRing {
        outer: Outline,
        inner: Outline,
        color: Color,
    },
    StrokeOutline {
        outline: Outline,
        width: f64,
        color: Color,
    },
    FillOutline {
        outline: Outline,
        color: Color,
    },
    /// A text label whose baseline is horizontally centered on `anchor`.
    Text {
        anchor: Point,
        text: String,
        size: f64,
        color: Color,
    },
}

/// An ordered list of paint ops for one surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    ops: Vec<PaintOp>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: PaintOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[PaintOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Extend<PaintOp> for Frame {
    fn extend<T: IntoIterator<Item = PaintOp>>(&mut self, iter: T) {
        self.ops.extend(iter);
    }
}
