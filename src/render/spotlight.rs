//! The spotlight mask: a dimmed surface with a cut-out around the cursor.
//!
//! Hard and soft edges go through one routine. The area outside the cut
//! radius `R` is dimmed; with a non-zero blur an edge band between
//! `inner = R * (1 - blur)` and `R` ramps from clear to the dim color. Circles
//! get an exact radial gradient for that band; every other shape gets
//! [`RING_STEPS`] concentric bands of linearly increasing alpha. A faint glow
//! is stroked just outside `R` so the edge stays visible over bright content.

use crate::geometry::{Point, Rect, Size};
use crate::paint::{Color, Frame, Outline, PaintOp};
use crate::render::shape;
use crate::settings::SpotlightShape;

/// Bands used to approximate a soft edge on non-circular shapes.
pub const RING_STEPS: usize = 12;

const GLOW_WIDTH: f64 = 2.0;
const GLOW_COLOR: Color = Color::rgba(1.0, 1.0, 1.0, 0.18);

/// Radii of the soft edge band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGeometry {
    pub inner_radius: f64,
    pub outer_radius: f64,
}

impl EdgeGeometry {
    /// Edge band for cut radius `radius` and blur fraction `edge_blur`.
    ///
    /// Negative or non-finite radii become 0; blur is clamped to `[0, 1]`
    /// with NaN treated as a hard edge.
    pub fn new(radius: f64, edge_blur: f64) -> Self {
        let outer = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let blur = if edge_blur.is_nan() {
            0.0
        } else {
            edge_blur.clamp(0.0, 1.0)
        };
        Self {
            inner_radius: outer * (1.0 - blur),
            outer_radius: outer,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.inner_radius >= self.outer_radius
    }
}

/// Everything needed to paint one surface's mask.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotlightParams {
    /// Cursor in surface-local coordinates; `None` dims the whole surface.
    pub center: Option<Point>,
    pub radius: f64,
    pub shape: SpotlightShape,
    pub dim_color: Color,
    pub dim_opacity: f64,
    pub edge_blur: f64,
}

/// Stateless painter for the spotlight mask.
#[derive(Debug, Clone)]
pub struct SpotlightRenderer {
    ring_steps: usize,
    glow: Color,
    glow_width: f64,
}

impl Default for SpotlightRenderer {
    fn default() -> Self {
        Self {
            ring_steps: RING_STEPS,
            glow: GLOW_COLOR,
            glow_width: GLOW_WIDTH,
        }
    }
}

impl SpotlightRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the number of bands used for non-circular soft edges.
    pub fn with_ring_steps(mut self, steps: usize) -> Self {
        self.ring_steps = steps.max(1);
        self
    }

    /// Paint ops for a surface of `size` (surface-local, origin bottom-left).
    pub fn paint(&self, size: Size, params: &SpotlightParams) -> Frame {
        let mut frame = Frame::new();
        let rect = Rect::from_size(size);
        let opacity = if params.dim_opacity.is_finite() {
            params.dim_opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let dim = params.dim_color.sanitized().with_alpha(opacity);

        let Some(center) = params.center.filter(Point::is_finite) else {
            frame.push(PaintOp::FillWithHole {
                rect,
                hole: None,
                color: dim,
            });
            return frame;
        };

        let edge = EdgeGeometry::new(params.radius, params.edge_blur);
        let cut = shape::outline(params.shape, center, edge.outer_radius);

        frame.push(PaintOp::FillWithHole {
            rect,
            hole: Some(cut.clone()),
            color: dim,
        });

        if !edge.is_hard() {
            self.soft_edge(&mut frame, params.shape, center, edge, dim);
        }

        if edge.outer_radius > 0.0 {
            frame.push(PaintOp::StrokeOutline {
                outline: shape::outline(
                    params.shape,
                    center,
                    edge.outer_radius + self.glow_width / 2.0,
                ),
                width: self.glow_width,
                color: self.glow,
            });
        }

        frame
    }

    fn soft_edge(
        &self,
        frame: &mut Frame,
        shape: SpotlightShape,
        center: Point,
        edge: EdgeGeometry,
        dim: Color,
    ) {
        if shape == SpotlightShape::Circle {
            frame.push(PaintOp::RadialGradientRing {
                center,
                inner_radius: edge.inner_radius,
                outer_radius: edge.outer_radius,
                inner_color: dim.with_alpha(0.0),
                outer_color: dim,
            });
            return;
        }

        let steps = self.ring_steps;
        let band = (edge.outer_radius - edge.inner_radius) / steps as f64;
        for i in 0..steps {
            let inner = edge.inner_radius + band * i as f64;
            let outer: Outline = shape::outline(shape, center, inner + band);
            frame.push(PaintOp::FillRing {
                outer,
                inner: shape::outline(shape, center, inner),
                color: dim.scale_alpha((i + 1) as f64 / steps as f64),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(shape: SpotlightShape, radius: f64, blur: f64) -> SpotlightParams {
        SpotlightParams {
            center: Some(Point::new(150.0, 150.0)),
            radius,
            shape,
            dim_color: Color::BLACK,
            dim_opacity: 0.6,
            edge_blur: blur,
        }
    }

    #[test]
    fn test_edge_geometry_boundaries() {
        let hard = EdgeGeometry::new(100.0, 0.0);
        assert_eq!(hard.inner_radius, 100.0);
        assert_eq!(hard.inner_radius, hard.outer_radius);
        assert!(hard.is_hard());

        let soft = EdgeGeometry::new(100.0, 0.5);
        assert_eq!(soft.inner_radius, 50.0);
        assert_eq!(soft.outer_radius, 100.0);

        assert_eq!(EdgeGeometry::new(100.0, 1.0).inner_radius, 0.0);
        assert_eq!(EdgeGeometry::new(100.0, 7.0).inner_radius, 0.0);
        assert_eq!(EdgeGeometry::new(100.0, f64::NAN).inner_radius, 100.0);
    }

    #[test]
    fn test_hard_circle_is_single_cut() {
        let frame = SpotlightRenderer::new().paint(
            Size::new(300.0, 300.0),
            &params(SpotlightShape::Circle, 100.0, 0.0),
        );
        assert_eq!(frame.len(), 2);
        match &frame.ops()[0] {
            PaintOp::FillWithHole {
                hole: Some(Outline::Circle { radius, .. }),
                color,
                ..
            } => {
                assert_eq!(*radius, 100.0);
                assert!((color.a - 0.6).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(frame.ops()[1], PaintOp::StrokeOutline { .. }));
    }

    #[test]
    fn test_soft_circle_uses_gradient() {
        let frame = SpotlightRenderer::new().paint(
            Size::new(300.0, 300.0),
            &params(SpotlightShape::Circle, 100.0, 0.5),
        );
        let gradient = frame.ops().iter().find_map(|op| match op {
            PaintOp::RadialGradientRing {
                inner_radius,
                outer_radius,
                inner_color,
                outer_color,
                ..
            } => Some((*inner_radius, *outer_radius, inner_color.a, outer_color.a)),
            _ => None,
        });
        let (inner, outer, inner_a, outer_a) = gradient.unwrap();
        assert_eq!((inner, outer), (50.0, 100.0));
        assert_eq!(inner_a, 0.0);
        assert!((outer_a - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_soft_star_uses_ring_steps_with_rising_alpha() {
        let frame = SpotlightRenderer::new().paint(
            Size::new(300.0, 300.0),
            &params(SpotlightShape::Star, 100.0, 0.3),
        );
        let alphas: Vec<f64> = frame
            .ops()
            .iter()
            .filter_map(|op| match op {
                PaintOp::FillRing { color, .. } => Some(color.a),
                _ => None,
            })
            .collect();
        assert_eq!(alphas.len(), RING_STEPS);
        assert!(alphas.windows(2).all(|w| w[1] > w[0]));
        assert!((alphas[RING_STEPS - 1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_ring_steps_override() {
        let frame = SpotlightRenderer::new().with_ring_steps(4).paint(
            Size::new(300.0, 300.0),
            &params(SpotlightShape::Square, 100.0, 0.5),
        );
        let rings = frame
            .ops()
            .iter()
            .filter(|op| matches!(op, PaintOp::FillRing { .. }))
            .count();
        assert_eq!(rings, 4);
    }

    #[test]
    fn test_degenerate_inputs_do_not_panic() {
        let renderer = SpotlightRenderer::new();
        for (radius, blur, opacity) in [
            (0.0, 0.5, 0.6),
            (f64::NAN, f64::NAN, f64::NAN),
            (-10.0, 2.0, -1.0),
            (f64::INFINITY, 0.5, 5.0),
        ] {
            for shape in [SpotlightShape::Circle, SpotlightShape::Cloud] {
                let mut p = params(shape, radius, blur);
                p.dim_opacity = opacity;
                let frame = renderer.paint(Size::new(10.0, 10.0), &p);
                assert!(!frame.is_empty());
            }
        }
    }

    #[test]
    fn test_no_cursor_dims_everything() {
        let mut p = params(SpotlightShape::Circle, 100.0, 0.0);
        p.center = None;
        let frame = SpotlightRenderer::new().paint(Size::new(10.0, 10.0), &p);
        assert!(matches!(
            &frame.ops()[..],
            [PaintOp::FillWithHole { hole: None, .. }]
        ));
    }
}
