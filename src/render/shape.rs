//! Spotlight outlines.
//!
//! Every shape is scaled so that `radius` is its circumradius: the shape just
//! touches a circle of that radius. Polygons are emitted counter-clockwise in
//! Y-up coordinates.

use crate::geometry::Point;
use crate::paint::Outline;
use crate::settings::SpotlightShape;
use std::f64::consts::{FRAC_PI_2, TAU};

/// Vertices sampled around the cloud outline.
pub const CLOUD_SAMPLES: usize = 72;
const CLOUD_LOBES: f64 = 6.0;
const STAR_POINTS: usize = 5;
const STAR_INNER_RATIO: f64 = 0.45;

fn polar(center: Point, radius: f64, angle: f64) -> Point {
    Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

fn regular(center: Point, radius: f64, sides: usize, start: f64) -> Vec<Point> {
    (0..sides)
        .map(|i| polar(center, radius, start + TAU * i as f64 / sides as f64))
        .collect()
}

/// Outline of `shape` around `center`. Non-finite or negative radii collapse
/// to an empty circle.
pub fn outline(shape: SpotlightShape, center: Point, radius: f64) -> Outline {
    let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
    if radius == 0.0 || !center.is_finite() {
        return Outline::Circle { center, radius: 0.0 };
    }

    match shape {
        SpotlightShape::Circle => Outline::Circle { center, radius },
        SpotlightShape::Square => Outline::Polygon(regular(center, radius, 4, FRAC_PI_2 / 2.0)),
        SpotlightShape::Triangle => Outline::Polygon(regular(center, radius, 3, FRAC_PI_2)),
        SpotlightShape::Star => Outline::Polygon(
            (0..STAR_POINTS * 2)
                .map(|i| {
                    let r = if i % 2 == 0 {
                        radius
                    } else {
                        radius * STAR_INNER_RATIO
                    };
                    polar(center, r, FRAC_PI_2 + TAU * i as f64 / (STAR_POINTS * 2) as f64)
                })
                .collect(),
        ),
        SpotlightShape::Trapezoid => {
            // Wide base, narrower top, corners on the circumcircle.
            let bottom = (-0.6f64).asin();
            let top = 0.6f64.asin();
            let wide = radius * bottom.cos();
            let narrow = radius * 0.55;
            let (y_low, y_high) = (radius * bottom.sin(), radius * top.sin());
            Outline::Polygon(vec![
                Point::new(center.x - wide, center.y + y_low),
                Point::new(center.x + wide, center.y + y_low),
                Point::new(center.x + narrow, center.y + y_high),
                Point::new(center.x - narrow, center.y + y_high),
            ])
        }
        SpotlightShape::Cloud => Outline::Polygon(
            (0..CLOUD_SAMPLES)
                .map(|i| {
                    let angle = TAU * i as f64 / CLOUD_SAMPLES as f64;
                    let bulge = (angle * CLOUD_LOBES / 2.0).cos().abs();
                    polar(center, radius * (0.78 + 0.22 * bulge), angle)
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SpotlightShape; 6] = [
        SpotlightShape::Circle,
        SpotlightShape::Square,
        SpotlightShape::Triangle,
        SpotlightShape::Star,
        SpotlightShape::Trapezoid,
        SpotlightShape::Cloud,
    ];

    fn max_extent(outline: &Outline, center: Point) -> f64 {
        match outline {
            Outline::Circle { radius, .. } => *radius,
            Outline::Polygon(points) => points
                .iter()
                .map(|p| p.distance_to(center))
                .fold(0.0, f64::max),
        }
    }

    #[test]
    fn test_shapes_fit_their_radius() {
        let center = Point::new(200.0, 150.0);
        for shape in ALL {
            let o = outline(shape, center, 80.0);
            assert!(max_extent(&o, center) <= 80.0 + 1e-9, "{shape:?}");
            assert!(max_extent(&o, center) > 79.0, "{shape:?}");
            assert!(o.contains(center), "{shape:?} does not contain its center");
        }
    }

    #[test]
    fn test_star_and_cloud_vertex_counts() {
        let center = Point::ORIGIN;
        match outline(SpotlightShape::Star, center, 10.0) {
            Outline::Polygon(points) => assert_eq!(points.len(), 10),
            other => panic!("unexpected {other:?}"),
        }
        match outline(SpotlightShape::Cloud, center, 10.0) {
            Outline::Polygon(points) => assert_eq!(points.len(), CLOUD_SAMPLES),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_radius() {
        for radius in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            for shape in ALL {
                assert_eq!(
                    outline(shape, Point::ORIGIN, radius),
                    Outline::Circle {
                        center: Point::ORIGIN,
                        radius: 0.0
                    }
                );
            }
        }
    }
}
