//! Click ripples and keystroke labels.
//!
//! An [`EffectLayer`] is the context the engine's
//! [`EffectAnimator`](crate::animation::EffectAnimator) drives: each running
//! animation owns one [`EffectMark`], updates its progress from the draw
//! callback and removes it from the completion callback. Painting reads the
//! marks and knows nothing about animations.

use crate::coords::virtual_desktop_to_surface_local;
use crate::geometry::{Point, Rect};
use crate::paint::{Color, Frame, Outline, PaintOp};
use std::collections::BTreeMap;

pub const RIPPLE_START_RADIUS: f64 = 10.0;
pub const RIPPLE_GROWTH: f64 = 40.0;
pub const RIPPLE_WIDTH: f64 = 3.0;
pub const LABEL_SIZE: f64 = 28.0;
/// Distance of a keystroke label above the bottom edge of its display.
pub const LABEL_MARGIN: f64 = 80.0;
const LABEL_COLOR: Color = Color::rgba(1.0, 1.0, 1.0, 0.92);

/// Identifies a mark within its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum MarkKind {
    Ripple { color: Color },
    Label { text: String },
}

/// One transient on-screen effect.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectMark {
    pub kind: MarkKind,
    /// Virtual-desktop position: ripple center or label anchor.
    pub position: Point,
    /// Eased animation progress in `[0, 1]`.
    pub progress: f64,
}

impl EffectMark {
    /// Largest distance from `position` the mark ever paints at.
    fn reach(&self) -> f64 {
        match &self.kind {
            MarkKind::Ripple { .. } => RIPPLE_START_RADIUS + RIPPLE_GROWTH + RIPPLE_WIDTH,
            MarkKind::Label { text } => text.chars().count() as f64 * LABEL_SIZE + LABEL_SIZE,
        }
    }
}

/// Every effect mark currently on screen.
#[derive(Debug, Default)]
pub struct EffectLayer {
    marks: BTreeMap<MarkId, EffectMark>,
    next_id: u64,
}

impl EffectLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: MarkKind, position: Point) -> MarkId {
        let id = MarkId(self.next_id);
        self.next_id += 1;
        self.marks.insert(
            id,
            EffectMark {
                kind,
                position,
                progress: 0.0,
            },
        );
        id
    }

    pub fn set_progress(&mut self, id: MarkId, progress: f64) {
        if let Some(mark) = self.marks.get_mut(&id) {
            mark.progress = progress.clamp(0.0, 1.0);
        }
    }

    pub fn remove(&mut self, id: MarkId) -> Option<EffectMark> {
        self.marks.remove(&id)
    }

    pub fn get(&self, id: MarkId) -> Option<&EffectMark> {
        self.marks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Append ops for every mark that reaches into `bounds` (virtual-desktop).
    pub fn paint_into(&self, frame: &mut Frame, bounds: Rect) {
        for mark in self.marks.values() {
            if !bounds.intersects_circle(mark.position, mark.reach()) {
                continue;
            }
            let local = virtual_desktop_to_surface_local(mark.position, bounds.origin());
            frame.push(match &mark.kind {
                MarkKind::Ripple { color } => ripple_op(local, *color, mark.progress),
                MarkKind::Label { text } => label_op(local, text, mark.progress),
            });
        }
    }
}

/// Expanding ring that fades as it grows.
pub fn ripple_op(center: Point, color: Color, progress: f64) -> PaintOp {
    let p = progress.clamp(0.0, 1.0);
    PaintOp::StrokeOutline {
        outline: Outline::Circle {
            center,
            radius: RIPPLE_START_RADIUS + RIPPLE_GROWTH * p,
        },
        width: RIPPLE_WIDTH,
        color: color.scale_alpha(1.0 - p),
    }
}

/// Label alpha: quick fade in, hold, fade out over the last 30%.
pub fn label_alpha(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < 0.1 {
        p / 0.1
    } else if p > 0.7 {
        (1.0 - p) / 0.3
    } else {
        1.0
    }
}

pub fn label_op(anchor: Point, text: &str, progress: f64) -> PaintOp {
    PaintOp::Text {
        anchor,
        text: text.to_string(),
        size: LABEL_SIZE,
        color: LABEL_COLOR.scale_alpha(label_alpha(progress)),
    }
}

/// Where a keystroke label goes on a display with `bounds` (virtual-desktop).
pub fn label_anchor(bounds: Rect) -> Point {
    Point::new(bounds.center().x, bounds.y + LABEL_MARGIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ripple_grows_and_fades() {
        match ripple_op(Point::ORIGIN, Color::WHITE, 0.5) {
            PaintOp::StrokeOutline {
                outline: Outline::Circle { radius, .. },
                color,
                ..
            } => {
                assert_eq!(radius, 30.0);
                assert_eq!(color.a, 0.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_label_alpha_envelope() {
        assert_eq!(label_alpha(0.0), 0.0);
        assert_eq!(label_alpha(0.5), 1.0);
        assert!((label_alpha(0.85) - 0.5).abs() < 1e-9);
        assert_eq!(label_alpha(1.0), 0.0);
    }

    #[test]
    fn test_marks_painted_only_where_they_reach() {
        let mut layer = EffectLayer::new();
        let id = layer.insert(
            MarkKind::Ripple {
                color: Color::WHITE,
            },
            Point::new(1910.0, 500.0),
        );
        layer.set_progress(id, 0.25);

        let left = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        let right = Rect::new(1920.0, 0.0, 1920.0, 1080.0);
        let far = Rect::new(5000.0, 0.0, 1920.0, 1080.0);

        let mut frame = Frame::new();
        layer.paint_into(&mut frame, right);
        match &frame.ops()[0] {
            PaintOp::StrokeOutline {
                outline: Outline::Circle { center, .. },
                ..
            } => assert_eq!(*center, Point::new(-10.0, 500.0)),
            other => panic!("unexpected {other:?}"),
        }

        let mut frame = Frame::new();
        layer.paint_into(&mut frame, left);
        assert_eq!(frame.len(), 1);

        let mut frame = Frame::new();
        layer.paint_into(&mut frame, far);
        assert!(frame.is_empty());

        assert!(layer.remove(id).is_some());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_label_anchor_bottom_center() {
        let bounds = Rect::new(1920.0, -200.0, 1280.0, 800.0);
        assert_eq!(label_anchor(bounds), Point::new(2560.0, -120.0));
    }
}
