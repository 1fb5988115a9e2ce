//! Plain 2D geometry shared by every coordinate space.
//!
//! The types carry no notion of which space they live in; see [`crate::coords`]
//! for the conversions and the conventions each space uses.

/// A point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise difference `self - other`.
    pub fn offset_from(&self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Whether both components are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle anchored at its minimum corner.
///
/// In hook space the minimum corner is the top-left; in virtual-desktop
/// space it is the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Minimum x coordinate.
    pub x: f64,
    /// Minimum y coordinate.
    pub y: f64,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check whether a point is inside this rectangle (half-open on the max edges).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.y >= self.y && point.x < self.max_x() && point.y < self.max_y()
    }

    /// Whether a circle of `radius` around `center` overlaps this rectangle.
    pub fn intersects_circle(&self, center: Point, radius: f64) -> bool {
        let nearest_x = center.x.clamp(self.x, self.max_x());
        let nearest_y = center.y.clamp(self.y, self.max_y());
        center.distance_to(Point::new(nearest_x, nearest_y)) <= radius.max(0.0)
    }
}
