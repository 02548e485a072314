use nalgebra::{Point2, Vector2};

/// Scalar field value at a point in the plane.
pub type Value = f64;

/// A 2D point with [`Value`] components.
pub type Point = Point2<Value>;

/// A 2D vector with [`Value`] components.
pub type Vector = Vector2<Value>;

/// One piece of an isocontour: a straight line between two interpolated edge points.
///
/// Segments are undirected and are not stitched into polylines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Euclidean length of the segment.
    pub fn length(&self) -> Value {
        nalgebra::distance(&self.start, &self.end)
    }
}
