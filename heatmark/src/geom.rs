//! Geometry, region and query types for the coverage engine.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use heatmark_spatial::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::errors::{HeatmarkError, HeatmarkResult};

/// A 2D coordinate (x, y). Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the Euclidean distance to another coordinate.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A circle given by its center and radius, in plane units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Coordinate,
    pub radius: f64,
}

impl Circle {
    /// Creates a new circle.
    pub fn new(center: Coordinate, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Strict-interior overlap test; touching circles do not overlap.
    pub fn overlaps(&self, other: &Circle) -> bool {
        self.center.distance(&other.center) < self.radius + other.radius
    }
}

impl Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} r{}", self.center, self.radius)
    }
}

/// Anything that can report the minimal axis-aligned box enclosing it.
pub trait Bounded {
    /// The minimal axis-aligned bounding box.
    fn bound(&self) -> BoundingBox;
}

impl Bounded for BoundingBox {
    fn bound(&self) -> BoundingBox {
        *self
    }
}

impl Bounded for Circle {
    fn bound(&self) -> BoundingBox {
        BoundingBox::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
        )
    }
}

fn rects_overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.min_x < b.max_x && a.max_x > b.min_x && a.min_y < b.max_y && a.max_y > b.min_y
}

/// The footprint of one coverage region: an axis-aligned rectangle or a
/// circle, depending on the active query mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect(BoundingBox),
    Circle(Circle),
}

impl Shape {
    /// Strict-interior overlap test. Footprints of one store are always the
    /// same kind; a mixed comparison falls back to the bounds.
    pub fn overlaps(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Rect(a), Shape::Rect(b)) => rects_overlap(a, b),
            (Shape::Circle(a), Shape::Circle(b)) => a.overlaps(b),
            _ => rects_overlap(&self.bound(), &other.bound()),
        }
    }
}

impl Bounded for Shape {
    fn bound(&self) -> BoundingBox {
        match self {
            Shape::Rect(bbox) => *bbox,
            Shape::Circle(circle) => circle.bound(),
        }
    }
}

/// A coverage region: a footprint plus the store-assigned identity used as
/// the index payload and the sweep tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    id: u64,
    shape: Shape,
}

impl Region {
    pub(crate) fn new(id: u64, shape: Shape) -> Self {
        Self { id, shape }
    }

    /// The store-assigned identity of this region.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The region's footprint.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Strict-interior overlap test against another region.
    pub fn overlaps(&self, other: &Region) -> bool {
        self.shape.overlaps(&other.shape)
    }
}

impl Bounded for Region {
    fn bound(&self) -> BoundingBox {
        self.shape.bound()
    }
}

/// Query parameters a point's coverage region is derived from, with
/// distances in meters; the store's geodesy capability projects them onto
/// the coordinate plane. Exactly one mode is active per store at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Rectangle reaching `height` meters north and south and `width`
    /// meters east and west of the point.
    Rect { height: f64, width: f64 },
    /// Circle of `radius` meters around the point.
    Circle { radius: f64 },
}

impl Query {
    /// Rejects degenerate parameters before any region is built or indexed.
    pub fn validate(&self) -> HeatmarkResult<()> {
        match *self {
            Query::Rect { height, width } => {
                if !height.is_finite() || height <= 0.0 {
                    return Err(HeatmarkError::InvalidQuery(format!(
                        "height must be positive and finite, got: {}",
                        height
                    )));
                }
                if !width.is_finite() || width <= 0.0 {
                    return Err(HeatmarkError::InvalidQuery(format!(
                        "width must be positive and finite, got: {}",
                        width
                    )));
                }
                Ok(())
            }
            Query::Circle { radius } => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(HeatmarkError::InvalidQuery(format!(
                        "radius must be positive and finite, got: {}",
                        radius
                    )));
                }
                Ok(())
            }
        }
    }
}

/// An `f64` ordered, compared and hashed by IEEE total order, which matches
/// numeric order for the finite values the store accepts. Lets coordinates
/// key the ordered map and keeps sweep boundaries sorted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderedF64(pub f64);

impl PartialEq for OrderedF64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for OrderedF64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Totally ordered coordinate key for the point map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct CoordKey {
    pub x: OrderedF64,
    pub y: OrderedF64,
}

impl CoordKey {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: OrderedF64(x),
            y: OrderedF64(y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_distance() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance(&a), 5.0);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_circle_overlap_is_strict() {
        let a = Circle::new(Coordinate::new(0.0, 0.0), 1.0);
        let touching = Circle::new(Coordinate::new(2.0, 0.0), 1.0);
        let overlapping = Circle::new(Coordinate::new(1.9, 0.0), 1.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&overlapping));
    }

    #[test]
    fn test_circle_bound() {
        let c = Circle::new(Coordinate::new(2.0, -1.0), 3.0);
        assert_eq!(c.bound(), BoundingBox::new(-1.0, -4.0, 5.0, 2.0));
    }

    #[test]
    fn test_rect_shape_overlap_is_strict() {
        let a = Shape::Rect(BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let edge = Shape::Rect(BoundingBox::new(10.0, 0.0, 20.0, 10.0));
        let corner = Shape::Rect(BoundingBox::new(10.0, 10.0, 20.0, 20.0));
        let inner = Shape::Rect(BoundingBox::new(9.0, 9.0, 20.0, 20.0));
        assert!(!a.overlaps(&edge));
        assert!(!a.overlaps(&corner));
        assert!(a.overlaps(&inner));
    }

    #[test]
    fn test_region_accessors() {
        let region = Region::new(7, Shape::Circle(Circle::new(Coordinate::new(1.0, 2.0), 3.0)));
        assert_eq!(region.id(), 7);
        assert_eq!(region.bound(), BoundingBox::new(-2.0, -1.0, 4.0, 5.0));
    }

    #[test]
    fn test_query_validation() {
        assert!(Query::Rect {
            height: 10.0,
            width: 5.0
        }
        .validate()
        .is_ok());
        assert!(Query::Circle { radius: 1.0 }.validate().is_ok());

        assert!(Query::Rect {
            height: 0.0,
            width: 5.0
        }
        .validate()
        .is_err());
        assert!(Query::Rect {
            height: 5.0,
            width: -1.0
        }
        .validate()
        .is_err());
        assert!(Query::Rect {
            height: f64::NAN,
            width: 5.0
        }
        .validate()
        .is_err());
        assert!(Query::Circle { radius: 0.0 }.validate().is_err());
        assert!(Query::Circle {
            radius: f64::INFINITY
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_coord_key_ordering() {
        let a = CoordKey::new(1.0, 5.0);
        let b = CoordKey::new(1.0, 6.0);
        let c = CoordKey::new(2.0, 0.0);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, CoordKey::new(1.0, 5.0));
    }

    #[test]
    fn test_serde_round_trips() {
        let region = Region::new(3, Shape::Rect(BoundingBox::new(0.0, 1.0, 2.0, 3.0)));
        let json = serde_json::to_string(&region).unwrap();
        let back: Region = serde_json::from_str(&json).unwrap();
        assert_eq!(region, back);

        let query = Query::Circle { radius: 12.5 };
        let json = serde_json::to_string(&query).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(query, back);
    }
}
