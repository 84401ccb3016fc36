//! The injected geodesy capability and a planar reference implementation.

use crate::geom::Coordinate;

/// Projects query distances onto the coordinate plane.
///
/// The store is agnostic to the projection: a rectangle query becomes four
/// offsets of the point, a circle query an east-offset radius conversion,
/// and everything downstream (index and sweep) operates on plain planar
/// coordinates. Headings are degrees clockwise from north, where north is
/// the +y axis.
pub trait Geodesy {
    /// The point reached by travelling `distance_meters` from `origin` on
    /// the given heading.
    fn offset(&self, origin: &Coordinate, distance_meters: f64, heading_degrees: f64)
        -> Coordinate;

    /// Distance in meters between two points.
    fn distance_between(&self, from: &Coordinate, to: &Coordinate) -> f64;

    /// Heading in degrees clockwise from north, from one point toward
    /// another.
    fn heading_between(&self, from: &Coordinate, to: &Coordinate) -> f64;
}

/// Geodesy for a flat plane where one coordinate unit is one meter.
///
/// The reference implementation used in tests and planar deployments.
/// Geographic deployments inject their own projection instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarGeodesy;

impl Geodesy for PlanarGeodesy {
    fn offset(
        &self,
        origin: &Coordinate,
        distance_meters: f64,
        heading_degrees: f64,
    ) -> Coordinate {
        let heading = heading_degrees.to_radians();
        Coordinate::new(
            origin.x + distance_meters * heading.sin(),
            origin.y + distance_meters * heading.cos(),
        )
    }

    fn distance_between(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        from.distance(to)
    }

    fn heading_between(&self, from: &Coordinate, to: &Coordinate) -> f64 {
        (to.x - from.x).atan2(to.y - from.y).to_degrees()
    }
}
