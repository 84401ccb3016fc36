//! # Heatmark - Coverage-Overlap Analytics Core
//!
//! Heatmark is the analytical core of an interactive map tool: a user drops
//! points on a plane, each point materializes a 2D coverage region (a
//! rectangle sized by a height/width query or a circle sized by a radius),
//! and the tool continuously needs the *maximum overlap depth*, the largest
//! number of regions that simultaneously cover any single location, to
//! drive its rendering scale.
//!
//! ## Components
//!
//! - [`OrderedMap`]: generic sorted key/value map backed by a B-Tree; keys
//!   the point set and the sweep's active boundary sets
//! - [`heatmark_spatial::RTree`] (re-exported): bounding-box index used to
//!   restrict sweeps to affected regions
//! - [`sweep`]: stateless line-sweep maximum-overlap computation, rectangle
//!   and circle variants
//! - [`RegionStore`]: the session state; owns the point-to-region mapping
//!   and drives the index and the sweep on every mutation
//!
//! Rendering, place search and UI wiring live outside this crate; the
//! [`Geodesy`] capability is injected, and the presentation layer consumes
//! [`Snapshot`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use heatmark::{Query, RegionStore};
//!
//! # fn main() -> Result<(), heatmark::HeatmarkError> {
//! let mut store = RegionStore::new(Query::Rect {
//!     height: 10.0,
//!     width: 10.0,
//! })?;
//!
//! store.add_point(0.0, 0.0)?;
//! store.add_point(5.0, 5.0)?;
//! assert_eq!(store.max_overlap(), 2);
//!
//! // e.g. grayscale = 255 / max_overlap on the presentation side
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.points.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod geodesy;
pub mod geom;
pub mod ordered_map;
pub mod store;
pub mod sweep;

pub use errors::{HeatmarkError, HeatmarkResult};
pub use geodesy::{Geodesy, PlanarGeodesy};
pub use geom::{Bounded, Circle, Coordinate, Query, Region, Shape};
pub use ordered_map::OrderedMap;
pub use store::{RegionStore, Snapshot};

// the spatial index is part of the public surface
pub use heatmark_spatial::{BoundingBox, RTree};
