//! # Heatmark Spatial - Bounding-Box Indexing for Heatmark
//!
//! This crate provides the spatial indexing layer of heatmark: an in-memory
//! R-Tree over axis-aligned bounding boxes with caller-assigned id payloads.
//!
//! ## Features
//!
//! - **Box search**: every stored box intersecting a query box
//! - **Nearest neighbors**: ascending squared box-distance with an optional
//!   cutoff and result limit, via a lazy min-heap descent
//! - **Bulk load**: Hilbert-ordered bottom-up packing, much faster than
//!   repeated insertion and better packed
//! - **Multiset semantics**: duplicate boxes allowed, removal by exact
//!   bounds and id with balanced underflow repair
//!
//! ## Quick Start
//!
//! ```rust
//! use heatmark_spatial::{BoundingBox, RTree};
//!
//! # fn main() -> Result<(), heatmark_spatial::SpatialError> {
//! let mut tree = RTree::new();
//! tree.insert(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1)?;
//! tree.insert(BoundingBox::new(5.0, 5.0, 15.0, 15.0), 2)?;
//!
//! // every box intersecting the query
//! let mut hits = tree.search(&BoundingBox::new(8.0, 8.0, 9.0, 9.0));
//! hits.sort_unstable();
//! assert_eq!(hits, vec![1, 2]);
//!
//! // nearest entries by squared box-distance
//! let nearest = tree.nearest(20.0, 20.0, f64::MAX, Some(1));
//! assert_eq!(nearest[0].0, 2);
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod error;
pub mod hilbert;
pub mod rtree;

pub use bounding_box::BoundingBox;
pub use error::{SpatialError, SpatialResult};
pub use rtree::{EntryId, RTree};
