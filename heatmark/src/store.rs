//! Point-to-region orchestration: the mutable session state of the tool.

use std::collections::{BTreeMap, HashMap, HashSet};

use heatmark_spatial::{BoundingBox, RTree};
use serde::{Deserialize, Serialize};

use crate::errors::{HeatmarkError, HeatmarkResult};
use crate::geodesy::{Geodesy, PlanarGeodesy};
use crate::geom::{Bounded, Circle, CoordKey, Coordinate, Query, Region, Shape};
use crate::ordered_map::OrderedMap;
use crate::sweep;

/// One stored point with the region currently derived from it.
#[derive(Debug, Clone, Copy)]
struct PointRecord {
    pos: Coordinate,
    region: Region,
}

/// A copy of the store contents for the presentation layer, which maps
/// `max_overlap` onto its rendering scale. `points[i]` owns `regions[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub points: Vec<Coordinate>,
    pub regions: Vec<Region>,
    pub max_overlap: u32,
}

/// Owns one session's points, their coverage regions and the running
/// maximum overlap depth.
///
/// Every point maps to exactly one region derived from the active [`Query`]
/// through the injected [`Geodesy`]; the region is rebuilt atomically with
/// its point whenever the query changes. A spatial index over the region
/// bounds restricts the sweep to affected regions on insertion; removals
/// and query changes recompute from scratch, since overlap can shrink and
/// the restricted sweep can only raise the maximum.
///
/// State is process-local to one logical session. Nothing here is safe for
/// concurrent mutation; concurrent sessions each own their own store.
///
/// # Examples
///
/// ```rust
/// use heatmark::{Query, RegionStore};
///
/// # fn main() -> Result<(), heatmark::HeatmarkError> {
/// let mut store = RegionStore::new(Query::Rect {
///     height: 10.0,
///     width: 10.0,
/// })?;
/// store.add_point(0.0, 0.0)?;
/// store.add_point(5.0, 5.0)?;
/// assert_eq!(store.max_overlap(), 2);
///
/// store.remove_point(5.0, 5.0)?;
/// assert_eq!(store.max_overlap(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RegionStore<G: Geodesy = PlanarGeodesy> {
    geodesy: G,
    query: Query,
    points: OrderedMap<CoordKey, PointRecord>,
    keys_by_region: HashMap<u64, CoordKey>,
    index: RTree,
    max_overlap: u32,
    next_region_id: u64,
}

impl RegionStore<PlanarGeodesy> {
    /// Store over a flat plane where query distances are coordinate units.
    pub fn new(query: Query) -> HeatmarkResult<Self> {
        Self::with_geodesy(query, PlanarGeodesy)
    }
}

impl<G: Geodesy> RegionStore<G> {
    /// Store projecting query distances through the given geodesy.
    ///
    /// # Errors
    /// Rejects a degenerate query before any state exists.
    pub fn with_geodesy(query: Query, geodesy: G) -> HeatmarkResult<Self> {
        query.validate()?;
        Ok(Self {
            geodesy,
            query,
            points: OrderedMap::new(),
            keys_by_region: HashMap::new(),
            index: RTree::new(),
            max_overlap: 0,
            next_region_id: 0,
        })
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the store holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The current maximum overlap depth across all regions; 0 when empty.
    pub fn max_overlap(&self) -> u32 {
        self.max_overlap
    }

    /// The active query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Adds a point and materializes its coverage region.
    ///
    /// A coordinate already present is a no-op signaled by `Ok(false)`.
    /// Otherwise the region is indexed and a sweep restricted to the new
    /// region and its index-reported neighbors raises the running maximum
    /// if it grew.
    ///
    /// # Errors
    /// Rejects non-finite coordinates before any state is touched.
    pub fn add_point(&mut self, x: f64, y: f64) -> HeatmarkResult<bool> {
        Self::validate_coordinate(x, y)?;
        let key = CoordKey::new(x, y);
        if self.points.get(&key).is_some() {
            log::debug!("ignoring duplicate point ({}, {})", x, y);
            return Ok(false);
        }

        let pos = Coordinate::new(x, y);
        let region = self.build_region(pos);
        self.index.insert(region.bound(), region.id())?;
        self.keys_by_region.insert(region.id(), key);
        self.points.put(key, PointRecord { pos, region });

        let depth = self.restricted_overlap(&[region]);
        if depth > self.max_overlap {
            self.max_overlap = depth;
        }
        Ok(true)
    }

    /// Adds a batch of points, running one restricted sweep over all of
    /// them; duplicates (stored or within the batch) are skipped. Returns
    /// how many points were actually added.
    ///
    /// An empty store takes the batch through a packed bulk load; otherwise
    /// the regions are inserted one by one.
    pub fn add_points(&mut self, batch: &[(f64, f64)]) -> HeatmarkResult<usize> {
        for &(x, y) in batch {
            Self::validate_coordinate(x, y)?;
        }

        let mut staged: Vec<(CoordKey, PointRecord)> = Vec::new();
        let mut staged_keys: HashSet<CoordKey> = HashSet::new();
        for &(x, y) in batch {
            let key = CoordKey::new(x, y);
            if self.points.get(&key).is_some() || !staged_keys.insert(key) {
                continue;
            }
            let pos = Coordinate::new(x, y);
            let region = self.build_region(pos);
            staged.push((key, PointRecord { pos, region }));
        }
        if staged.is_empty() {
            return Ok(0);
        }

        if self.points.is_empty() {
            let pairs: Vec<(BoundingBox, u64)> = staged
                .iter()
                .map(|(_, record)| (record.region.bound(), record.region.id()))
                .collect();
            self.index = RTree::bulk_load(&pairs)?;
        } else {
            for (_, record) in &staged {
                self.index.insert(record.region.bound(), record.region.id())?;
            }
        }

        let inserted: Vec<Region> = staged.iter().map(|(_, record)| record.region).collect();
        for (key, record) in staged {
            self.keys_by_region.insert(record.region.id(), key);
            self.points.put(key, record);
        }
        log::debug!("added {} points in a batch", inserted.len());

        let depth = self.restricted_overlap(&inserted);
        if depth > self.max_overlap {
            self.max_overlap = depth;
        }
        Ok(inserted.len())
    }

    /// Removes a point and its region; `Ok(false)` when the coordinate is
    /// not stored. Overlap can only shrink here, so the maximum is
    /// recomputed over everything that remains.
    pub fn remove_point(&mut self, x: f64, y: f64) -> HeatmarkResult<bool> {
        Self::validate_coordinate(x, y)?;
        if !self.unlink_point(&CoordKey::new(x, y)) {
            return Ok(false);
        }
        self.max_overlap = self.full_overlap();
        Ok(true)
    }

    /// Removes a batch of points with a single full recompute at the end.
    /// Returns how many points were actually removed.
    pub fn remove_points(&mut self, batch: &[(f64, f64)]) -> HeatmarkResult<usize> {
        for &(x, y) in batch {
            Self::validate_coordinate(x, y)?;
        }
        let mut removed = 0;
        for &(x, y) in batch {
            if self.unlink_point(&CoordKey::new(x, y)) {
                removed += 1;
            }
        }
        if removed > 0 {
            log::debug!("removed {} points in a batch", removed);
            self.max_overlap = self.full_overlap();
        }
        Ok(removed)
    }

    /// Swaps the active query: every region is rebuilt under it, the index
    /// reloaded in one packed pass, and the maximum recomputed from
    /// scratch.
    ///
    /// # Errors
    /// A degenerate query is rejected with the store left untouched.
    pub fn change_query(&mut self, query: Query) -> HeatmarkResult<()> {
        query.validate()?;
        let previous = self.query;
        self.query = query;

        let mut coords: Vec<(CoordKey, Coordinate)> = Vec::with_capacity(self.points.len());
        self.points.for_each(|key, record| coords.push((*key, record.pos)));

        let mut rebuilt: Vec<(CoordKey, PointRecord)> = Vec::with_capacity(coords.len());
        let mut pairs: Vec<(BoundingBox, u64)> = Vec::with_capacity(coords.len());
        for (key, pos) in coords {
            let region = self.build_region(pos);
            pairs.push((region.bound(), region.id()));
            rebuilt.push((key, PointRecord { pos, region }));
        }

        match RTree::bulk_load(&pairs) {
            Ok(index) => self.index = index,
            Err(err) => {
                self.query = previous;
                return Err(HeatmarkError::from(err));
            }
        }

        self.keys_by_region.clear();
        for (key, record) in rebuilt {
            self.keys_by_region.insert(record.region.id(), key);
            self.points.put(key, record);
        }
        log::debug!("query changed; rebuilt {} regions", pairs.len());

        self.max_overlap = self.full_overlap();
        Ok(())
    }

    /// Empties the store back to its initial state.
    pub fn clear(&mut self) {
        self.points.clear();
        self.keys_by_region.clear();
        self.index.clear();
        self.max_overlap = 0;
    }

    /// Visits every stored point and its region in ascending coordinate
    /// order.
    pub fn for_each_point<F: FnMut(&Coordinate, &Region)>(&self, mut visitor: F) {
        self.points
            .for_each(|_, record| visitor(&record.pos, &record.region));
    }

    /// Copies the current points, regions and overlap depth for the
    /// presentation layer.
    pub fn snapshot(&self) -> Snapshot {
        let mut points = Vec::with_capacity(self.len());
        let mut regions = Vec::with_capacity(self.len());
        self.for_each_point(|pos, region| {
            points.push(*pos);
            regions.push(*region);
        });
        Snapshot {
            points,
            regions,
            max_overlap: self.max_overlap,
        }
    }

    /// Stored points whose region bound lies within `max_distance_sq`
    /// (squared plane units) of `(x, y)`, nearest first, up to `limit`.
    pub fn nearest_points(
        &self,
        x: f64,
        y: f64,
        max_distance_sq: f64,
        limit: Option<usize>,
    ) -> Vec<Coordinate> {
        self.index
            .nearest(x, y, max_distance_sq, limit)
            .into_iter()
            .filter_map(|(id, _)| self.keys_by_region.get(&id))
            .filter_map(|key| self.points.get(key).map(|record| record.pos))
            .collect()
    }

    /// Materializes the coverage region for a point under the active
    /// query, projecting the query distances through the geodesy
    /// capability.
    fn build_region(&mut self, pos: Coordinate) -> Region {
        let id = self.next_region_id;
        self.next_region_id += 1;
        let shape = match self.query {
            Query::Rect { height, width } => {
                let north = self.geodesy.offset(&pos, height, 0.0);
                let east = self.geodesy.offset(&pos, width, 90.0);
                let south = self.geodesy.offset(&pos, height, 180.0);
                let west = self.geodesy.offset(&pos, width, 270.0);
                Shape::Rect(BoundingBox::new(west.x, south.y, east.x, north.y))
            }
            Query::Circle { radius } => {
                let east = self.geodesy.offset(&pos, radius, 90.0);
                Shape::Circle(Circle::new(pos, (east.x - pos.x).abs()))
            }
        };
        Region::new(id, shape)
    }

    fn unlink_point(&mut self, key: &CoordKey) -> bool {
        let Some(record) = self.points.remove(key) else {
            return false;
        };
        let region = record.region;
        self.keys_by_region.remove(&region.id());
        let removed = self.index.remove(&region.bound(), region.id());
        debug_assert!(removed, "index entry missing for region {}", region.id());
        true
    }

    /// Sweep over the inserted regions plus every stored region whose
    /// bound intersects theirs, deduplicated by region id. Only valid for
    /// raising the maximum.
    fn restricted_overlap(&self, inserted: &[Region]) -> u32 {
        let mut affected: BTreeMap<u64, Region> = BTreeMap::new();
        for region in inserted {
            affected.insert(region.id(), *region);
            for id in self.index.search(&region.bound()) {
                if let Some(key) = self.keys_by_region.get(&id) {
                    if let Some(record) = self.points.get(key) {
                        affected.insert(id, record.region);
                    }
                }
            }
        }
        let regions: Vec<Region> = affected.into_values().collect();
        sweep::max_overlap(&regions)
    }

    /// Sweep over every stored region.
    fn full_overlap(&self) -> u32 {
        let mut regions = Vec::with_capacity(self.len());
        self.points.for_each(|_, record| regions.push(record.region));
        sweep::max_overlap(&regions)
    }

    fn validate_coordinate(x: f64, y: f64) -> HeatmarkResult<()> {
        if x.is_finite() && y.is_finite() {
            Ok(())
        } else {
            Err(HeatmarkError::InvalidCoordinate(format!("({}, {})", x, y)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_store(height: f64, width: f64) -> RegionStore {
        RegionStore::new(Query::Rect { height, width }).unwrap()
    }

    #[test]
    fn test_empty_store() {
        let _ = env_logger::builder().is_test(true).try_init();
        let store = rect_store(10.0, 10.0);
        assert!(store.is_empty());
        assert_eq!(store.max_overlap(), 0);
        assert!(store.snapshot().points.is_empty());
    }

    #[test]
    fn test_invalid_queries_rejected() {
        assert!(RegionStore::new(Query::Rect {
            height: 0.0,
            width: 10.0
        })
        .is_err());
        assert!(RegionStore::new(Query::Circle { radius: -1.0 }).is_err());

        let mut store = rect_store(10.0, 10.0);
        store.add_point(0.0, 0.0).unwrap();
        assert!(store
            .change_query(Query::Circle { radius: f64::NAN })
            .is_err());
        // the store still works under its previous query
        assert_eq!(store.query(), &Query::Rect {
            height: 10.0,
            width: 10.0
        });
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_add_point_and_duplicate() {
        let mut store = rect_store(10.0, 10.0);
        assert!(store.add_point(1.0, 2.0).unwrap());
        assert!(!store.add_point(1.0, 2.0).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_non_finite_point_rejected() {
        let mut store = rect_store(10.0, 10.0);
        assert!(store.add_point(f64::NAN, 0.0).is_err());
        assert!(store.add_point(0.0, f64::INFINITY).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_overlap_grows_with_insertions() {
        // height/width 10 makes a point's rectangle reach 10 units out
        let mut store = rect_store(10.0, 10.0);
        store.add_point(0.0, 0.0).unwrap();
        assert_eq!(store.max_overlap(), 1);
        store.add_point(15.0, 15.0).unwrap();
        assert_eq!(store.max_overlap(), 2);
        store.add_point(100.0, 100.0).unwrap();
        assert_eq!(store.max_overlap(), 2);
        // right on top of the first: every rectangle around it overlaps
        store.add_point(1.0, 1.0).unwrap();
        assert_eq!(store.max_overlap(), 3);
    }

    #[test]
    fn test_insert_remove_is_idempotent() {
        let mut store = rect_store(10.0, 10.0);
        store.add_point(0.0, 0.0).unwrap();
        store.add_point(15.0, 15.0).unwrap();
        let size_before = store.len();
        let overlap_before = store.max_overlap();

        assert!(store.add_point(7.0, 7.0).unwrap());
        assert!(store.max_overlap() >= overlap_before);
        assert!(store.remove_point(7.0, 7.0).unwrap());

        assert_eq!(store.len(), size_before);
        assert_eq!(store.max_overlap(), overlap_before);
    }

    #[test]
    fn test_removal_shrinks_overlap() {
        let mut store = rect_store(10.0, 10.0);
        store.add_point(0.0, 0.0).unwrap();
        store.add_point(5.0, 5.0).unwrap();
        store.add_point(6.0, 6.0).unwrap();
        assert_eq!(store.max_overlap(), 3);

        store.remove_point(5.0, 5.0).unwrap();
        assert_eq!(store.max_overlap(), 2);
        store.remove_point(6.0, 6.0).unwrap();
        assert_eq!(store.max_overlap(), 1);
        store.remove_point(0.0, 0.0).unwrap();
        assert_eq!(store.max_overlap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_missing_point() {
        let mut store = rect_store(10.0, 10.0);
        store.add_point(0.0, 0.0).unwrap();
        assert!(!store.remove_point(3.0, 3.0).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_batch_add_and_remove() {
        let mut store = rect_store(10.0, 10.0);
        store.add_point(0.0, 0.0).unwrap();

        // one stored duplicate and one in-batch duplicate are skipped
        let added = store
            .add_points(&[(0.0, 0.0), (5.0, 5.0), (5.0, 5.0), (50.0, 50.0)])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.len(), 3);
        assert_eq!(store.max_overlap(), 2);

        let removed = store
            .remove_points(&[(5.0, 5.0), (50.0, 50.0), (99.0, 99.0)])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_batch_into_empty_store_bulk_loads() {
        let mut store = rect_store(10.0, 10.0);
        let points: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 * 30.0, 0.0)).collect();
        assert_eq!(store.add_points(&points).unwrap(), 40);
        assert_eq!(store.len(), 40);
        // spaced out: nothing overlaps
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_change_query_rebuilds_overlap() {
        let mut store = rect_store(5.0, 5.0);
        store.add_point(0.0, 0.0).unwrap();
        store.add_point(20.0, 0.0).unwrap();
        assert_eq!(store.max_overlap(), 1);

        // large enough that the two rectangles overlap
        store
            .change_query(Query::Rect {
                height: 15.0,
                width: 15.0,
            })
            .unwrap();
        assert_eq!(store.max_overlap(), 2);

        store
            .change_query(Query::Rect {
                height: 5.0,
                width: 5.0,
            })
            .unwrap();
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_circle_query_mode() {
        let mut store = RegionStore::new(Query::Circle { radius: 10.0 }).unwrap();
        store.add_point(0.0, 0.0).unwrap();
        store.add_point(5.0, 0.0).unwrap();
        assert_eq!(store.max_overlap(), 2);

        store.change_query(Query::Circle { radius: 2.0 }).unwrap();
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = rect_store(10.0, 10.0);
        store.add_points(&[(0.0, 0.0), (5.0, 5.0)]).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.max_overlap(), 0);
        assert!(store.nearest_points(0.0, 0.0, f64::MAX, None).is_empty());

        // the store is fully usable again
        store.add_point(1.0, 1.0).unwrap();
        assert_eq!(store.max_overlap(), 1);
    }

    #[test]
    fn test_snapshot_and_iteration_order() {
        let mut store = rect_store(10.0, 10.0);
        store.add_point(50.0, 0.0).unwrap();
        store.add_point(-10.0, 3.0).unwrap();
        store.add_point(50.0, -2.0).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.points.len(), 3);
        assert_eq!(snapshot.regions.len(), 3);
        assert_eq!(snapshot.max_overlap, store.max_overlap());

        // ascending (x, y) order
        let xs: Vec<(f64, f64)> = snapshot.points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(xs, vec![(-10.0, 3.0), (50.0, -2.0), (50.0, 0.0)]);
    }

    #[test]
    fn test_nearest_points() {
        let mut store = rect_store(1.0, 1.0);
        store
            .add_points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (100.0, 0.0)])
            .unwrap();

        // bounds reach 1 unit out, so the nearest bound to (4, 0) is the
        // one around the origin at distance 3
        let near = store.nearest_points(4.0, 0.0, f64::MAX, Some(2));
        assert_eq!(near.len(), 2);
        assert_eq!((near[0].x, near[0].y), (0.0, 0.0));
        assert_eq!((near[1].x, near[1].y), (10.0, 0.0));

        let within = store.nearest_points(0.0, 0.0, 16.0, None);
        assert_eq!(within.len(), 1);
    }

    #[test]
    fn test_custom_geodesy_scales_regions() {
        /// One coordinate unit equals a thousand meters.
        #[derive(Debug, Clone, Copy)]
        struct KilometerGrid;

        impl Geodesy for KilometerGrid {
            fn offset(
                &self,
                origin: &Coordinate,
                distance_meters: f64,
                heading_degrees: f64,
            ) -> Coordinate {
                let heading = heading_degrees.to_radians();
                let d = distance_meters / 1000.0;
                Coordinate::new(origin.x + d * heading.sin(), origin.y + d * heading.cos())
            }

            fn distance_between(&self, from: &Coordinate, to: &Coordinate) -> f64 {
                from.distance(to) * 1000.0
            }

            fn heading_between(&self, from: &Coordinate, to: &Coordinate) -> f64 {
                (to.x - from.x).atan2(to.y - from.y).to_degrees()
            }
        }

        let mut store = RegionStore::with_geodesy(
            Query::Rect {
                height: 2000.0,
                width: 2000.0,
            },
            KilometerGrid,
        )
        .unwrap();
        // rectangles reach 2 units out; 3 units apart overlaps
        store.add_point(0.0, 0.0).unwrap();
        store.add_point(3.0, 0.0).unwrap();
        assert_eq!(store.max_overlap(), 2);
        // 5 units apart does not
        store.add_point(8.0, 0.0).unwrap();
        assert_eq!(store.max_overlap(), 2);
    }
}
