//! Maximum-overlap computation over coverage regions.
//!
//! Stateless: every function takes a materialized slice of regions and
//! returns the largest number of regions whose interiors share a point.
//! Callers decide what to pass: the whole dataset for a full recompute, or
//! an inserted batch plus its index-reported neighbors for the restricted
//! form. The restricted form can only ever raise a stored maximum; a
//! decrease is only discovered by a full recompute.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::geom::{Circle, OrderedF64, Region, Shape};
use crate::ordered_map::OrderedMap;

/// Maximum number of regions whose interiors simultaneously cover a point.
///
/// Dispatches on the footprint kind; region sets derived from one query are
/// homogeneous. Returns 0 for an empty slice and at least 1 otherwise.
pub fn max_overlap(regions: &[Region]) -> u32 {
    match regions.first().map(Region::shape) {
        None => 0,
        Some(Shape::Rect(_)) => max_rect_overlap(regions),
        Some(Shape::Circle(_)) => max_circle_overlap(regions),
    }
}

/// Line sweep over rectangle regions.
///
/// Every rectangle contributes an opening and a closing tick on the x axis
/// carrying its y interval, ordered by the explicit
/// (coordinate, open-before-close, region id) comparator so coincident
/// boundaries process deterministically. Between consecutive distinct x
/// coordinates the active y boundaries are scanned in ascending order
/// accumulating signed deltas; the largest running sum anywhere is the
/// overlap depth.
pub fn max_rect_overlap(regions: &[Region]) -> u32 {
    let mut ticks: Vec<RectTick> = Vec::with_capacity(regions.len() * 2);
    for region in regions {
        let Shape::Rect(bbox) = region.shape() else {
            debug_assert!(false, "rectangle sweep fed a circle region");
            continue;
        };
        ticks.push(RectTick {
            x: bbox.min_x,
            kind: TickKind::Open,
            lo: bbox.min_y,
            hi: bbox.max_y,
            region: region.id(),
        });
        ticks.push(RectTick {
            x: bbox.max_x,
            kind: TickKind::Close,
            lo: bbox.min_y,
            hi: bbox.max_y,
            region: region.id(),
        });
    }
    if ticks.is_empty() {
        return 0;
    }
    ticks.sort_by(RectTick::order);

    let mut active: OrderedMap<OrderedF64, i64> = OrderedMap::new();
    let mut best = 0;
    let mut prev_x: Option<f64> = None;

    for (x, group) in &ticks.iter().chunk_by(|t| t.x) {
        // measure the strip left of this x before its ticks apply; a
        // zero-width strip has no interior
        if prev_x.is_some_and(|prev| prev < x) && !active.is_empty() {
            best = best.max(active_depth(&active));
        }
        for tick in group {
            let sign = match tick.kind {
                TickKind::Open => 1,
                TickKind::Close => -1,
            };
            apply_delta(&mut active, tick.lo, sign);
            apply_delta(&mut active, tick.hi, -sign);
        }
        prev_x = Some(x);
    }
    best.max(1)
}

/// Critical-slice sweep over circle regions.
///
/// Slices the plane at every circle's leftmost, center and rightmost x and
/// at the x coordinates of each pairwise intersection point, counts the
/// vertical chords crossing each slice with the same signed-delta
/// technique, and returns the deepest count seen.
///
/// The slice set is a heuristic: a stack of three or more circles whose
/// deepest column lies strictly between the critical slices can be
/// under-counted. Results are exact for disjoint, pairwise-overlapping and
/// concentric configurations.
pub fn max_circle_overlap(regions: &[Region]) -> u32 {
    let mut circles: Vec<Circle> = Vec::with_capacity(regions.len());
    for region in regions {
        let Shape::Circle(circle) = region.shape() else {
            debug_assert!(false, "circle sweep fed a rectangle region");
            continue;
        };
        circles.push(*circle);
    }
    if circles.is_empty() {
        return 0;
    }

    let mut slices: Vec<f64> = Vec::with_capacity(circles.len() * 3);
    for circle in &circles {
        slices.push(circle.center.x - circle.radius);
        slices.push(circle.center.x);
        slices.push(circle.center.x + circle.radius);
    }
    for (i, a) in circles.iter().enumerate() {
        for b in &circles[i + 1..] {
            if a.overlaps(b) {
                if let Some((x1, x2)) = intersection_xs(a, b) {
                    slices.push(x1);
                    slices.push(x2);
                }
            }
        }
    }
    slices.sort_by(f64::total_cmp);
    slices.dedup();

    let mut active: OrderedMap<OrderedF64, i64> = OrderedMap::new();
    let mut best = 0;
    for &x in &slices {
        active.clear();
        let mut crossed = false;
        for circle in &circles {
            let d = (x - circle.center.x).abs();
            if d < circle.radius {
                // the vertical chord this slice cuts through the circle
                let h = (circle.radius * circle.radius - d * d).sqrt();
                apply_delta(&mut active, circle.center.y - h, 1);
                apply_delta(&mut active, circle.center.y + h, -1);
                crossed = true;
            }
        }
        if crossed {
            best = best.max(active_depth(&active));
        }
    }
    best.max(1)
}

/// X coordinates of the two intersection points of a pair of overlapping
/// circles, via the law of cosines on the center line: both points sit at
/// distance `a.radius` from `a`'s center, on the center heading rotated by
/// the included angle either way. `None` for concentric circles, which
/// have no intersection points.
fn intersection_xs(a: &Circle, b: &Circle) -> Option<(f64, f64)> {
    let d = a.center.distance(&b.center);
    if d == 0.0 {
        return None;
    }
    let cos_alpha = (a.radius * a.radius + d * d - b.radius * b.radius) / (2.0 * a.radius * d);
    let alpha = cos_alpha.clamp(-1.0, 1.0).acos();
    let heading = (b.center.x - a.center.x).atan2(b.center.y - a.center.y);
    let x1 = a.center.x + a.radius * (heading - alpha).sin();
    let x2 = a.center.x + a.radius * (heading + alpha).sin();
    Some((x1, x2))
}

/// Folds a signed boundary delta into the active set, dropping entries
/// whose deltas cancel out.
fn apply_delta(active: &mut OrderedMap<OrderedF64, i64>, at: f64, delta: i64) {
    let total = *active.merge(OrderedF64(at), delta, |old, add| old + add);
    if total == 0 {
        active.remove(&OrderedF64(at));
    }
}

/// Largest running delta sum over the active boundaries in ascending
/// order: the deepest interval overlap in the current strip.
fn active_depth(active: &OrderedMap<OrderedF64, i64>) -> u32 {
    let mut depth: i64 = 0;
    let mut deepest: i64 = 0;
    active.for_each(|_, delta| {
        depth += delta;
        deepest = deepest.max(depth);
    });
    debug_assert_eq!(depth, 0, "unbalanced interval deltas");
    deepest.max(0) as u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum TickKind {
    Open,
    Close,
}

/// X-axis tick of one rectangle: where its coverage begins or ends, with
/// the y interval it spans.
#[derive(Clone, Copy, Debug)]
struct RectTick {
    x: f64,
    kind: TickKind,
    lo: f64,
    hi: f64,
    region: u64,
}

impl RectTick {
    /// Total order (coordinate, open before close, region id); stable and
    /// deterministic across identical-coordinate regions.
    fn order(a: &RectTick, b: &RectTick) -> Ordering {
        a.x.total_cmp(&b.x)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.region.cmp(&b.region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Coordinate;
    use heatmark_spatial::BoundingBox;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn rects(boxes: &[(f64, f64, f64, f64)]) -> Vec<Region> {
        boxes
            .iter()
            .enumerate()
            .map(|(i, &(min_x, min_y, max_x, max_y))| {
                Region::new(
                    i as u64,
                    Shape::Rect(BoundingBox::new(min_x, min_y, max_x, max_y)),
                )
            })
            .collect()
    }

    fn circles(items: &[(f64, f64, f64)]) -> Vec<Region> {
        items
            .iter()
            .enumerate()
            .map(|(i, &(x, y, r))| {
                Region::new(i as u64, Shape::Circle(Circle::new(Coordinate::new(x, y), r)))
            })
            .collect()
    }

    /// Interior overlap counted at the midpoint of every cell of the
    /// coordinate grid; exact, and O(n^3), so only for small inputs.
    fn brute_force_rect_overlap(regions: &[Region]) -> u32 {
        let boxes: Vec<BoundingBox> = regions
            .iter()
            .map(|r| match r.shape() {
                Shape::Rect(b) => *b,
                Shape::Circle(_) => unreachable!(),
            })
            .collect();
        if boxes.is_empty() {
            return 0;
        }
        let mut xs: Vec<f64> = boxes.iter().flat_map(|b| [b.min_x, b.max_x]).collect();
        let mut ys: Vec<f64> = boxes.iter().flat_map(|b| [b.min_y, b.max_y]).collect();
        xs.sort_by(f64::total_cmp);
        xs.dedup();
        ys.sort_by(f64::total_cmp);
        ys.dedup();

        let mut best = 0;
        for wx in xs.windows(2) {
            let mx = (wx[0] + wx[1]) / 2.0;
            for wy in ys.windows(2) {
                let my = (wy[0] + wy[1]) / 2.0;
                let depth = boxes
                    .iter()
                    .filter(|b| mx > b.min_x && mx < b.max_x && my > b.min_y && my < b.max_y)
                    .count();
                best = best.max(depth as u32);
            }
        }
        best.max(1)
    }

    #[test]
    fn test_no_regions() {
        assert_eq!(max_overlap(&[]), 0);
    }

    #[test]
    fn test_single_rect() {
        assert_eq!(max_overlap(&rects(&[(0.0, 0.0, 10.0, 10.0)])), 1);
    }

    #[test]
    fn test_pairwise_chain_overlaps() {
        // three rectangles overlapping only pairwise
        let regions = rects(&[
            (0.0, 0.0, 10.0, 10.0),
            (5.0, 5.0, 15.0, 15.0),
            (10.0, 10.0, 20.0, 20.0),
        ]);
        assert_eq!(max_overlap(&regions), 2);
    }

    #[test]
    fn test_nested_rects() {
        let regions = rects(&[
            (0.0, 0.0, 10.0, 10.0),
            (2.0, 2.0, 8.0, 8.0),
            (4.0, 4.0, 6.0, 6.0),
        ]);
        assert_eq!(max_overlap(&regions), 3);
    }

    #[test]
    fn test_identical_rects() {
        let regions = rects(&[(1.0, 1.0, 4.0, 4.0); 5]);
        assert_eq!(max_overlap(&regions), 5);
    }

    #[test]
    fn test_edge_touching_rects_do_not_overlap() {
        let regions = rects(&[
            (0.0, 0.0, 5.0, 5.0),
            (5.0, 0.0, 10.0, 5.0),
            (0.0, 5.0, 5.0, 10.0),
            (5.0, 5.0, 10.0, 10.0),
        ]);
        assert_eq!(max_overlap(&regions), 1);
    }

    #[test]
    fn test_disjoint_rects() {
        let regions = rects(&[(0.0, 0.0, 1.0, 1.0), (5.0, 5.0, 6.0, 6.0)]);
        assert_eq!(max_overlap(&regions), 1);
    }

    #[test]
    fn test_rect_overlap_only_in_y_strip() {
        // overlap in x ranges but disjoint y intervals
        let regions = rects(&[(0.0, 0.0, 10.0, 2.0), (2.0, 3.0, 8.0, 5.0)]);
        assert_eq!(max_overlap(&regions), 1);
    }

    #[test]
    fn test_rects_match_brute_force_on_random_inputs() {
        for seed in 0..1000u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let count = rng.gen_range(1..=12);
            // integer-valued coordinates force plenty of coincident edges
            let boxes: Vec<(f64, f64, f64, f64)> = (0..count)
                .map(|_| {
                    let x = rng.gen_range(0..20) as f64;
                    let y = rng.gen_range(0..20) as f64;
                    let w = rng.gen_range(1..8) as f64;
                    let h = rng.gen_range(1..8) as f64;
                    (x, y, x + w, y + h)
                })
                .collect();
            let regions = rects(&boxes);
            assert_eq!(
                max_rect_overlap(&regions),
                brute_force_rect_overlap(&regions),
                "seed {} boxes {:?}",
                seed,
                boxes
            );
        }
    }

    #[test]
    fn test_single_circle() {
        assert_eq!(max_overlap(&circles(&[(0.0, 0.0, 5.0)])), 1);
    }

    #[test]
    fn test_disjoint_circles() {
        let regions = circles(&[(0.0, 0.0, 1.0), (10.0, 0.0, 1.0), (0.0, 10.0, 1.0)]);
        assert_eq!(max_overlap(&regions), 1);
    }

    #[test]
    fn test_two_overlapping_circles() {
        let regions = circles(&[(0.0, 0.0, 1.0), (1.0, 0.0, 1.0)]);
        assert_eq!(max_overlap(&regions), 2);
    }

    #[test]
    fn test_concentric_circles() {
        let regions = circles(&[(3.0, 3.0, 1.0), (3.0, 3.0, 2.0), (3.0, 3.0, 5.0)]);
        assert_eq!(max_overlap(&regions), 3);
    }

    #[test]
    fn test_collinear_circle_stack() {
        // all three cover the column at x = 1
        let regions = circles(&[(0.0, 0.0, 2.0), (1.0, 0.0, 2.0), (2.0, 0.0, 2.0)]);
        assert_eq!(max_overlap(&regions), 3);
    }

    #[test]
    fn test_tangent_circles_do_not_overlap() {
        let regions = circles(&[(0.0, 0.0, 1.0), (2.0, 0.0, 1.0)]);
        assert_eq!(max_overlap(&regions), 1);
    }

    #[test]
    fn test_circle_pairs_match_intersection_geometry() {
        // unit circles one apart intersect at x = 0.5, y = +/- sqrt(3)/2
        let a = Circle::new(Coordinate::new(0.0, 0.0), 1.0);
        let b = Circle::new(Coordinate::new(1.0, 0.0), 1.0);
        let (x1, x2) = intersection_xs(&a, &b).unwrap();
        assert!((x1 - 0.5).abs() < 1e-9);
        assert!((x2 - 0.5).abs() < 1e-9);

        // concentric circles have no intersection points
        let inner = Circle::new(Coordinate::new(0.0, 0.0), 0.5);
        assert!(intersection_xs(&a, &inner).is_none());
    }
}
