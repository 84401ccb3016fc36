//! Hilbert curve ordering for the packed bulk loader.
//!
//! Sorting boxes by the Hilbert rank of their centers keeps spatially close
//! entries adjacent in the packing order, so the packed leaves end up with
//! tight bounding boxes without a full sort-tile pass.

use crate::bounding_box::BoundingBox;

/// Curve order used for ranking; 2^16 grid cells per axis.
const HILBERT_ORDER: u32 = 16;

/// Ranks the center of `bbox` along a Hilbert curve covering `world`.
///
/// Ranks are only meaningful relative to other ranks computed against the
/// same `world` box. Centers outside `world` are clamped onto it, and a
/// degenerate world axis maps every center to the middle cell of that axis.
pub fn hilbert_rank(bbox: &BoundingBox, world: &BoundingBox) -> u64 {
    let (cx, cy) = bbox.center();
    let cells = 1u64 << HILBERT_ORDER;
    let x = grid_cell(cx, world.min_x, world.max_x, cells);
    let y = grid_cell(cy, world.min_y, world.max_y, cells);
    curve_distance(cells, x, y)
}

/// Maps a coordinate into a discrete cell index in `[0, cells)`.
fn grid_cell(v: f64, lo: f64, hi: f64, cells: u64) -> u64 {
    let range = hi - lo;
    if range <= 0.0 {
        return cells / 2;
    }
    let norm = ((v - lo) / range).clamp(0.0, 1.0);
    ((norm * (cells as f64 - 1.0)) as u64).min(cells - 1)
}

/// Converts grid coordinates to a distance along the Hilbert curve, walking
/// the quadrants from coarse to fine and rotating the frame as the curve
/// does.
fn curve_distance(cells: u64, mut x: u64, mut y: u64) -> u64 {
    let mut d = 0u64;
    let mut s = cells / 2;
    while s > 0 {
        let rx = u64::from(x & s > 0);
        let ry = u64::from(y & s > 0);
        d += s * s * ((3 * rx) ^ ry);

        // rotate the quadrant so the sub-curve starts at its origin
        if ry == 0 {
            if rx == 1 {
                x = s.wrapping_sub(1).wrapping_sub(x);
                y = s.wrapping_sub(1).wrapping_sub(y);
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}
