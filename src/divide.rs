//! The divider: routes every half-edge in a SuperBlock subtree to the
//! right or left side of a chosen partition, splitting those that
//! straddle it and keeping the split vertex's ring membership consistent
//! so the gap connector can classify it afterward.

use crate::consts::DIST_EPSILON;
use crate::error::BspError;
use crate::halfedge::{HEdgeIx, HalfEdgeDs};
use crate::hedge_info::HedgeInfoTable;
use crate::intersection::{CutList, Intersection};
use crate::partition::Partition;
use crate::superblock::{SuperBlockIx, SuperBlockPool};
use crate::vertex_rings::VertexRings;

enum Side {
    Right,
    Left,
}

fn project(partition: &Partition, p: (f64, f64)) -> f64 {
    (p.0 - partition.origin.0) * partition.dx + (p.1 - partition.origin.1) * partition.dy
}

fn side_distance(partition: &Partition, p: (f64, f64)) -> f64 {
    let (ox, oy) = partition.origin;
    (p.1 - oy) * partition.dx - (p.0 - ox) * partition.dy
}

/// Intersection point of `partition`'s infinite line with the segment
/// `a`-`b`, using axis-aligned shortcuts where either line is horizontal
/// or vertical to avoid unnecessary floating-point drift.
fn intersect_point(partition: &Partition, a: (f64, f64), b: (f64, f64), pa: f64, pb: f64) -> (f64, f64) {
    if partition.dy == 0.0 {
        let y = partition.origin.1;
        let t = pa / (pa - pb);
        (a.0 + t * (b.0 - a.0), y)
    } else if partition.dx == 0.0 {
        let x = partition.origin.0;
        let t = pa / (pa - pb);
        (x, a.1 + t * (b.1 - a.1))
    } else if b.0 == a.0 {
        let x = a.0;
        let t = (x - partition.origin.0) / partition.dx;
        (x, partition.origin.1 + t * partition.dy)
    } else if b.1 == a.1 {
        let y = a.1;
        let t = (y - partition.origin.1) / partition.dy;
        (partition.origin.0 + t * partition.dx, y)
    } else {
        let t = pa / (pa - pb);
        (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
    }
}

/// Drain every half-edge reachable from `source` (which is released in the
/// process) and route each to a freshly allocated right/left SuperBlock
/// pair, both starting with `source`'s bounding box, recording every
/// crossing point into `cutlist`.
#[allow(clippy::too_many_arguments)]
pub fn divide_hedges(
    ds: &mut HalfEdgeDs,
    info: &mut HedgeInfoTable,
    pool: &mut SuperBlockPool,
    rings: &mut VertexRings,
    source: SuperBlockIx,
    partition: &Partition,
    cutlist: &mut CutList,
) -> Result<(SuperBlockIx, SuperBlockIx), BspError> {
    let bbox = pool.get(source).bbox;
    let right = pool.alloc(bbox, None);
    let left = pool.alloc(bbox, None);

    let drained = pool.drain_all(source);

    for h in drained {
        route_one(ds, info, pool, rings, right, left, partition, cutlist, h)?;
    }

    Ok((right, left))
}

#[allow(clippy::too_many_arguments)]
fn route_one(
    ds: &mut HalfEdgeDs,
    info: &mut HedgeInfoTable,
    pool: &mut SuperBlockPool,
    rings: &mut VertexRings,
    right: SuperBlockIx,
    left: SuperBlockIx,
    partition: &Partition,
    cutlist: &mut CutList,
    h: HEdgeIx,
) -> Result<(), BspError> {
    let hi = *info.get(h);
    let (a, b) = ds.endpoints(h);
    let (pa, pb) = if hi.source_linedef.is_some() && hi.source_linedef == partition.source_linedef {
        (0.0, 0.0)
    } else {
        (side_distance(partition, a), side_distance(partition, b))
    };

    let a_right = pa > DIST_EPSILON;
    let a_left = pa < -DIST_EPSILON;
    let b_right = pb > DIST_EPSILON;
    let b_left = pb < -DIST_EPSILON;

    if !a_right && !a_left && !b_right && !b_left {
        record_intersection(ds, cutlist, partition, ds.hedge(h).origin);
        record_intersection(ds, cutlist, partition, ds.hedge(h.twin()).origin);
        let dot = hi.dx * partition.dx + hi.dy * partition.dy;
        let side = if dot >= 0.0 { Side::Right } else { Side::Left };
        push(ds, info, pool, right, left, side, h);
        return Ok(());
    }

    if !(a_left || b_left) {
        if pa.abs() <= DIST_EPSILON {
            record_intersection(ds, cutlist, partition, ds.hedge(h).origin);
        }
        if pb.abs() <= DIST_EPSILON {
            record_intersection(ds, cutlist, partition, ds.hedge(h.twin()).origin);
        }
        push(ds, info, pool, right, left, Side::Right, h);
        return Ok(());
    }

    if !(a_right || b_right) {
        if pa.abs() <= DIST_EPSILON {
            record_intersection(ds, cutlist, partition, ds.hedge(h).origin);
        }
        if pb.abs() <= DIST_EPSILON {
            record_intersection(ds, cutlist, partition, ds.hedge(h.twin()).origin);
        }
        push(ds, info, pool, right, left, Side::Left, h);
        return Ok(());
    }

    // Straddles: split and route the two pieces to their respective sides.
    let (x, y) = intersect_point(partition, a, b, pa, pb);
    let th = h.twin();
    let old_far_vertex = ds.hedge(th).origin;
    let n = info.split(ds, h, x, y)?;
    let nt = n.twin();
    // `split` leaves h ending at the new vertex, so h's twin now origins
    // there too; `th`'s old ring entry at `old_far_vertex` is stale, and
    // `nt` (brand new) takes its place there.
    let new_vertex = ds.hedge(th).origin;
    record_intersection(ds, cutlist, partition, new_vertex);

    rings.remove(old_far_vertex, th);
    if info.get(th).sector.is_some() {
        rings.insert(ds, info, new_vertex, th);
    }
    if info.get(n).sector.is_some() {
        rings.insert(ds, info, new_vertex, n);
    }
    if info.get(nt).sector.is_some() {
        rings.insert(ds, info, old_far_vertex, nt);
    }

    let (h_side, n_side) = if pa > 0.0 { (Side::Right, Side::Left) } else { (Side::Left, Side::Right) };
    push(ds, info, pool, right, left, h_side, h);
    push(ds, info, pool, right, left, n_side, n);
    Ok(())
}

fn record_intersection(ds: &HalfEdgeDs, cutlist: &mut CutList, partition: &Partition, vertex: crate::halfedge::VertexIx) {
    if cutlist.find_by_vertex(vertex).is_some() {
        return;
    }
    let (x, y) = ds.vertex(vertex).pos();
    let distance = project(partition, (x, y));
    cutlist.insert(Intersection { vertex, distance, x, y });
}

fn push(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    pool: &mut SuperBlockPool,
    right: SuperBlockIx,
    left: SuperBlockIx,
    side: Side,
    h: HEdgeIx,
) {
    let target = match side {
        Side::Right => right,
        Side::Left => left,
    };
    pool.add_hedge(ds, info, target, h);
}
