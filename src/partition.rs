//! The partition selector: for a SuperBlock, choose the half-edge whose
//! infinite line minimizes the partition cost.

use crate::consts::{DIST_EPSILON, IFFY_LEN};
use crate::halfedge::{HEdgeIx, HalfEdgeDs};
use crate::hedge_info::HedgeInfoTable;
use crate::superblock::{BBox, SuperBlockIx, SuperBlockPool};

/// A candidate partition's line, derived from a half-edge's origin and
/// direction at the moment it was picked.
#[derive(Debug, Clone, Copy)]
pub struct Partition {
    pub origin: (f64, f64),
    pub dx: f64,
    pub dy: f64,
    pub length: f64,
    pub source_linedef: Option<usize>,
}

impl Partition {
    pub fn from_hedge(ds: &HalfEdgeDs, info: &HedgeInfoTable, h: HEdgeIx) -> Self {
        let origin = ds.vertex(ds.hedge(h).origin).pos();
        let i = info.get(h);
        Partition { origin, dx: i.dx, dy: i.dy, length: i.length, source_linedef: i.source_linedef }
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.dx == 0.0 || self.dy == 0.0
    }

    /// Perpendicular distance of point `p` from this line, using the same
    /// `p = oy*dx - ox*dy` convention as `HedgeInfo`.
    fn side_distance(&self, p: (f64, f64)) -> f64 {
        let (ox, oy) = self.origin;
        (p.1 - oy) * self.dx - (p.0 - ox) * self.dy
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct EvalInfo {
    cost: f64,
    splits: u32,
    iffy: u32,
    near_miss: u32,
    real_left: u32,
    real_right: u32,
    mini_left: u32,
    mini_right: u32,
}

/// Outcome of evaluating one candidate against the whole SuperBlock tree.
#[derive(Debug, Clone, Copy)]
pub struct PartitionCost {
    pub cost: f64,
}

/// Classification of a whole SuperBlock's half-edges relative to a
/// candidate line, using only the block's bounding box (the "whole-block
/// test" optimization).
enum BlockSide {
    Right,
    Left,
    Straddles,
}

fn classify_block(partition: &Partition, bbox: &BBox) -> BlockSide {
    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
        (bbox.min_x, bbox.max_y),
    ];
    let mut any_right = false;
    let mut any_left = false;
    for c in corners {
        let d = partition.side_distance(c);
        if d > DIST_EPSILON {
            any_right = true;
        } else if d < -DIST_EPSILON {
            any_left = true;
        } else {
            any_right = true;
            any_left = true;
        }
    }
    match (any_right, any_left) {
        (true, false) => BlockSide::Right,
        (false, true) => BlockSide::Left,
        _ => BlockSide::Straddles,
    }
}

/// Evaluate `partition` (derived from `candidate`) against every half-edge
/// reachable from `block`. Returns `None` if the candidate is rejected
/// (either side would end up with zero real half-edges).
fn evaluate_partition(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    pool: &SuperBlockPool,
    block: SuperBlockIx,
    partition: &Partition,
    candidate_linedef: Option<usize>,
    factor: f64,
) -> Option<PartitionCost> {
    let mut eval = EvalInfo::default();
    evaluate_block(ds, info, pool, block, partition, candidate_linedef, factor, &mut eval);

    if eval.real_left == 0 || eval.real_right == 0 {
        return None;
    }

    let mut cost = 100.0 * eval.splits as f64
        + 100.0 * (eval.real_left as f64 - eval.real_right as f64).abs()
        + 50.0 * (eval.mini_left as f64 - eval.mini_right as f64).abs();
    if !partition.is_axis_aligned() {
        cost += 25.0;
    }
    cost += eval.cost;
    Some(PartitionCost { cost })
}

fn evaluate_block(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    pool: &SuperBlockPool,
    block: SuperBlockIx,
    partition: &Partition,
    candidate_linedef: Option<usize>,
    factor: f64,
    eval: &mut EvalInfo,
) {
    let b = pool.get(block);
    match classify_block(partition, &b.bbox) {
        BlockSide::Right => {
            eval.real_right += b.real_num;
            eval.mini_right += b.mini_num;
            return;
        }
        BlockSide::Left => {
            eval.real_left += b.real_num;
            eval.mini_left += b.mini_num;
            return;
        }
        BlockSide::Straddles => {}
    }

    for &h in b.hedges() {
        evaluate_one(ds, info, partition, candidate_linedef, factor, h, eval);
    }
    for child in b.children.into_iter().flatten() {
        evaluate_block(ds, info, pool, child, partition, candidate_linedef, factor, eval);
    }
}

fn evaluate_one(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    partition: &Partition,
    candidate_linedef: Option<usize>,
    factor: f64,
    h: HEdgeIx,
    eval: &mut EvalInfo,
) {
    let hi = info.get(h);
    let is_real = hi.is_real();

    let (a, b) = ds.endpoints(h);
    let (pa, pb) = if candidate_linedef.is_some() && hi.source_linedef == candidate_linedef {
        (0.0, 0.0)
    } else {
        (partition.side_distance(a), partition.side_distance(b))
    };

    let a_right = pa > DIST_EPSILON;
    let a_left = pa < -DIST_EPSILON;
    let b_right = pb > DIST_EPSILON;
    let b_left = pb < -DIST_EPSILON;

    if !a_right && !a_left && !b_right && !b_left {
        // Collinear. Direction relative to the partition decides the side.
        let dot = hi.dx * partition.dx + hi.dy * partition.dy;
        if dot >= 0.0 {
            bump_right(eval, is_real);
        } else {
            bump_left(eval, is_real);
        }
        return;
    }

    if !(a_left || b_left) {
        // Entirely on (or touching) the right.
        bump_right(eval, is_real);
        near_miss_penalty_right(pa, pb, factor, eval);
        return;
    }

    if !(a_right || b_right) {
        bump_left(eval, is_real);
        near_miss_penalty_left(pa, pb, factor, eval);
        return;
    }

    // Straddles: genuine split.
    eval.splits += 1;
    let length = hi.length;
    let t = pa / (pa - pb);
    let split_from_a = t * length;
    let split_from_b = (1.0 - t) * length;
    if split_from_a < IFFY_LEN || split_from_b < IFFY_LEN {
        eval.iffy += 1;
        let min_frag = split_from_a.min(split_from_b).max(1e-6);
        eval.cost += 140.0 * factor * ((IFFY_LEN / min_frag).powi(2) - 1.0);
    }
    bump_right(eval, is_real);
    bump_left(eval, is_real);
}

fn bump_right(eval: &mut EvalInfo, is_real: bool) {
    if is_real {
        eval.real_right += 1;
    } else {
        eval.mini_right += 1;
    }
}

fn bump_left(eval: &mut EvalInfo, is_real: bool) {
    if is_real {
        eval.real_left += 1;
    } else {
        eval.mini_left += 1;
    }
}

/// Near-miss surcharge for a half-edge classified right (possibly grazing
/// the line). Exempt when both ends sit comfortably clear of the line, or
/// when one end sits on the line and the other is already clear.
fn near_miss_penalty_right(pa: f64, pb: f64, factor: f64, eval: &mut EvalInfo) {
    let exempt = (pa >= IFFY_LEN && pb >= IFFY_LEN)
        || (pa <= DIST_EPSILON && pb >= IFFY_LEN)
        || (pb <= DIST_EPSILON && pa >= IFFY_LEN);
    if exempt {
        return;
    }
    eval.near_miss += 1;
    let qnty = if pa <= DIST_EPSILON || pb <= DIST_EPSILON { IFFY_LEN / pa.max(pb) } else { IFFY_LEN / pa.min(pb) };
    eval.cost += 100.0 * factor * (qnty * qnty - 1.0);
}

/// Mirror of [`near_miss_penalty_right`] for the left side. The constant
/// (70 rather than 100) and the exemption conditions are not a simple
/// sign-flip of the right side's.
fn near_miss_penalty_left(pa: f64, pb: f64, factor: f64, eval: &mut EvalInfo) {
    let exempt = (pa <= -IFFY_LEN && pb <= -IFFY_LEN)
        || (pa >= -DIST_EPSILON && pb <= -IFFY_LEN)
        || (pb >= -DIST_EPSILON && pa <= -IFFY_LEN);
    if exempt {
        return;
    }
    eval.near_miss += 1;
    let qnty = if pa >= -DIST_EPSILON || pb >= -DIST_EPSILON { IFFY_LEN / -pa.min(pb) } else { IFFY_LEN / -pa.max(pb) };
    eval.cost += 70.0 * factor * (qnty * qnty - 1.0);
}

/// Per-linedef "already considered in this selection pass" stamps, indexed
/// by linedef. Avoids an O(n) reset between passes: a linedef is skipped
/// once its stamp equals the current pass counter.
#[derive(Debug, Default)]
pub struct PassStamps {
    stamps: Vec<u64>,
    current: u64,
}

impl PassStamps {
    pub fn new(num_linedefs: usize) -> Self {
        PassStamps { stamps: vec![0; num_linedefs], current: 0 }
    }

    fn start_pass(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Returns `true` the first time `linedef` is seen in the current pass.
    fn mark(&mut self, linedef: usize) -> bool {
        if self.stamps[linedef] == self.current {
            false
        } else {
            self.stamps[linedef] = self.current;
            true
        }
    }
}

/// Scan every real half-edge in `block` as a candidate
/// partition, returning the index of the lowest-cost choice, or `None` if
/// the block is already convex.
pub fn pick_partition(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    pool: &SuperBlockPool,
    block: SuperBlockIx,
    factor: i32,
    passes: &mut PassStamps,
) -> Option<HEdgeIx> {
    passes.start_pass();
    let mut best: Option<(HEdgeIx, f64)> = None;
    pick_partition_worker(ds, info, pool, block, block, factor as f64, passes, &mut best);
    best.map(|(h, _)| h)
}

fn pick_partition_worker(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    pool: &SuperBlockPool,
    root: SuperBlockIx,
    block: SuperBlockIx,
    factor: f64,
    passes: &mut PassStamps,
    best: &mut Option<(HEdgeIx, f64)>,
) {
    let b = pool.get(block);
    for &h in b.hedges() {
        let hi = info.get(h);
        let Some(linedef) = hi.linedef else { continue };
        if !passes.mark(linedef) {
            continue;
        }
        let partition = Partition::from_hedge(ds, info, h);
        if let Some(cost) = evaluate_partition(ds, info, pool, root, &partition, hi.source_linedef, factor) {
            let better = match best {
                Some((_, best_cost)) => cost.cost < *best_cost,
                None => true,
            };
            if better {
                *best = Some((h, cost.cost));
            }
        }
    }
    let children = b.children;
    for child in children.into_iter().flatten() {
        pick_partition_worker(ds, info, pool, root, child, factor, passes, best);
    }
}
