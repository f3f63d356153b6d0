//! The node builder: orchestrates partition selection, division, gap
//! connection, and leaf finalization into the finished BSP tree.

use std::collections::HashSet;

use crate::consts::BSP_FACTOR_RANGE;
use crate::divide::divide_hedges;
use crate::error::BspError;
use crate::gaps::{self, GapReport};
use crate::halfedge::{FaceIx, HEdgeIx, HalfEdgeDs};
use crate::hedge_info::HedgeInfoTable;
use crate::initial::{build_initial_mesh, real_hedges, InitialMesh};
use crate::intersection::CutList;
use crate::mapdata::MapDescription;
use crate::output::{self, BuiltMap, NodeData, Tree};
use crate::partition::{pick_partition, PassStamps, Partition};
use crate::superblock::{BBox, SuperBlockIx, SuperBlockPool};
use crate::vertex_rings::VertexRings;

/// Drives one build from a [`MapDescription`] to a [`BuiltMap`]. Holds only
/// the one tunable the builder exposes; everything else is scratch state
/// local to a single [`Self::build`] call.
pub struct NodeBuilder {
    factor: i32,
}

/// Bookkeeping threaded through the whole recursion: the arenas, the
/// per-pass partition-selector state, and the cross-step diagnostics
/// aggregate, all in one place so `build_node`'s signature stays readable.
struct BuildState<'m> {
    ds: HalfEdgeDs,
    info: HedgeInfoTable,
    pool: SuperBlockPool,
    rings: VertexRings,
    map: &'m MapDescription,
    passes: PassStamps,
    cutlist: CutList,
    aggregate: GapReport,
    warned_mismatches: HashSet<(usize, usize)>,
    face_sectors: Vec<Option<usize>>,
}

impl NodeBuilder {
    pub fn new(factor: i32) -> Result<Self, BspError> {
        if !BSP_FACTOR_RANGE.contains(&factor) {
            return Err(BspError::FactorOutOfRange(factor));
        }
        Ok(NodeBuilder { factor })
    }

    /// Build the BSP tree for `map`: validate geometry, weave the initial
    /// mesh, then recursively partition until every leaf is convex.
    pub fn build(&self, map: &MapDescription) -> Result<BuiltMap, BspError> {
        if map.linedefs.is_empty() {
            return Err(BspError::EmptyMap);
        }
        for (i, ld) in map.linedefs.iter().enumerate() {
            let a = map.vertices[ld.v1];
            let b = map.vertices[ld.v2];
            if (a.x - b.x).abs() < f64::EPSILON && (a.y - b.y).abs() < f64::EPSILON {
                return Err(BspError::DegenerateLinedef { linedef: i, x: a.x, y: a.y });
            }
        }

        let mesh = build_initial_mesh(map);
        let reals = real_hedges(&mesh.info, &mesh);
        let InitialMesh { ds, info, rings, .. } = mesh;

        let root_bbox = root_bounding_box(map);
        let mut pool = SuperBlockPool::new();
        let root = pool.create_root(root_bbox);
        for h in reals {
            pool.add_hedge(&ds, &info, root, h);
        }

        let mut state = BuildState {
            ds,
            info,
            pool,
            rings,
            map,
            passes: PassStamps::new(map.linedefs.len()),
            cutlist: CutList::new(),
            aggregate: GapReport::default(),
            warned_mismatches: HashSet::new(),
            face_sectors: Vec::new(),
        };

        let tree = self.build_node(&mut state, root, 0)?;

        if !state.aggregate.unclosed.is_empty() {
            tracing::warn!(count = state.aggregate.unclosed.len(), "build finished with unclosed sectors");
        }

        Ok(output::to_built_map(&state.ds, &state.info, map, &state.face_sectors, tree, state.aggregate))
    }

    fn build_node(&self, state: &mut BuildState, block: SuperBlockIx, depth: u32) -> Result<Tree, BspError> {
        let picked = pick_partition(&state.ds, &state.info, &state.pool, block, self.factor, &mut state.passes);

        let Some(h) = picked else {
            let face = self.finalize_leaf(state, block, depth)?;
            return Ok(Tree::Leaf(face.0));
        };

        let partition = Partition::from_hedge(&state.ds, &state.info, h);
        let (right, left) =
            divide_hedges(&mut state.ds, &mut state.info, &mut state.pool, &mut state.rings, block, &partition, &mut state.cutlist)?;
        state.cutlist.merge_overlaps(partition.origin)?;

        let report = gaps::connect_gaps(
            &mut state.ds,
            &mut state.info,
            &mut state.pool,
            &mut state.rings,
            state.map,
            &state.cutlist,
            &partition,
            right,
            left,
            &mut state.warned_mismatches,
        );
        state.aggregate.unclosed.extend(report.unclosed);
        state.aggregate.mismatches.extend(report.mismatches);
        state.aggregate.mini_edges_created += report.mini_edges_created;
        state.cutlist.clear();

        let right_bbox = state.pool.find_hedge_bounds(&state.ds, right).unwrap_or(state.pool.get(right).bbox);
        let left_bbox = state.pool.find_hedge_bounds(&state.ds, left).unwrap_or(state.pool.get(left).bbox);

        let right_tree = self.build_node(state, right, depth + 1)?;
        let left_tree = self.build_node(state, left, depth + 1)?;

        Ok(Tree::Node(NodeData {
            x: partition.origin.0,
            y: partition.origin.1,
            dx: partition.dx,
            dy: partition.dy,
            right_bbox,
            left_bbox,
            right: Box::new(right_tree),
            left: Box::new(left_tree),
        }))
    }

    /// Switch `block`'s build-time half-edge list into the final linked
    /// ring: order clockwise around the centroid, splice `next`/`prev`,
    /// assign a face, and verify closure and sector uniformity (both
    /// diagnostics-only).
    fn finalize_leaf(&self, state: &mut BuildState, block: SuperBlockIx, depth: u32) -> Result<FaceIx, BspError> {
        let hedges = state.pool.drain_all(block);
        if !hedges.iter().any(|&h| state.info.get(h).is_real()) {
            return Err(BspError::LeafWithoutRealHedge { depth });
        }

        let (cx, cy) = centroid(&state.ds, &hedges);
        let mut ordered = hedges;
        ordered.sort_by(|&a, &b| {
            let aa = angle_from(&state.ds, a, cx, cy);
            let ab = angle_from(&state.ds, b, cx, cy);
            // Descending angle walks the ring clockwise.
            ab.partial_cmp(&aa).unwrap()
        });

        let n = ordered.len();
        for i in 0..n {
            let a = ordered[i];
            let b = ordered[(i + 1) % n];
            state.ds.hedge_mut(a).next = b;
            state.ds.hedge_mut(b).prev = a;
            if state.ds.hedge(a.twin()).origin != state.ds.hedge(b).origin {
                tracing::warn!(depth, "leaf boundary is not closed between two consecutive half-edges");
            }
        }

        let sectors: Vec<usize> = ordered.iter().filter_map(|&h| state.info.get(h).sector).collect();
        if sectors.windows(2).any(|w| w[0] != w[1]) {
            tracing::warn!(depth, "leaf mixes more than one sector among its real half-edges");
        }

        let first = ordered[0];
        let face = state.ds.create_face(first);
        for &h in &ordered {
            state.ds.hedge_mut(h).face = Some(face);
        }

        let idx = face.0 as usize;
        if idx >= state.face_sectors.len() {
            state.face_sectors.resize(idx + 1, None);
        }
        state.face_sectors[idx] = sectors.first().copied();

        Ok(face)
    }
}

fn root_bounding_box(map: &MapDescription) -> BBox {
    let mut bbox = BBox { min_x: f64::INFINITY, min_y: f64::INFINITY, max_x: f64::NEG_INFINITY, max_y: f64::NEG_INFINITY };
    for v in &map.vertices {
        bbox.min_x = bbox.min_x.min(v.x);
        bbox.min_y = bbox.min_y.min(v.y);
        bbox.max_x = bbox.max_x.max(v.x);
        bbox.max_y = bbox.max_y.max(v.y);
    }
    bbox
}

fn centroid(ds: &HalfEdgeDs, hedges: &[HEdgeIx]) -> (f64, f64) {
    let (mut sx, mut sy) = (0.0, 0.0);
    for &h in hedges {
        let (x, y) = ds.vertex(ds.hedge(h).origin).pos();
        sx += x;
        sy += y;
    }
    let n = hedges.len() as f64;
    (sx / n, sy / n)
}

fn angle_from(ds: &HalfEdgeDs, h: HEdgeIx, cx: f64, cy: f64) -> f64 {
    let (x, y) = ds.vertex(ds.hedge(h).origin).pos();
    (y - cy).atan2(x - cx)
}
