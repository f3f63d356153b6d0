//! Per-vertex rings of outgoing half-edges, sorted by angle.
//!
//! Kept as an explicit, separate structure rather than overloading
//! [`crate::halfedge::HalfEdge`]'s `next`/`prev` fields: build-time
//! vertex-rotation order and the final face boundary cycle are different
//! representations and should not share storage. `next`/`prev` are
//! meaningless until
//! [`crate::builder::NodeBuilder`] assigns a half-edge to a face at leaf
//! finalization; until then, this is the only way to walk "around a
//! vertex".

use smallvec::SmallVec;

use crate::halfedge::{HEdgeIx, HalfEdgeDs, VertexIx};
use crate::hedge_info::HedgeInfoTable;

/// A vertex's outgoing half-edges rarely number more than a handful (a
/// junction of 4+ linedefs is already unusual); inline storage avoids a
/// heap allocation per vertex for the common case.
type Ring = SmallVec<[HEdgeIx; 4]>;

#[derive(Debug, Default)]
pub struct VertexRings {
    rings: Vec<Ring>,
}

impl VertexRings {
    pub fn new(num_vertices: usize) -> Self {
        VertexRings { rings: vec![Ring::new(); num_vertices] }
    }

    pub fn ring(&self, vertex: VertexIx) -> &[HEdgeIx] {
        &self.rings[vertex.0 as usize]
    }

    /// Insert `h` (an edge outgoing from `vertex`) into that vertex's ring,
    /// keeping it sorted ascending by angle. Grows the backing table if `h`
    /// mints a vertex beyond what `new` was sized for (split points do
    /// exactly this).
    pub fn insert(&mut self, ds: &HalfEdgeDs, info: &HedgeInfoTable, vertex: VertexIx, h: HEdgeIx) {
        debug_assert_eq!(ds.hedge(h).origin, vertex);
        let idx = vertex.0 as usize;
        if idx >= self.rings.len() {
            self.rings.resize(idx + 1, Ring::new());
        }
        let angle = info.get(h).angle;
        let ring = &mut self.rings[idx];
        let pos = ring.partition_point(|&e| info.get(e).angle <= angle);
        ring.insert(pos, h);
    }

    /// Remove `h` from `vertex`'s ring, if present. A no-op if `h` was
    /// never inserted there (e.g. it was never "real" in the first place).
    /// Used when a split changes a half-edge's origin out from under it.
    pub fn remove(&mut self, vertex: VertexIx, h: HEdgeIx) {
        let idx = vertex.0 as usize;
        if idx >= self.rings.len() {
            return;
        }
        let ring = &mut self.rings[idx];
        if let Some(pos) = ring.iter().position(|&e| e == h) {
            ring.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hedge_info::{real_info, Side};

    #[test]
    fn insert_keeps_ring_sorted_by_angle() {
        let mut ds = HalfEdgeDs::new();
        let mut info = HedgeInfoTable::new();
        let center = ds.create_vertex(0.0, 0.0);
        let e = ds.create_vertex(10.0, 0.0);
        let n = ds.create_vertex(0.0, 10.0);
        let w = ds.create_vertex(-10.0, 0.0);

        let mut rings = VertexRings::new(4);
        for (far, ld) in [(e, 0usize), (n, 1), (w, 2)] {
            let (h, th) = ds.create_hedge_pair(center, far);
            info.push_pair(real_info(ld, Side::Front, Some(0)), real_info(ld, Side::Back, None));
            info.recompute(&ds, h);
            info.recompute(&ds, th);
            rings.insert(&ds, &info, center, h);
        }

        let angles: Vec<f64> = rings.ring(center).iter().map(|&h| info.get(h).angle).collect();
        assert_eq!(angles.len(), 3);
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    }
}
