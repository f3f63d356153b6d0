//! Build-only per-half-edge data: the linedef/sector/side a half-edge
//! belongs to, and its derived geometry (direction, length, angle,
//! perpendicular/parallel distance from the coordinate origin).
//!
//! Kept as a side table parallel to [`crate::halfedge::HalfEdgeDs`] rather
//! than fields on `HalfEdge` itself, so the final output types never carry
//! builder scratch state.

use crate::error::BspError;
use crate::halfedge::{HEdgeIx, HalfEdgeDs};
use crate::superblock::SuperBlockIx;

/// Which side of its linedef a half-edge was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

/// Derived geometry and authoring provenance for one half-edge.
#[derive(Debug, Clone, Copy)]
pub struct HedgeInfo {
    /// The linedef this half-edge was minted from. `None` for a mini-edge
    /// synthesized along a partition line.
    pub linedef: Option<usize>,
    /// The linedef whose infinite line generated this edge — equal to
    /// `linedef` for real edges, and the partitioning linedef for
    /// mini-edges and for pieces produced by splitting.
    pub source_linedef: Option<usize>,
    pub sector: Option<usize>,
    pub side: Side,
    pub dx: f64,
    pub dy: f64,
    pub length: f64,
    /// Degrees, 0 = East, increasing counter-clockwise.
    pub angle: f64,
    /// `p = oy*dx - ox*dy`
    pub perp: f64,
    /// `q = -ox*dx - oy*dy`
    pub para: f64,
    /// The SuperBlock currently holding this half-edge; `None` once it has
    /// been attached to a face.
    pub block: Option<SuperBlockIx>,
}

impl HedgeInfo {
    pub fn is_real(&self) -> bool {
        self.linedef.is_some()
    }
}

/// Parallel array keyed by [`HEdgeIx`].
#[derive(Debug, Default)]
pub struct HedgeInfoTable {
    infos: Vec<HedgeInfo>,
}

impl HedgeInfoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, h: HEdgeIx) -> &HedgeInfo {
        &self.infos[h.0 as usize]
    }

    pub fn get_mut(&mut self, h: HEdgeIx) -> &mut HedgeInfo {
        &mut self.infos[h.0 as usize]
    }

    /// Grow the table to cover a freshly-allocated half-edge, with
    /// placeholder geometry to be filled by [`Self::recompute`].
    pub fn push_pair(&mut self, a: HedgeInfo, b: HedgeInfo) {
        self.infos.push(a);
        self.infos.push(b);
    }

    /// Recompute `dx, dy, length, angle, perp, para` for `h` from its
    /// current endpoints. Called after every split and during initial
    /// construction.
    pub fn recompute(&mut self, ds: &HalfEdgeDs, h: HEdgeIx) {
        let (origin, far) = ds.endpoints(h);
        let dx = far.0 - origin.0;
        let dy = far.1 - origin.1;
        let length = (dx * dx + dy * dy).sqrt();
        let angle = dy.atan2(dx).to_degrees();
        let angle = if angle < 0.0 { angle + 360.0 } else { angle };
        let perp = origin.1 * dx - origin.0 * dy;
        let para = -origin.0 * dx - origin.1 * dy;
        let info = self.get_mut(h);
        info.dx = dx;
        info.dy = dy;
        info.length = length;
        info.angle = angle;
        info.perp = perp;
        info.para = para;
    }

    /// Split `h` at `(x, y)`, refreshing geometry on all four affected
    /// half-edges and propagating linedef/source/sector/side onto the two
    /// new pieces.
    pub fn split(&mut self, ds: &mut HalfEdgeDs, h: HEdgeIx, x: f64, y: f64) -> Result<HEdgeIx, BspError> {
        let th = h.twin();
        let (origin, far) = ds.endpoints(h);
        if !is_strictly_between(origin, far, (x, y)) {
            return Err(BspError::SplitOutsideEndpoints { hedge: h, x, y });
        }

        let h_info = *self.get(h);
        let th_info = *self.get(th);

        ds.split_half_edge(h, x, y);
        let n = ds.hedge(h).next;
        let nt = n.twin();

        // `n` continues h's side; `nt` continues th's side.
        self.push_pair(
            HedgeInfo { block: h_info.block, ..h_info },
            HedgeInfo { block: th_info.block, ..th_info },
        );

        for edge in [h, th, n, nt] {
            self.recompute(ds, edge);
        }
        Ok(n)
    }
}

/// Strict containment check for `split`'s precondition; collinearity is
/// assumed (callers compute `(x, y)` as a point on the edge's own line).
fn is_strictly_between(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > 1e-6 * (b.0 - a.0).hypot(b.1 - a.1).max(1.0) {
        return false;
    }
    let dot_a = (p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1);
    let len2 = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
    dot_a > 1e-9 && dot_a < len2 - 1e-9
}

/// Build the initial `HedgeInfoTable` entry for a freshly-minted real
/// half-edge, before geometry has been computed.
pub fn real_info(linedef: usize, side: Side, sector: Option<usize>) -> HedgeInfo {
    HedgeInfo {
        linedef: Some(linedef),
        source_linedef: Some(linedef),
        sector,
        side,
        dx: 0.0,
        dy: 0.0,
        length: 0.0,
        angle: 0.0,
        perp: 0.0,
        para: 0.0,
        block: None,
    }
}

/// Build the initial `HedgeInfoTable` entry for a mini-edge synthesized by
/// the gap connector along a partition line.
pub fn mini_info(source_linedef: Option<usize>, sector: Option<usize>, side: Side) -> HedgeInfo {
    HedgeInfo {
        linedef: None,
        source_linedef,
        sector,
        side,
        dx: 0.0,
        dy: 0.0,
        length: 0.0,
        angle: 0.0,
        perp: 0.0,
        para: 0.0,
        block: None,
    }
}
