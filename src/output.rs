//! Render-facing output: the finished half-edge mesh plus the BSP tree of
//! Nodes and Faces, converted from the builder's arenas into a shape that
//! carries no build-only scratch.

use serde::Serialize;

use crate::gaps::GapReport;
use crate::halfedge::HalfEdgeDs;
use crate::hedge_info::{HedgeInfoTable, Side};
use crate::mapdata::MapDescription;
use crate::superblock::BBox;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutVertex {
    pub x: f64,
    pub y: f64,
}

/// One directed edge of the finished mesh. `sidedef` is the index into the
/// original map's sidedef table this half-edge was minted from; `None` for
/// a mini-edge synthesized along a partition line.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutHedge {
    pub origin: u32,
    pub twin: u32,
    pub next: u32,
    pub prev: u32,
    pub face: Option<u32>,
    pub sidedef: Option<usize>,
    pub length: f64,
    pub offset: f64,
    pub angle: f64,
}

/// A convex leaf region: one boundary half-edge plus the sector it borders
/// (verified uniform across the leaf's real half-edges at finalization).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutFace {
    pub edge: u32,
    pub sector: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeData {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub right_bbox: BBox,
    pub left_bbox: BBox,
    pub right: Box<Tree>,
    pub left: Box<Tree>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Tree {
    Node(NodeData),
    /// Index into `BuiltMap::faces`.
    Leaf(u32),
}

#[derive(Debug, Serialize)]
pub struct BuiltMap {
    pub vertices: Vec<OutVertex>,
    pub hedges: Vec<OutHedge>,
    pub faces: Vec<OutFace>,
    pub tree: Tree,
    /// Unclosed-sector and sector-mismatch diagnostics accumulated across
    /// every division step. Never fatal; the caller decides what to do
    /// with a non-empty report.
    pub diagnostics: GapReport,
}

/// Distance from the linedef's first vertex to `point`, used for texture
/// offset alignment; both points lie on the linedef's own line by
/// construction (real half-edges and their split pieces never leave it).
fn offset_along_linedef(map: &MapDescription, linedef: usize, point: (f64, f64)) -> f64 {
    let v1 = map.vertices[map.linedefs[linedef].v1];
    (point.0 - v1.x).hypot(point.1 - v1.y)
}

fn sidedef_for(map: &MapDescription, linedef: usize, side: Side) -> Option<usize> {
    let ld = &map.linedefs[linedef];
    match side {
        Side::Front => ld.front_sidedef,
        Side::Back => ld.back_sidedef,
    }
}

/// Assemble the final output from the builder's arenas. `face_sectors` is
/// indexed by `FaceIx`, populated at leaf finalization.
pub fn to_built_map(
    ds: &HalfEdgeDs,
    info: &HedgeInfoTable,
    map: &MapDescription,
    face_sectors: &[Option<usize>],
    tree: Tree,
    diagnostics: GapReport,
) -> BuiltMap {
    let vertices = ds.vertices.iter().map(|v| OutVertex { x: v.x, y: v.y }).collect();

    let hedges = ds
        .hedges
        .iter()
        .enumerate()
        .map(|(i, he)| {
            let h = crate::halfedge::HEdgeIx(i as u32);
            let hi = info.get(h);
            let origin_pos = ds.vertex(he.origin).pos();
            let (sidedef, offset) = match hi.linedef {
                Some(ld) => (sidedef_for(map, ld, hi.side), offset_along_linedef(map, ld, origin_pos)),
                None => (None, 0.0),
            };
            OutHedge {
                origin: he.origin.0,
                twin: h.twin().0,
                next: he.next.0,
                prev: he.prev.0,
                face: he.face.map(|f| f.0),
                sidedef,
                length: hi.length,
                offset,
                angle: hi.angle,
            }
        })
        .collect();

    let faces = ds
        .faces
        .iter()
        .enumerate()
        .map(|(i, f)| OutFace { edge: f.edge.0, sector: face_sectors.get(i).copied().flatten() })
        .collect();

    BuiltMap { vertices, hedges, faces, tree, diagnostics }
}
