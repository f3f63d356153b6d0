//! Initial half-edge construction from the flat linedef list, including the
//! window-effect pre-pass.

use std::collections::HashMap;

use crate::halfedge::{HEdgeIx, HalfEdgeDs, VertexIx};
use crate::hedge_info::{real_info, HedgeInfoTable, Side};
use crate::mapdata::MapDescription;
use crate::vertex_rings::VertexRings;

/// One linedef's minted pair, regardless of whether either side ended up
/// "real" (sector-backed).
#[derive(Debug, Clone, Copy)]
pub struct LinedefHedges {
    pub front: HEdgeIx,
    pub back: HEdgeIx,
}

pub struct InitialMesh {
    pub ds: HalfEdgeDs,
    pub info: HedgeInfoTable,
    pub rings: VertexRings,
    pub per_linedef: Vec<LinedefHedges>,
}

/// How many incident linedefs at `vertex` have exactly one sidedef.
fn one_sided_neighbor_count(map: &MapDescription, vertex: usize) -> usize {
    map.linedefs
        .iter()
        .filter(|ld| (ld.v1 == vertex || ld.v2 == vertex) && ld.front_sidedef.is_some() != ld.back_sidedef.is_some())
        .count()
}

/// Nearest linedef crossing an axis-aligned ray cast from `origin` along
/// `(dx, dy)` (exactly one of which is nonzero), excluding `skip_linedef`
/// and any linedef touching `origin` itself. Returns the hit's distance and
/// the sector facing back toward the ray origin.
fn probe_ray(map: &MapDescription, origin: (f64, f64), dx: f64, dy: f64, skip_linedef: usize) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for (i, ld) in map.linedefs.iter().enumerate() {
        if i == skip_linedef {
            continue;
        }
        let a = map.vertices[ld.v1];
        let b = map.vertices[ld.v2];

        let (hit, dist) = if dx != 0.0 {
            // Horizontal ray: does the linedef cross y = origin.1?
            if (a.y - origin.1) * (b.y - origin.1) > 0.0 {
                (None, 0.0)
            } else if (a.y - b.y).abs() < 1e-9 {
                (None, 0.0)
            } else {
                let t = (origin.1 - a.y) / (b.y - a.y);
                let x = a.x + t * (b.x - a.x);
                let d = x - origin.0;
                if d * dx > 1e-9 {
                    (Some(x), d.abs())
                } else {
                    (None, 0.0)
                }
            }
        } else {
            if (a.x - origin.0) * (b.x - origin.0) > 0.0 {
                (None, 0.0)
            } else if (a.x - b.x).abs() < 1e-9 {
                (None, 0.0)
            } else {
                let t = (origin.0 - a.x) / (b.x - a.x);
                let y = a.y + t * (b.y - a.y);
                let d = y - origin.1;
                if d * dy > 1e-9 {
                    (Some(y), d.abs())
                } else {
                    (None, 0.0)
                }
            }
        };

        if hit.is_none() {
            continue;
        }
        // The sector facing back toward the probe origin: for a
        // horizontal ray hitting a mostly-vertical-ish edge we take the
        // side whose sidedef sits on the origin's side of the line; as a
        // tractable approximation we take the edge's front sector if one
        // exists, else its back sector.
        let Some(sector) = ld.front_sidedef.map(|s| map.sidedefs[s].sector).or_else(|| ld.back_sidedef.map(|s| map.sidedefs[s].sector)) else {
            continue;
        };
        if best.is_none_or(|(bd, _)| dist < bd) {
            best = Some((dist, sector));
        }
    }
    best
}

/// Compute the window-effect retarget sector for every qualifying
/// one-sided linedef, per the odd-neighbor-count heuristic of §4.7.
fn window_effect_targets(map: &MapDescription) -> HashMap<usize, usize> {
    let mut targets = HashMap::new();
    for (i, ld) in map.linedefs.iter().enumerate() {
        if ld.front_sidedef.is_some() == ld.back_sidedef.is_some() {
            continue; // not one-sided
        }
        let a = map.vertices[ld.v1];
        let b = map.vertices[ld.v2];
        let (ldx, ldy) = (b.x - a.x, b.y - a.y);
        let dominant_horizontal = ldx.abs() >= ldy.abs();

        for &v in &[ld.v1, ld.v2] {
            let count = one_sided_neighbor_count(map, v);
            if count <= 1 || count % 2 == 0 {
                continue;
            }
            let origin = map.vertices[v];
            let (probe_dx, probe_dy) = if dominant_horizontal { (0.0, 1.0) } else { (1.0, 0.0) };

            let pos = probe_ray(map, (origin.x, origin.y), probe_dx, probe_dy, i);
            let neg = probe_ray(map, (origin.x, origin.y), -probe_dx, -probe_dy, i);
            if let (Some((_, s1)), Some(_)) = (pos, neg) {
                targets.entry(i).or_insert(s1);
                break;
            }
        }
    }
    targets
}

/// Mint twinned half-edge pairs for every linedef, run the window-effect
/// pre-pass, weave per-vertex rings, and populate the root SuperBlock's
/// source list (the caller inserts into an actual SuperBlock once it has
/// sized the root bounding box).
pub fn build_initial_mesh(map: &MapDescription) -> InitialMesh {
    let mut ds = HalfEdgeDs::new();
    let mut info = HedgeInfoTable::new();
    let verts: Vec<VertexIx> = map.vertices.iter().map(|v| ds.create_vertex(v.x, v.y)).collect();

    let window_targets = window_effect_targets(map);

    let mut per_linedef = Vec::with_capacity(map.linedefs.len());
    for (i, ld) in map.linedefs.iter().enumerate() {
        let v1 = verts[ld.v1];
        let v2 = verts[ld.v2];
        let (front, back) = ds.create_hedge_pair(v1, v2);

        let front_sector = ld.front_sidedef.map(|s| map.sidedefs[s].sector);
        let mut back_sector = ld.back_sidedef.map(|s| map.sidedefs[s].sector);
        if back_sector.is_none() && ld.front_sidedef.is_some() {
            back_sector = window_targets.get(&i).copied();
        }
        let mut front_sector = front_sector;
        if front_sector.is_none() && ld.back_sidedef.is_some() {
            front_sector = window_targets.get(&i).copied();
        }

        info.push_pair(real_info(i, Side::Front, front_sector), real_info(i, Side::Back, back_sector));
        info.recompute(&ds, front);
        info.recompute(&ds, back);

        per_linedef.push(LinedefHedges { front, back });
    }

    let mut rings = VertexRings::new(map.vertices.len());
    for lh in &per_linedef {
        for h in [lh.front, lh.back] {
            if info.get(h).sector.is_some() {
                rings.insert(&ds, &info, ds.hedge(h).origin, h);
                let origin = ds.hedge(h).origin;
                if ds.vertex(origin).edge.is_none() {
                    ds.vertex_mut(origin).edge = Some(h);
                }
            }
        }
    }

    InitialMesh { ds, info, rings, per_linedef }
}

/// Every half-edge that should be inserted into the root SuperBlock: both
/// directions of a two-sided linedef, or whichever direction ended up
/// "real" for a one-sided (or window-retargeted) one.
pub fn real_hedges(info: &HedgeInfoTable, mesh: &InitialMesh) -> Vec<HEdgeIx> {
    mesh.per_linedef
        .iter()
        .flat_map(|lh| [lh.front, lh.back])
        .filter(|&h| info.get(h).sector.is_some())
        .collect()
}
