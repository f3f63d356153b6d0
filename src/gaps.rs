//! The gap connector: after a division step, walks the intersection list
//! pairwise and inserts twinned mini-edges across every open gap.

use std::collections::HashSet;

use crate::consts::ANG_EPSILON;
use crate::halfedge::{HalfEdgeDs, VertexIx};
use crate::hedge_info::{self, HedgeInfoTable, Side};
use crate::intersection::CutList;
use crate::mapdata::MapDescription;
use crate::partition::Partition;
use crate::superblock::{SuperBlockIx, SuperBlockPool};
use crate::vertex_rings::VertexRings;

/// A sector the builder could not close off properly at a given point.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct UnclosedSector {
    pub sector: usize,
    pub x: f64,
    pub y: f64,
}

/// Two adjacent real half-edges across a gap disagreed about which sector
/// they border.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SectorMismatch {
    pub a: usize,
    pub b: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct GapReport {
    pub unclosed: Vec<UnclosedSector>,
    pub mismatches: Vec<SectorMismatch>,
    pub mini_edges_created: u32,
}

fn normalize_angle(a: f64) -> f64 {
    let mut a = a % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a
}

fn circular_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}

/// Does any half-edge outgoing from `vertex` run parallel to the partition
/// (in either direction), within `ANG_EPSILON`?
fn has_aligned_hedge(rings: &VertexRings, info: &HedgeInfoTable, vertex: VertexIx, partition_angle: f64) -> bool {
    rings.ring(vertex).iter().any(|&h| {
        let a = info.get(h).angle;
        circular_diff(a, partition_angle) < ANG_EPSILON || circular_diff(a, normalize_angle(partition_angle + 180.0)) < ANG_EPSILON
    })
}

/// Probe the angular wedge at `vertex` that the ray at `probe_angle`
/// (degrees) falls into, and return the sector occupying it, if any.
/// `None` means the wedge is solid (closed): it borders no sector. The
/// wedge between two angularly-adjacent outgoing half-edges is attributed
/// to the lower-angled edge's own sector (see `DESIGN.md` for why).
fn vertex_check_open(rings: &VertexRings, info: &HedgeInfoTable, vertex: VertexIx, probe_angle: f64) -> Option<usize> {
    let ring = rings.ring(vertex);
    if ring.is_empty() {
        return None;
    }
    let probe_angle = normalize_angle(probe_angle);
    let n = ring.len();
    for i in 0..n {
        let a0 = info.get(ring[i]).angle;
        let a1 = info.get(ring[(i + 1) % n]).angle;
        let in_wedge = if a0 <= a1 {
            probe_angle >= a0 && probe_angle < a1
        } else {
            // Wraps past 0 degrees.
            probe_angle >= a0 || probe_angle < a1
        };
        if in_wedge {
            return info.get(ring[i]).sector;
        }
    }
    info.get(ring[n - 1]).sector
}

/// Whether `sector` appears as both the front and back sector of some
/// linedef — the self-referencing-sector authoring trick.
fn is_self_referencing(map: &MapDescription, sector: usize) -> bool {
    map.linedefs.iter().any(|ld| {
        let front = ld.front_sidedef.map(|s| map.sidedefs[s].sector);
        let back = ld.back_sidedef.map(|s| map.sidedefs[s].sector);
        front == Some(sector) && back == Some(sector)
    })
}

#[allow(clippy::too_many_arguments)]
pub fn connect_gaps(
    ds: &mut HalfEdgeDs,
    info: &mut HedgeInfoTable,
    pool: &mut SuperBlockPool,
    rings: &mut VertexRings,
    map: &MapDescription,
    cutlist: &CutList,
    partition: &Partition,
    right: SuperBlockIx,
    left: SuperBlockIx,
    warned_mismatches: &mut HashSet<(usize, usize)>,
) -> GapReport {
    let mut report = GapReport::default();
    let partition_angle = normalize_angle(partition.dy.atan2(partition.dx).to_degrees());

    let entries: Vec<_> = cutlist.iter().copied().collect();
    for pair in entries.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);

        if has_aligned_hedge(rings, info, curr.vertex, partition_angle) {
            continue;
        }

        let near = vertex_check_open(rings, info, prev.vertex, partition_angle);
        let far = vertex_check_open(rings, info, curr.vertex, normalize_angle(partition_angle + 180.0));

        match (near, far) {
            (None, None) => {}
            (Some(sector), None) => {
                report.unclosed.push(UnclosedSector { sector, x: prev.x, y: prev.y });
                tracing::warn!(sector, x = prev.x, y = prev.y, "unclosed sector at partition gap");
            }
            (None, Some(sector)) => {
                report.unclosed.push(UnclosedSector { sector, x: curr.x, y: curr.y });
                tracing::warn!(sector, x = curr.x, y = curr.y, "unclosed sector at partition gap");
            }
            (Some(a), Some(b)) => {
                let sector = if a == b {
                    a
                } else if is_self_referencing(map, a) && !is_self_referencing(map, b) {
                    b
                } else if is_self_referencing(map, b) && !is_self_referencing(map, a) {
                    a
                } else {
                    report.mismatches.push(SectorMismatch { a, b, x: prev.x, y: prev.y });
                    let pair = (a.min(b), a.max(b));
                    if warned_mismatches.insert(pair) {
                        tracing::warn!(sector_a = a, sector_b = b, x = prev.x, y = prev.y, "sector mismatch across gap");
                    }
                    a
                };

                let (h, th) = ds.create_hedge_pair(prev.vertex, curr.vertex);
                info.push_pair(
                    hedge_info::mini_info(partition.source_linedef, Some(sector), Side::Front),
                    hedge_info::mini_info(partition.source_linedef, Some(sector), Side::Back),
                );
                info.recompute(ds, h);
                info.recompute(ds, th);
                rings.insert(ds, info, prev.vertex, h);
                rings.insert(ds, info, curr.vertex, th);
                pool.add_hedge(ds, info, right, h);
                pool.add_hedge(ds, info, left, th);
                report.mini_edges_created += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hedge_info::real_info;
    use crate::mapdata::{LineDef, LinedefFlags, Sector, SideDef, Vertex as MapVertex};
    use crate::superblock::BBox;

    fn two_room_map() -> MapDescription {
        MapDescription {
            vertices: vec![
                MapVertex { x: 0.0, y: 0.0 },
                MapVertex { x: 256.0, y: 0.0 },
            ],
            linedefs: vec![LineDef {
                v1: 0,
                v2: 1,
                flags: LinedefFlags::TWO_SIDED,
                special: 0,
                tag: 0,
                front_sidedef: Some(0),
                back_sidedef: Some(1),
            }],
            sidedefs: vec![
                SideDef { sector: 0, x_offset: 0, y_offset: 0, upper_texture: String::new(), lower_texture: String::new(), middle_texture: String::new() },
                SideDef { sector: 1, x_offset: 0, y_offset: 0, upper_texture: String::new(), lower_texture: String::new(), middle_texture: String::new() },
            ],
            sectors: vec![
                Sector { floor_height: 0, ceiling_height: 128, floor_texture: String::new(), ceiling_texture: String::new(), light_level: 160, special: 0, tag: 0 },
                Sector { floor_height: 0, ceiling_height: 128, floor_texture: String::new(), ceiling_texture: String::new(), light_level: 160, special: 0, tag: 0 },
            ],
        }
    }

    #[test]
    fn both_open_same_sector_creates_mini_edges() {
        let map = two_room_map();
        let mut ds = HalfEdgeDs::new();
        let mut info = HedgeInfoTable::new();
        let mut rings = VertexRings::new(4);
        let mut pool = SuperBlockPool::new();

        // Two outgoing "walls" at (0,0) and (256,0) both facing sector 0,
        // perpendicular to the partition, so the gap between them is open
        // on both ends with a matching sector.
        let v0 = ds.create_vertex(0.0, 0.0);
        let v0b = ds.create_vertex(0.0, -50.0);
        let v1 = ds.create_vertex(256.0, 0.0);
        let v1b = ds.create_vertex(256.0, -50.0);
        let (h0, t0) = ds.create_hedge_pair(v0, v0b);
        let (h1, t1) = ds.create_hedge_pair(v1, v1b);
        info.push_pair(real_info(0, Side::Front, Some(0)), real_info(0, Side::Back, None));
        info.push_pair(real_info(0, Side::Front, Some(0)), real_info(0, Side::Back, None));
        for h in [h0, t0, h1, t1] {
            info.recompute(&ds, h);
        }
        rings.insert(&ds, &info, v0, h0);
        rings.insert(&ds, &info, v1, h1);

        let partition = Partition { origin: (0.0, 0.0), dx: 1.0, dy: 0.0, length: 256.0, source_linedef: None };
        let mut cutlist = CutList::new();
        cutlist.insert(crate::intersection::Intersection { vertex: v0, distance: 0.0, x: 0.0, y: 0.0 });
        cutlist.insert(crate::intersection::Intersection { vertex: v1, distance: 256.0, x: 256.0, y: 0.0 });

        let right = pool.create_root(BBox { min_x: 0.0, min_y: 0.0, max_x: 256.0, max_y: 256.0 });
        let left = pool.create_root(BBox { min_x: 0.0, min_y: -256.0, max_x: 256.0, max_y: 0.0 });

        let mut warned = HashSet::new();
        let report = connect_gaps(&mut ds, &mut info, &mut pool, &mut rings, &map, &cutlist, &partition, right, left, &mut warned);
        assert_eq!(report.mini_edges_created, 1);
        assert!(report.unclosed.is_empty());
    }
}
