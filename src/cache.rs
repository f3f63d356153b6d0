//! The archived-map cache: a segmented binary serialization of a
//! [`BuiltMap`]. Each segment is framed as a little-endian `i32` tag, an
//! `i32` record count, that many `bincode`-encoded fixed-order records, and
//! a closing END tag (`-1`); the `Map` segment nests the per-table segments
//! and closes with its own END.
//!
//! Segment tag values and the node child-reference convention (high bit set
//! ⇒ a `Subsector`/Face index, clear ⇒ a `Node` index) are this crate's own
//! choice, modeled on DOOM's own node-lump convention.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::output::{BuiltMap, NodeData, Tree};

const TAG_HEADER: i32 = 1;
const TAG_MAP: i32 = 2;
const TAG_VERTEXES: i32 = 3;
const TAG_SEGS: i32 = 4;
const TAG_SUBSECTORS: i32 = 5;
const TAG_NODES: i32 = 6;
const TAG_ROOT: i32 = 7;
const TAG_END: i32 = -1;

/// Current on-disk format version. A cache whose header doesn't match this
/// is always rejected, regardless of mtime.
pub const CACHE_VERSION: i32 = 1;

/// A node-tree child reference: the high bit marks a leaf (`Subsector`/Face
/// index in the low 31 bits), matching DOOM's own node-lump convention
/// rather than inventing a new one.
const LEAF_BIT: u32 = 0x8000_0000;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode cache record: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode cache record: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("expected segment tag {expected}, found {found}")]
    UnexpectedTag { expected: i32, found: i32 },
    #[error("cache header version {found} does not match current format version {expected}")]
    VersionMismatch { found: i32, expected: i32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct HeaderRecord {
    version: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct VertexRecord {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SegRecord {
    origin: u32,
    twin: u32,
    next: u32,
    prev: u32,
    face: i32,
    sidedef: i32,
    length: f32,
    offset: f32,
    angle: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SubsectorRecord {
    edge: u32,
    sector: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct NodeRecord {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    right_bbox: [f32; 4],
    left_bbox: [f32; 4],
    right: u32,
    left: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RootRecord {
    reference: u32,
}

/// Everything read back from an archived cache, in the same shape it was
/// written — callers that need a `Tree` reconstruct it with
/// [`unflatten_tree`].
pub struct ArchivedCache {
    pub version: i32,
    pub vertices: Vec<(f64, f64)>,
    pub hedges: Vec<HedgeFields>,
    pub faces: Vec<FaceFields>,
    pub nodes: Vec<NodeFields>,
    pub root: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct HedgeFields {
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

#[derive(Debug, Clone, Copy)]
pub struct FaceFields {
    pub edge: u32,
    pub sector: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct NodeFields {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub right_bbox: crate::superblock::BBox,
    pub left_bbox: crate::superblock::BBox,
    pub right: u32,
    pub left: u32,
}

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

fn write_tag<W: Write>(w: &mut W, tag: i32) -> Result<(), CacheError> {
    w.write_all(&tag.to_le_bytes())?;
    Ok(())
}

fn read_tag<R: Read>(r: &mut R) -> Result<i32, CacheError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn expect_tag<R: Read>(r: &mut R, expected: i32) -> Result<(), CacheError> {
    let found = read_tag(r)?;
    if found != expected {
        return Err(CacheError::UnexpectedTag { expected, found });
    }
    Ok(())
}

fn write_segment<W: Write, T: Serialize>(w: &mut W, tag: i32, records: &[T]) -> Result<(), CacheError> {
    write_tag(w, tag)?;
    w.write_all(&(records.len() as i32).to_le_bytes())?;
    let config = bincode_config();
    for r in records {
        bincode::serde::encode_into_std_write(r, w, config)?;
    }
    write_tag(w, TAG_END)
}

fn read_segment<R: Read, T: for<'de> Deserialize<'de>>(r: &mut R, tag: i32) -> Result<Vec<T>, CacheError> {
    expect_tag(r, tag)?;
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    let count = i32::from_le_bytes(buf) as usize;
    let config = bincode_config();
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(bincode::serde::decode_from_std_read(r, config)?);
    }
    expect_tag(r, TAG_END)?;
    Ok(out)
}

fn opt_to_i32(v: Option<usize>) -> i32 {
    v.map(|x| x as i32).unwrap_or(-1)
}

fn i32_to_opt(v: i32) -> Option<usize> {
    if v < 0 {
        None
    } else {
        Some(v as usize)
    }
}

/// Flatten `node`'s subtree into `out` (post-order: children before their
/// parent), returning its own child reference.
fn child_ref(node: &Tree, out: &mut Vec<NodeRecord>) -> u32 {
    match node {
        Tree::Leaf(face) => *face | LEAF_BIT,
        Tree::Node(n) => flatten_node(n, out),
    }
}

fn flatten_node(n: &NodeData, out: &mut Vec<NodeRecord>) -> u32 {
    let right = child_ref(&n.right, out);
    let left = child_ref(&n.left, out);
    out.push(NodeRecord {
        x: n.x as f32,
        y: n.y as f32,
        dx: n.dx as f32,
        dy: n.dy as f32,
        right_bbox: [n.right_bbox.min_x as f32, n.right_bbox.min_y as f32, n.right_bbox.max_x as f32, n.right_bbox.max_y as f32],
        left_bbox: [n.left_bbox.min_x as f32, n.left_bbox.min_y as f32, n.left_bbox.max_x as f32, n.left_bbox.max_y as f32],
        right,
        left,
    });
    (out.len() - 1) as u32
}

/// Flatten a whole tree, returning the node records (in child-before-parent
/// order) and the root's own child reference.
fn flatten_tree(tree: &Tree) -> (Vec<NodeRecord>, u32) {
    let mut out = Vec::new();
    let root = child_ref(tree, &mut out);
    (out, root)
}

/// Rebuild a [`Tree`] from flattened records and a root reference — the
/// inverse of [`flatten_tree`].
pub fn unflatten_tree(nodes: &[NodeFields], root: u32) -> Tree {
    fn build(nodes: &[NodeFields], ref_: u32) -> Tree {
        if ref_ & LEAF_BIT != 0 {
            Tree::Leaf(ref_ & !LEAF_BIT)
        } else {
            let n = &nodes[ref_ as usize];
            Tree::Node(NodeData {
                x: n.x,
                y: n.y,
                dx: n.dx,
                dy: n.dy,
                right_bbox: n.right_bbox,
                left_bbox: n.left_bbox,
                right: Box::new(build(nodes, n.right)),
                left: Box::new(build(nodes, n.left)),
            })
        }
    }
    build(nodes, root)
}

/// Write `built` to `path` as an archived cache, in this module's segmented
/// format.
pub fn write_archived(built: &BuiltMap, path: impl AsRef<Path>) -> Result<(), CacheError> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    write_segment(&mut w, TAG_HEADER, &[HeaderRecord { version: CACHE_VERSION }])?;

    write_tag(&mut w, TAG_MAP)?;

    let vertex_records: Vec<VertexRecord> = built.vertices.iter().map(|v| VertexRecord { x: v.x as f32, y: v.y as f32 }).collect();
    write_segment(&mut w, TAG_VERTEXES, &vertex_records)?;

    let seg_records: Vec<SegRecord> = built
        .hedges
        .iter()
        .map(|h| SegRecord {
            origin: h.origin,
            twin: h.twin,
            next: h.next,
            prev: h.prev,
            face: h.face.map(|f| f as i32).unwrap_or(-1),
            sidedef: opt_to_i32(h.sidedef),
            length: h.length as f32,
            offset: h.offset as f32,
            angle: h.angle as f32,
        })
        .collect();
    write_segment(&mut w, TAG_SEGS, &seg_records)?;

    let subsector_records: Vec<SubsectorRecord> = built.faces.iter().map(|f| SubsectorRecord { edge: f.edge, sector: opt_to_i32(f.sector) }).collect();
    write_segment(&mut w, TAG_SUBSECTORS, &subsector_records)?;

    let (node_records, root) = flatten_tree(&built.tree);
    write_segment(&mut w, TAG_NODES, &node_records)?;
    write_segment(&mut w, TAG_ROOT, &[RootRecord { reference: root }])?;

    write_tag(&mut w, TAG_END)?;
    w.flush()?;
    Ok(())
}

/// Read an archived cache back from `path`. Does not validate freshness;
/// call [`is_fresh`] with the map source's path for that.
pub fn read_archived(path: impl AsRef<Path>) -> Result<ArchivedCache, CacheError> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let header: Vec<HeaderRecord> = read_segment(&mut r, TAG_HEADER)?;
    let version = header.first().map(|h| h.version).unwrap_or(0);
    if version != CACHE_VERSION {
        return Err(CacheError::VersionMismatch { found: version, expected: CACHE_VERSION });
    }

    expect_tag(&mut r, TAG_MAP)?;

    let vertices: Vec<(f64, f64)> = read_segment::<_, VertexRecord>(&mut r, TAG_VERTEXES)?.into_iter().map(|v| (v.x as f64, v.y as f64)).collect();

    let hedges: Vec<HedgeFields> = read_segment::<_, SegRecord>(&mut r, TAG_SEGS)?
        .into_iter()
        .map(|s| HedgeFields {
            origin: s.origin,
            twin: s.twin,
            next: s.next,
            prev: s.prev,
            face: if s.face < 0 { None } else { Some(s.face as u32) },
            sidedef: i32_to_opt(s.sidedef),
            length: s.length as f64,
            offset: s.offset as f64,
            angle: s.angle as f64,
        })
        .collect();

    let faces: Vec<FaceFields> = read_segment::<_, SubsectorRecord>(&mut r, TAG_SUBSECTORS)?
        .into_iter()
        .map(|s| FaceFields { edge: s.edge, sector: i32_to_opt(s.sector) })
        .collect();

    let nodes: Vec<NodeFields> = read_segment::<_, NodeRecord>(&mut r, TAG_NODES)?
        .into_iter()
        .map(|n| NodeFields {
            x: n.x as f64,
            y: n.y as f64,
            dx: n.dx as f64,
            dy: n.dy as f64,
            right_bbox: crate::superblock::BBox { min_x: n.right_bbox[0] as f64, min_y: n.right_bbox[1] as f64, max_x: n.right_bbox[2] as f64, max_y: n.right_bbox[3] as f64 },
            left_bbox: crate::superblock::BBox { min_x: n.left_bbox[0] as f64, min_y: n.left_bbox[1] as f64, max_x: n.left_bbox[2] as f64, max_y: n.left_bbox[3] as f64 },
            right: n.right,
            left: n.left,
        })
        .collect();

    let root = read_segment::<_, RootRecord>(&mut r, TAG_ROOT)?.first().map(|r| r.reference).unwrap_or(0);

    expect_tag(&mut r, TAG_END)?;

    Ok(ArchivedCache { version, vertices, hedges, faces, nodes, root })
}

/// A cache is trustworthy only if it is no older than the map source it was
/// built from, and its header version matches.
pub fn is_fresh(cache_path: impl AsRef<Path>, map_path: impl AsRef<Path>) -> Result<bool, CacheError> {
    let cache_mtime = std::fs::metadata(cache_path)?.modified()?;
    let map_mtime = std::fs::metadata(map_path)?.modified()?;
    Ok(cache_mtime >= map_mtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaps::GapReport;
    use crate::output::{OutFace, OutHedge, OutVertex};

    fn sample_built_map() -> BuiltMap {
        BuiltMap {
            vertices: vec![OutVertex { x: 0.0, y: 0.0 }, OutVertex { x: 256.0, y: 0.0 }],
            hedges: vec![
                OutHedge { origin: 0, twin: 1, next: 0, prev: 0, face: Some(0), sidedef: Some(0), length: 256.0, offset: 0.0, angle: 0.0 },
                OutHedge { origin: 1, twin: 0, next: 1, prev: 1, face: None, sidedef: None, length: 256.0, offset: 0.0, angle: 180.0 },
            ],
            faces: vec![OutFace { edge: 0, sector: Some(0) }],
            tree: Tree::Leaf(0),
            diagnostics: GapReport::default(),
        }
    }

    #[test]
    fn round_trips_through_the_archived_format() {
        let built = sample_built_map();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.cache");

        write_archived(&built, &path).unwrap();
        let read_back = read_archived(&path).unwrap();

        assert_eq!(read_back.version, CACHE_VERSION);
        assert_eq!(read_back.vertices.len(), 2);
        assert_eq!(read_back.hedges.len(), 2);
        assert_eq!(read_back.faces[0].sector, Some(0));
        assert_eq!(read_back.root, 0 | LEAF_BIT);

        // Re-writing a cache built from the same in-memory data must
        // produce byte-identical output (§8's round-trip law).
        let path2 = dir.path().join("test2.cache");
        write_archived(&built, &path2).unwrap();
        let a = std::fs::read(&path).unwrap();
        let b = std::fs::read(&path2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_wrong_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.cache");
        let mut w = BufWriter::new(File::create(&path).unwrap());
        write_segment(&mut w, TAG_HEADER, &[HeaderRecord { version: 99 }]).unwrap();
        w.flush().unwrap();
        drop(w);

        assert!(matches!(read_archived(&path), Err(CacheError::VersionMismatch { found: 99, .. })));
    }

    #[test]
    fn flatten_and_unflatten_round_trip_a_small_tree() {
        let tree = Tree::Node(NodeData {
            x: 128.0,
            y: 0.0,
            dx: 0.0,
            dy: 1.0,
            right_bbox: crate::superblock::BBox { min_x: 128.0, min_y: 0.0, max_x: 256.0, max_y: 256.0 },
            left_bbox: crate::superblock::BBox { min_x: 0.0, min_y: 0.0, max_x: 128.0, max_y: 256.0 },
            right: Box::new(Tree::Leaf(0)),
            left: Box::new(Tree::Leaf(1)),
        });
        let (records, root) = flatten_tree(&tree);
        assert_eq!(records.len(), 1);
        assert_eq!(root, 0);

        let fields: Vec<NodeFields> = records
            .iter()
            .map(|n| NodeFields {
                x: n.x as f64,
                y: n.y as f64,
                dx: n.dx as f64,
                dy: n.dy as f64,
                right_bbox: crate::superblock::BBox { min_x: n.right_bbox[0] as f64, min_y: n.right_bbox[1] as f64, max_x: n.right_bbox[2] as f64, max_y: n.right_bbox[3] as f64 },
                left_bbox: crate::superblock::BBox { min_x: n.left_bbox[0] as f64, min_y: n.left_bbox[1] as f64, max_x: n.left_bbox[2] as f64, max_y: n.left_bbox[3] as f64 },
                right: n.right,
                left: n.left,
            })
            .collect();
        let rebuilt = unflatten_tree(&fields, root);
        match rebuilt {
            Tree::Node(n) => {
                assert!(matches!(*n.right, Tree::Leaf(0)));
                assert!(matches!(*n.left, Tree::Leaf(1)));
            }
            Tree::Leaf(_) => panic!("expected a node"),
        }
    }
}
