//! Builder error types.
//!
//! `BspError` covers every condition that halts a build outright and is
//! returned to the caller. Map-authoring oddities (unclosed sectors, sector
//! mismatches) are not errors — they are logged via `tracing::warn!` and
//! reported through [`crate::output::BuiltMap::diagnostics`] as the build
//! proceeds, and never construct a `BspError` variant.

use thiserror::Error;

/// Everything that can stop a build before it produces a tree.
#[derive(Error, Debug)]
pub enum BspError {
    /// A linedef references a vertex index outside the vertex table.
    #[error("linedef {linedef} references out-of-range vertex {vertex}")]
    VertexIndexOutOfRange { linedef: usize, vertex: usize },

    /// A sidedef references a sector index outside the sector table.
    #[error("sidedef {sidedef} references out-of-range sector {sector}")]
    SectorIndexOutOfRange { sidedef: usize, sector: usize },

    /// A linedef references a sidedef index outside the sidedef table.
    #[error("linedef {linedef} references out-of-range sidedef {sidedef}")]
    SidedefIndexOutOfRange { linedef: usize, sidedef: usize },

    /// Both endpoints of a linedef resolved to the same coordinates.
    #[error("linedef {linedef} is degenerate: v1 and v2 coincide at ({x}, {y})")]
    DegenerateLinedef { linedef: usize, x: f64, y: f64 },

    /// A linedef has neither a front nor a back sidedef.
    #[error("linedef {linedef} has no sidedefs at all")]
    NoSidedefs { linedef: usize },

    /// The intersection list produced by a division step was not
    /// monotonically increasing in distance after overlap merging.
    #[error(
        "intersection list is non-monotonic at partition ({px}, {py}): \
         distance went from {prev} to {curr}"
    )]
    NonMonotonicIntersections {
        px: f64,
        py: f64,
        prev: f64,
        curr: f64,
    },

    /// `split_half_edge` was asked to split at a point that is not strictly
    /// between the half-edge's two endpoints.
    #[error("split point ({x}, {y}) does not lie strictly within half-edge {hedge:?}")]
    SplitOutsideEndpoints { hedge: crate::halfedge::HEdgeIx, x: f64, y: f64 },

    /// A leaf was finalized with no linedef-backed half-edge at all.
    #[error("leaf at superblock depth {depth} contains no real half-edge")]
    LeafWithoutRealHedge { depth: u32 },

    /// Input contains no linedefs, so no tree can be built.
    #[error("map description has no linedefs")]
    EmptyMap,

    /// The one tunable the builder exposes, out of its documented range.
    #[error("bsp factor {0} is out of the valid range 1..=32")]
    FactorOutOfRange(i32),

    /// An archived cache file failed to parse or its header did not match.
    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    /// Failure to read/parse the JSON map description.
    #[error("failed to load map description from {path}: {source}")]
    LoadMap {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// I/O failure unrelated to cache framing (opening the input file, etc).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
