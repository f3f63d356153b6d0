//! The cut list: an ordered-by-distance record of every point where the
//! current partition line crosses the half-edge mesh during one division
//! step.

use crate::consts::INTERSECTION_MERGE_GAP;
use crate::error::BspError;
use crate::halfedge::VertexIx;

/// A single crossing point: a vertex plus its signed distance along the
/// partition (measured via the partition's own parallel-distance formula,
/// so intersections sort outward from the partition's start vertex).
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub vertex: VertexIx,
    pub distance: f64,
    pub x: f64,
    pub y: f64,
}

/// Populated during a single subdivision step, drained by the gap
/// connector, then cleared before the next recursion.
#[derive(Debug, Default)]
pub struct CutList {
    entries: Vec<Intersection>,
}

impl CutList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intersection> {
        self.entries.iter()
    }

    /// Insert `ix`, keeping the list sorted by distance. Ties on distance
    /// keep insertion order to preserve "first candidate wins"
    /// stability elsewhere.
    pub fn insert(&mut self, ix: Intersection) {
        let pos = self.entries.partition_point(|e| e.distance <= ix.distance);
        self.entries.insert(pos, ix);
    }

    /// Look up an existing intersection at the same vertex, if any — used
    /// to avoid recording the same crossing twice when a collinear
    /// half-edge contributes both endpoints.
    pub fn find_by_vertex(&self, vertex: VertexIx) -> Option<&Intersection> {
        self.entries.iter().find(|e| e.vertex == vertex)
    }

    /// Merge successive intersections whose distances are closer than
    /// [`INTERSECTION_MERGE_GAP`], dropping the later one. Returns an error
    /// if the list is not monotonically non-decreasing in distance, which
    /// indicates a malformed partition step.
    pub fn merge_overlaps(&mut self, partition_origin: (f64, f64)) -> Result<(), BspError> {
        let mut merged: Vec<Intersection> = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if let Some(prev) = merged.last() {
                let gap = entry.distance - prev.distance;
                if gap < -INTERSECTION_MERGE_GAP {
                    return Err(BspError::NonMonotonicIntersections {
                        px: partition_origin.0,
                        py: partition_origin.1,
                        prev: prev.distance,
                        curr: entry.distance,
                    });
                }
                if gap < INTERSECTION_MERGE_GAP {
                    // Drop the later, near-duplicate intersection.
                    continue;
                }
            }
            merged.push(entry);
        }
        self.entries = merged;
        Ok(())
    }
}
