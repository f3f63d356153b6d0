//! SuperBlock: a recursive, axis-aligned spatial index over half-edges,
//! used by the partition selector and the divider to avoid scanning every
//! half-edge in the map for every candidate partition.
//!
//! SuperBlocks are allocated from a `Vec`-backed pool with index reuse, a
//! plain freelist-of-indices rather than pointer-chasing, since the rest of
//! this crate is already arena-indexed.

use crate::consts::SUPERBLOCK_LEAF_SIZE;
use crate::halfedge::{HEdgeIx, HalfEdgeDs};
use crate::hedge_info::HedgeInfoTable;

/// Index into a [`SuperBlockPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuperBlockIx(pub u32);

/// Axis-aligned bounding box in map units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn is_leaf_sized(&self) -> bool {
        self.width() <= SUPERBLOCK_LEAF_SIZE && self.height() <= SUPERBLOCK_LEAF_SIZE
    }

    pub fn union(a: BBox, b: BBox) -> BBox {
        BBox {
            min_x: a.min_x.min(b.min_x),
            min_y: a.min_y.min(b.min_y),
            max_x: a.max_x.max(b.max_x),
            max_y: a.max_y.max(b.max_y),
        }
    }
}

pub struct SuperBlock {
    pub bbox: BBox,
    pub parent: Option<SuperBlockIx>,
    pub children: [Option<SuperBlockIx>; 2],
    /// LIFO stack of half-edges that straddle this node's midpoint, or
    /// that live in a leaf-sized block.
    hedges: Vec<HEdgeIx>,
    pub real_num: u32,
    pub mini_num: u32,
}

impl SuperBlock {
    fn new(bbox: BBox, parent: Option<SuperBlockIx>) -> Self {
        SuperBlock { bbox, parent, children: [None, None], hedges: Vec::new(), real_num: 0, mini_num: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.hedges.is_empty() && self.children[0].is_none() && self.children[1].is_none()
    }

    pub fn hedges(&self) -> &[HEdgeIx] {
        &self.hedges
    }
}

/// Owning, reuse-pooled collection of `SuperBlock`s.
///
/// Released slots are pushed onto `free` and handed back out by
/// [`SuperBlockPool::alloc`] before the backing `Vec` grows: a LIFO
/// "quick alloc" discipline that avoids reallocating on every division.
#[derive(Default)]
pub struct SuperBlockPool {
    slots: Vec<Option<SuperBlock>>,
    free: Vec<SuperBlockIx>,
}

impl SuperBlockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, bbox: BBox, parent: Option<SuperBlockIx>) -> SuperBlockIx {
        let block = SuperBlock::new(bbox, parent);
        if let Some(ix) = self.free.pop() {
            self.slots[ix.0 as usize] = Some(block);
            ix
        } else {
            let ix = SuperBlockIx(self.slots.len() as u32);
            self.slots.push(Some(block));
            ix
        }
    }

    /// Release `ix` and, recursively, both of its children back to the
    /// free list.
    pub fn release(&mut self, ix: SuperBlockIx) {
        let children = self.get(ix).children;
        for child in children.into_iter().flatten() {
            self.release(child);
        }
        self.slots[ix.0 as usize] = None;
        self.free.push(ix);
    }

    pub fn get(&self, ix: SuperBlockIx) -> &SuperBlock {
        self.slots[ix.0 as usize].as_ref().expect("use of released SuperBlock")
    }

    pub fn get_mut(&mut self, ix: SuperBlockIx) -> &mut SuperBlock {
        self.slots[ix.0 as usize].as_mut().expect("use of released SuperBlock")
    }

    /// Create a fresh root covering `bbox`, with no parent.
    pub fn create_root(&mut self, bbox: BBox) -> SuperBlockIx {
        self.alloc(bbox, None)
    }

    /// Descend toward a leaf or a straddling node, bumping counters along
    /// the way, allocating children as needed.
    pub fn add_hedge(&mut self, ds: &HalfEdgeDs, info: &HedgeInfoTable, root: SuperBlockIx, h: HEdgeIx) {
        let mut cur = root;
        loop {
            self.increment_counts(cur, info, h);
            let block = self.get(cur);
            if block.bbox.is_leaf_sized() {
                self.get_mut(cur).hedges.push(h);
                return;
            }

            let bbox = block.bbox;
            let (a, b) = ds.endpoints(h);
            let horizontal_split = bbox.width() >= bbox.height();
            let (side_a, side_b) = if horizontal_split {
                let mid = (bbox.min_x + bbox.max_x) / 2.0;
                (a.0 < mid, b.0 < mid)
            } else {
                let mid = (bbox.min_y + bbox.max_y) / 2.0;
                (a.1 < mid, b.1 < mid)
            };

            if side_a != side_b {
                // Straddles the midpoint: lives at this node.
                self.get_mut(cur).hedges.push(h);
                return;
            }

            let child_slot = side_a as usize;
            let child = match self.get(cur).children[child_slot] {
                Some(c) => c,
                None => {
                    let child_bbox = self.child_bbox(bbox, horizontal_split, child_slot);
                    let c = self.alloc(child_bbox, Some(cur));
                    self.get_mut(cur).children[child_slot] = Some(c);
                    c
                }
            };
            cur = child;
        }
    }

    fn child_bbox(&self, parent: BBox, horizontal_split: bool, slot: usize) -> BBox {
        if horizontal_split {
            let mid = (parent.min_x + parent.max_x) / 2.0;
            if slot == 0 {
                BBox { max_x: mid, ..parent }
            } else {
                BBox { min_x: mid, ..parent }
            }
        } else {
            let mid = (parent.min_y + parent.max_y) / 2.0;
            if slot == 0 {
                BBox { max_y: mid, ..parent }
            } else {
                BBox { min_y: mid, ..parent }
            }
        }
    }

    fn increment_counts(&mut self, ix: SuperBlockIx, info: &HedgeInfoTable, h: HEdgeIx) {
        let is_real = info.get(h).is_real();
        let block = self.get_mut(ix);
        if is_real {
            block.real_num += 1;
        } else {
            block.mini_num += 1;
        }
    }

    /// Collect every half-edge reachable from `block`, recursing into
    /// children, then release the whole subtree back to the free list.
    pub fn drain_all(&mut self, block: SuperBlockIx) -> Vec<HEdgeIx> {
        let mut out = Vec::new();
        self.collect_into(block, &mut out);
        self.release(block);
        out
    }

    fn collect_into(&self, block: SuperBlockIx, out: &mut Vec<HEdgeIx>) {
        out.extend_from_slice(self.get(block).hedges());
        for child in self.get(block).children.into_iter().flatten() {
            self.collect_into(child, out);
        }
    }

    /// Compute the tight bounding box over every half-edge reachable from
    /// `ix`, recursing into children. Used to size node bounding boxes
    /// after a division.
    pub fn find_hedge_bounds(&self, ds: &HalfEdgeDs, ix: SuperBlockIx) -> Option<BBox> {
        let block = self.get(ix);
        let mut acc: Option<BBox> = None;
        for &h in &block.hedges {
            let (a, b) = ds.endpoints(h);
            let bb = BBox {
                min_x: a.0.min(b.0),
                min_y: a.1.min(b.1),
                max_x: a.0.max(b.0),
                max_y: a.1.max(b.1),
            };
            acc = Some(match acc {
                Some(prev) => BBox::union(prev, bb),
                None => bb,
            });
        }
        for child in block.children.into_iter().flatten() {
            if let Some(bb) = self.find_hedge_bounds(ds, child) {
                acc = Some(match acc {
                    Some(prev) => BBox::union(prev, bb),
                    None => bb,
                });
            }
        }
        acc
    }
}
