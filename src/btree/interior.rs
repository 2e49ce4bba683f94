//! # Interior Nodes
//!
//! An interior node is an array of 8-byte slots, each pairing a separator
//! key with the block id of the child it introduces:
//!
//! ```text
//! +----------------------+
//! | NodeHeader (16B)     |  type=Interior, level >= 1, siblings
//! +----------------------+
//! | InteriorSlot[0]      |  { key: f32, child: u32 }
//! | InteriorSlot[1]      |
//! | ...                  |
//! +----------------------+
//! ```
//!
//! `key` is the first key of the child subtree, so routing a query `q`
//! means taking the largest slot with key <= q. A `q` below every
//! separator has no slot; the caller resolves that to the leftmost branch.

use eyre::{ensure, Result};
use zerocopy::byteorder::{LittleEndian, F32, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::{NodeHeader, PageType, NODE_HEADER_SIZE};

pub const INTERIOR_SLOT_SIZE: usize = 8;

/// `(separator key, child block)` slots an interior node can hold.
pub fn interior_capacity(page_size: usize) -> usize {
    (page_size - NODE_HEADER_SIZE) / INTERIOR_SLOT_SIZE
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct InteriorSlot {
    key: F32<LittleEndian>,
    child: U32<LittleEndian>,
}

impl InteriorSlot {
    pub fn new(key: f32, child: u32) -> Self {
        Self {
            key: F32::new(key),
            child: U32::new(child),
        }
    }

    pub fn key(&self) -> f32 {
        self.key.get()
    }

    pub fn child(&self) -> u32 {
        self.child.get()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InteriorNode<'a> {
    data: &'a [u8],
}

impl<'a> InteriorNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() > NODE_HEADER_SIZE,
            "page too small for an interior node: {}",
            data.len()
        );
        let header = NodeHeader::from_bytes(data)?;
        ensure!(
            header.page_type() == PageType::Interior,
            "expected interior page, got {:?}",
            header.page_type()
        );
        ensure!(
            header.level() >= 1,
            "interior node at level 0 is inconsistent"
        );
        Ok(Self { data })
    }

    fn header(&self) -> &NodeHeader {
        // INVARIANT: page length validated in from_page.
        NodeHeader::from_bytes(self.data).unwrap()
    }

    pub fn level(&self) -> u8 {
        self.header().level()
    }

    pub fn num_keys(&self) -> usize {
        self.header().num_keys() as usize
    }

    pub fn left_sibling(&self) -> u32 {
        self.header().left_sibling()
    }

    pub fn right_sibling(&self) -> u32 {
        self.header().right_sibling()
    }

    fn slot(&self, idx: usize) -> &InteriorSlot {
        debug_assert!(idx < self.num_keys());
        let off = NODE_HEADER_SIZE + idx * INTERIOR_SLOT_SIZE;
        // INVARIANT: every slot lies inside the page.
        InteriorSlot::ref_from_bytes(&self.data[off..off + INTERIOR_SLOT_SIZE]).unwrap()
    }

    pub fn key(&self, idx: usize) -> f32 {
        self.slot(idx).key()
    }

    /// Child block introduced by slot `idx`.
    pub fn son(&self, idx: usize) -> u32 {
        self.slot(idx).child()
    }

    /// Largest slot whose separator is <= `q`, or `None` when `q` lies
    /// left of every separator.
    pub fn find_position_by_key(&self, q: f32) -> Option<usize> {
        let n = self.num_keys();
        if n == 0 || self.key(0) > q {
            return None;
        }
        let mut lo = 0;
        let mut hi = n;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) <= q {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    }
}

pub struct InteriorNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> InteriorNodeMut<'a> {
    /// Stamps a fresh interior header onto `data` and returns a writer.
    pub fn init(data: &'a mut [u8], level: u8) -> Result<Self> {
        ensure!(
            data.len() > NODE_HEADER_SIZE,
            "page too small for an interior node: {}",
            data.len()
        );
        ensure!(level >= 1, "interior nodes live at level 1 and above");
        NodeHeader::new(PageType::Interior, level).write_to(data)?;
        Ok(Self { data })
    }

    fn header_mut(&mut self) -> &mut NodeHeader {
        // INVARIANT: page length validated in init.
        NodeHeader::from_bytes_mut(self.data).unwrap()
    }

    pub fn set_num_keys(&mut self, n: u16) {
        self.header_mut().set_num_keys(n);
    }

    pub fn set_left_sibling(&mut self, block: u32) {
        self.header_mut().set_left_sibling(block);
    }

    pub fn set_right_sibling(&mut self, block: u32) {
        self.header_mut().set_right_sibling(block);
    }

    pub fn set_slot(&mut self, idx: usize, key: f32, child: u32) {
        debug_assert!(idx < interior_capacity(self.data.len()));
        let off = NODE_HEADER_SIZE + idx * INTERIOR_SLOT_SIZE;
        self.data[off..off + INTERIOR_SLOT_SIZE]
            .copy_from_slice(InteriorSlot::new(key, child).as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    fn build_node(buf: &mut [u8], seps: &[(f32, u32)]) {
        let mut node = InteriorNodeMut::init(buf, 1).unwrap();
        for (idx, (key, child)) in seps.iter().enumerate() {
            node.set_slot(idx, *key, *child);
        }
        node.set_num_keys(seps.len() as u16);
    }

    #[test]
    fn slot_size_is_8_bytes() {
        assert_eq!(std::mem::size_of::<InteriorSlot>(), INTERIOR_SLOT_SIZE);
    }

    #[test]
    fn capacity_for_4k_pages() {
        assert_eq!(interior_capacity(PAGE), 510);
    }

    #[test]
    fn slots_round_trip() {
        let mut buf = vec![0u8; PAGE];
        build_node(&mut buf, &[(0.5, 1), (2.5, 2), (9.0, 3)]);

        let node = InteriorNode::from_page(&buf).unwrap();
        assert_eq!(node.num_keys(), 3);
        assert_eq!(node.key(1), 2.5);
        assert_eq!(node.son(1), 2);
        assert_eq!(node.level(), 1);
    }

    #[test]
    fn routing_takes_floor_slot() {
        let mut buf = vec![0u8; PAGE];
        build_node(&mut buf, &[(0.0, 1), (10.0, 2), (20.0, 3)]);

        let node = InteriorNode::from_page(&buf).unwrap();
        assert_eq!(node.find_position_by_key(-1.0), None);
        assert_eq!(node.find_position_by_key(0.0), Some(0));
        assert_eq!(node.find_position_by_key(9.99), Some(0));
        assert_eq!(node.find_position_by_key(10.0), Some(1));
        assert_eq!(node.find_position_by_key(19.0), Some(1));
        assert_eq!(node.find_position_by_key(1e12), Some(2));
    }

    #[test]
    fn from_page_rejects_leaf_pages() {
        let mut buf = vec![0u8; PAGE];
        NodeHeader::new(PageType::Leaf, 0).write_to(&mut buf).unwrap();
        assert!(InteriorNode::from_page(&buf).is_err());
    }

    #[test]
    fn init_rejects_level_zero() {
        let mut buf = vec![0u8; PAGE];
        assert!(InteriorNodeMut::init(&mut buf, 0).is_err());
    }
}
