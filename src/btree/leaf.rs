//! # Leaf Nodes
//!
//! A leaf page holds a run of consecutive entries from the sorted
//! projection, bucketed under representative keys at the `increment`
//! stride. See the module docs in `btree` for the layout rationale.
//!
//! ## Capacity Derivation
//!
//! For a page of `B` bytes:
//!
//! ```text
//! key_capacity   = B / LEAF_KEY_STRIDE            (key slots, f32 each)
//! raw_entries    = (B - 16 - 4*key_capacity) / 4  (space left for ids)
//! increment      = raw_entries / key_capacity     (entries per key slot)
//! entry_capacity = increment * key_capacity       (<= raw_entries)
//! ```
//!
//! With B = 4096 this gives 64 key slots, increment 14, and 896 entries
//! per leaf.
//!
//! Read access borrows the page; nothing is copied. Keys and ids are
//! little-endian and unaligned.

use eyre::{ensure, Result};
use zerocopy::byteorder::{LittleEndian, F32, U32};
use zerocopy::FromBytes;

use crate::config::LEAF_KEY_STRIDE;
use crate::storage::{NodeHeader, PageType, NODE_HEADER_SIZE};

/// Number of key slots in a leaf of the given page size.
pub fn leaf_key_capacity(page_size: usize) -> usize {
    (page_size / LEAF_KEY_STRIDE).max(1)
}

/// Entries covered by one key slot.
pub fn leaf_increment(page_size: usize) -> usize {
    let keys = leaf_key_capacity(page_size);
    let raw = (page_size - NODE_HEADER_SIZE - 4 * keys) / 4;
    (raw / keys).max(1)
}

/// Usable entries per leaf: every key slot covers a full increment, so
/// the capacity is their product (never more than the raw id space).
pub fn leaf_entry_capacity(page_size: usize) -> usize {
    let keys = leaf_key_capacity(page_size);
    let raw = (page_size - NODE_HEADER_SIZE - 4 * keys) / 4;
    (leaf_increment(page_size) * keys).min(raw)
}

fn key_offset(slot: usize) -> usize {
    NODE_HEADER_SIZE + 4 * slot
}

fn entry_offset(page_size: usize, pos: usize) -> usize {
    NODE_HEADER_SIZE + 4 * leaf_key_capacity(page_size) + 4 * pos
}

#[derive(Debug, Clone, Copy)]
pub struct LeafNode<'a> {
    data: &'a [u8],
}

impl<'a> LeafNode<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        ensure!(
            data.len() > NODE_HEADER_SIZE,
            "page too small for a leaf node: {}",
            data.len()
        );
        let header = NodeHeader::from_bytes(data)?;
        ensure!(
            header.page_type() == PageType::Leaf,
            "expected leaf page, got {:?}",
            header.page_type()
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

    pub fn num_entries(&self) -> usize {
        self.header().num_entries() as usize
    }

    pub fn left_sibling(&self) -> u32 {
        self.header().left_sibling()
    }

    pub fn right_sibling(&self) -> u32 {
        self.header().right_sibling()
    }

    pub fn increment(&self) -> usize {
        leaf_increment(self.data.len())
    }

    /// The representative key of `slot`.
    pub fn key(&self, slot: usize) -> f32 {
        debug_assert!(slot < self.num_keys());
        let off = key_offset(slot);
        // INVARIANT: every key slot lies inside the page.
        F32::<LittleEndian>::ref_from_bytes(&self.data[off..off + 4])
            .unwrap()
            .get()
    }

    /// The record id at entry position `pos`.
    pub fn entry_id(&self, pos: usize) -> u32 {
        debug_assert!(pos < self.num_entries());
        let off = entry_offset(self.data.len(), pos);
        U32::<LittleEndian>::ref_from_bytes(&self.data[off..off + 4])
            .unwrap()
            .get()
    }

    /// Largest key slot whose key is <= `q`, or `None` when `q` is smaller
    /// than every stored key.
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

pub struct LeafNodeMut<'a> {
    data: &'a mut [u8],
}

impl<'a> LeafNodeMut<'a> {
    /// Stamps a fresh leaf header onto `data` and returns a writer.
    pub fn init(data: &'a mut [u8]) -> Result<Self> {
        ensure!(
            data.len() > NODE_HEADER_SIZE,
            "page too small for a leaf node: {}",
            data.len()
        );
        NodeHeader::new(PageType::Leaf, 0).write_to(data)?;
        Ok(Self { data })
    }

    fn header_mut(&mut self) -> &mut NodeHeader {
        // INVARIANT: page length validated in init.
        NodeHeader::from_bytes_mut(self.data).unwrap()
    }

    pub fn set_num_keys(&mut self, n: u16) {
        self.header_mut().set_num_keys(n);
    }

    pub fn set_num_entries(&mut self, n: u16) {
        self.header_mut().set_num_entries(n);
    }

    pub fn set_left_sibling(&mut self, block: u32) {
        self.header_mut().set_left_sibling(block);
    }

    pub fn set_right_sibling(&mut self, block: u32) {
        self.header_mut().set_right_sibling(block);
    }

    pub fn set_key(&mut self, slot: usize, key: f32) {
        debug_assert!(slot < leaf_key_capacity(self.data.len()));
        let off = key_offset(slot);
        self.data[off..off + 4].copy_from_slice(&key.to_le_bytes());
    }

    pub fn set_entry(&mut self, pos: usize, id: u32) {
        debug_assert!(pos < leaf_entry_capacity(self.data.len()));
        let off = entry_offset(self.data.len(), pos);
        self.data[off..off + 4].copy_from_slice(&id.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    fn build_leaf(buf: &mut [u8], entries: &[(f32, u32)]) {
        let inc = leaf_increment(PAGE);
        let mut leaf = LeafNodeMut::init(buf).unwrap();
        for (pos, (key, id)) in entries.iter().enumerate() {
            if pos % inc == 0 {
                leaf.set_key(pos / inc, *key);
            }
            leaf.set_entry(pos, *id);
        }
        leaf.set_num_keys(entries.len().div_ceil(inc) as u16);
        leaf.set_num_entries(entries.len() as u16);
    }

    #[test]
    fn capacities_for_4k_pages() {
        assert_eq!(leaf_key_capacity(PAGE), 64);
        assert_eq!(leaf_increment(PAGE), 14);
        assert_eq!(leaf_entry_capacity(PAGE), 896);
    }

    #[test]
    fn capacities_never_degenerate() {
        for page_size in [128usize, 256, 512, 1024, 4096, 16384] {
            let keys = leaf_key_capacity(page_size);
            let inc = leaf_increment(page_size);
            let cap = leaf_entry_capacity(page_size);
            assert!(keys >= 1 && inc >= 1 && cap >= 1);
            assert!(cap <= inc * keys);
            // everything must fit in the page
            assert!(NODE_HEADER_SIZE + 4 * keys + 4 * cap <= page_size);
        }
    }

    #[test]
    fn first_key_equals_first_entry_key() {
        let mut buf = vec![0u8; PAGE];
        let entries: Vec<(f32, u32)> = (0..40).map(|i| (i as f32 * 0.25, i)).collect();
        build_leaf(&mut buf, &entries);

        let leaf = LeafNode::from_page(&buf).unwrap();
        assert_eq!(leaf.key(0), entries[0].0);
        assert_eq!(leaf.num_entries(), 40);
        // stored keys appear every `increment` entries
        let inc = leaf.increment();
        for slot in 0..leaf.num_keys() {
            assert_eq!(leaf.key(slot), entries[slot * inc].0);
        }
    }

    #[test]
    fn entries_read_back_in_order() {
        let mut buf = vec![0u8; PAGE];
        let entries: Vec<(f32, u32)> = (0..100).map(|i| (i as f32, 1000 + i)).collect();
        build_leaf(&mut buf, &entries);

        let leaf = LeafNode::from_page(&buf).unwrap();
        for (pos, (_, id)) in entries.iter().enumerate() {
            assert_eq!(leaf.entry_id(pos), *id);
        }
    }

    #[test]
    fn find_position_by_key_routes_to_floor_slot() {
        let mut buf = vec![0u8; PAGE];
        // increment is 14, so stored keys are 0.0, 14.0, 28.0
        let entries: Vec<(f32, u32)> = (0..40).map(|i| (i as f32, i)).collect();
        build_leaf(&mut buf, &entries);

        let leaf = LeafNode::from_page(&buf).unwrap();
        assert_eq!(leaf.find_position_by_key(-0.5), None);
        assert_eq!(leaf.find_position_by_key(0.0), Some(0));
        assert_eq!(leaf.find_position_by_key(13.9), Some(0));
        assert_eq!(leaf.find_position_by_key(14.0), Some(1));
        assert_eq!(leaf.find_position_by_key(27.0), Some(1));
        assert_eq!(leaf.find_position_by_key(1e9), Some(2));
    }

    #[test]
    fn from_page_rejects_wrong_type() {
        let mut buf = vec![0u8; PAGE];
        NodeHeader::new(PageType::Interior, 1).write_to(&mut buf).unwrap();
        assert!(LeafNode::from_page(&buf).is_err());
    }

    #[test]
    fn partial_last_key_slot() {
        let mut buf = vec![0u8; PAGE];
        // 30 entries, increment 14: slots cover 14 + 14 + 2
        let entries: Vec<(f32, u32)> = (0..30).map(|i| (i as f32, i)).collect();
        build_leaf(&mut buf, &entries);

        let leaf = LeafNode::from_page(&buf).unwrap();
        assert_eq!(leaf.num_keys(), 3);
        assert!(leaf.num_entries() <= leaf.increment() * leaf.num_keys());
        let last_size = leaf.num_entries() - (leaf.num_keys() - 1) * leaf.increment();
        assert_eq!(last_size, 2);
    }
}
