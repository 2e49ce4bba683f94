//! # Node Page Header
//!
//! Every page of a B+-tree file except block 0 is a tree node and begins
//! with the 16-byte header defined here. Block 0 carries the file header
//! (`headers::TreeFileHeader`) instead.
//!
//! ## Header Layout (16 bytes)
//!
//! ```text
//! Offset  Size  Field          Description
//! ------  ----  -------------  ----------------------------------------
//! 0       1     page_type      Interior (0x01) or Leaf (0x02)
//! 1       1     level          0 for leaves, >= 1 for interior nodes
//! 2       2     num_keys       occupied key slots
//! 4       2     num_entries    occupied entry slots (leaves only)
//! 6       2     reserved
//! 8       4     left_sibling   block id of left neighbor, 0 = none
//! 12      4     right_sibling  block id of right neighbor, 0 = none
//! ```
//!
//! Block 0 is never a node, so 0 doubles as the "no sibling" sentinel.
//!
//! Sibling links exist at every level. The search only follows them on
//! leaves, but the bulk loader links interior levels the same way so the
//! format does not special-case the bottom level.
//!
//! All multi-byte fields are little-endian; the struct is `Unaligned` and
//! safe to read at any offset of an mmap'd page.

use eyre::{ensure, Result};
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::zerocopy_accessors;

pub const NODE_HEADER_SIZE: usize = 16;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Unknown = 0x00,
    Interior = 0x01,
    Leaf = 0x02,
}

impl PageType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x01 => PageType::Interior,
            0x02 => PageType::Leaf,
            _ => PageType::Unknown,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct NodeHeader {
    page_type: u8,
    level: u8,
    num_keys: U16<LittleEndian>,
    num_entries: U16<LittleEndian>,
    reserved: [u8; 2],
    left_sibling: U32<LittleEndian>,
    right_sibling: U32<LittleEndian>,
}

impl NodeHeader {
    pub fn new(page_type: PageType, level: u8) -> Self {
        Self {
            page_type: page_type as u8,
            level,
            num_keys: U16::new(0),
            num_entries: U16::new(0),
            reserved: [0; 2],
            left_sibling: U32::new(0),
            right_sibling: U32::new(0),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        super::parse_zerocopy(data, "NodeHeader")
    }

    pub fn from_bytes_mut(data: &mut [u8]) -> Result<&mut Self> {
        super::parse_zerocopy_mut(data, "NodeHeader")
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        ensure!(
            data.len() >= NODE_HEADER_SIZE,
            "buffer too small for NodeHeader: {} < {}",
            data.len(),
            NODE_HEADER_SIZE
        );
        data[..NODE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_byte(self.page_type)
    }

    pub fn set_page_type(&mut self, page_type: PageType) {
        self.page_type = page_type as u8;
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    zerocopy_accessors! {
        num_keys: u16,
        num_entries: u16,
        left_sibling: u32,
        right_sibling: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_header_size_is_16_bytes() {
        assert_eq!(std::mem::size_of::<NodeHeader>(), NODE_HEADER_SIZE);
    }

    #[test]
    fn page_type_from_byte() {
        assert_eq!(PageType::from_byte(0x01), PageType::Interior);
        assert_eq!(PageType::from_byte(0x02), PageType::Leaf);
        assert_eq!(PageType::from_byte(0x00), PageType::Unknown);
        assert_eq!(PageType::from_byte(0xFF), PageType::Unknown);
    }

    #[test]
    fn new_initializes_fields() {
        let header = NodeHeader::new(PageType::Leaf, 0);

        assert_eq!(header.page_type(), PageType::Leaf);
        assert_eq!(header.level(), 0);
        assert_eq!(header.num_keys(), 0);
        assert_eq!(header.num_entries(), 0);
        assert_eq!(header.left_sibling(), 0);
        assert_eq!(header.right_sibling(), 0);
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut header = NodeHeader::new(PageType::Interior, 2);
        header.set_num_keys(37);
        header.set_left_sibling(11);
        header.set_right_sibling(13);

        let mut buf = [0u8; 64];
        header.write_to(&mut buf).unwrap();

        let parsed = NodeHeader::from_bytes(&buf).unwrap();
        assert_eq!(parsed.page_type(), PageType::Interior);
        assert_eq!(parsed.level(), 2);
        assert_eq!(parsed.num_keys(), 37);
        assert_eq!(parsed.left_sibling(), 11);
        assert_eq!(parsed.right_sibling(), 13);
    }

    #[test]
    fn fields_are_little_endian() {
        let mut header = NodeHeader::new(PageType::Leaf, 0);
        header.set_num_keys(0x0102);

        let mut buf = [0u8; NODE_HEADER_SIZE];
        header.write_to(&mut buf).unwrap();

        assert_eq!(buf[2], 0x02);
        assert_eq!(buf[3], 0x01);
    }

    #[test]
    fn from_bytes_too_small() {
        let buf = [0u8; 8];
        assert!(NodeHeader::from_bytes(&buf).is_err());
    }
}
