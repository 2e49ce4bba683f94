//! # File Header Blocks
//!
//! Block 0 of every B+-tree file carries a header identifying the file and
//! anchoring the tree: without it a reader cannot find the root or verify
//! that the file matches the page size recorded in the parameter file.
//!
//! ## Tree File Header (32 bytes at offset 0 of block 0)
//!
//! ```text
//! Offset  Size  Field        Description
//! 0       16    magic        "QALSH Tree" padded with NULs
//! 16      4     page_size    block size in bytes; must match `para`
//! 20      4     root_block   entry point; 1 means the tree is one leaf
//! 24      4     block_count  total blocks including this header block
//! 28      4     height       number of levels above the leaves
//! ```
//!
//! `block_count` lets a load detect truncation: a file shorter than its
//! header claims is corrupted, not merely empty. The rest of block 0 is
//! zero padding.

use std::path::Path;

use eyre::Result;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::IndexError;
use crate::zerocopy_accessors;

pub const TREE_MAGIC: &[u8; 16] = b"QALSH Tree\x00\x00\x00\x00\x00\x00";
pub const TREE_HEADER_SIZE: usize = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TreeFileHeader {
    magic: [u8; 16],
    page_size: U32<LittleEndian>,
    root_block: U32<LittleEndian>,
    block_count: U32<LittleEndian>,
    height: U32<LittleEndian>,
}

impl TreeFileHeader {
    pub fn new(page_size: u32, root_block: u32, block_count: u32, height: u32) -> Self {
        Self {
            magic: *TREE_MAGIC,
            page_size: U32::new(page_size),
            root_block: U32::new(root_block),
            block_count: U32::new(block_count),
            height: U32::new(height),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        super::parse_zerocopy(data, "TreeFileHeader")
    }

    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        eyre::ensure!(
            data.len() >= TREE_HEADER_SIZE,
            "buffer too small for TreeFileHeader: {} < {}",
            data.len(),
            TREE_HEADER_SIZE
        );
        data[..TREE_HEADER_SIZE].copy_from_slice(self.as_bytes());
        Ok(())
    }

    /// Checks magic, page size, and claimed extent against the actual file.
    pub fn validate(&self, path: &Path, page_size: usize, actual_blocks: u32) -> Result<()> {
        if self.magic != *TREE_MAGIC {
            return Err(IndexError::CorruptedIndex {
                path: path.to_path_buf(),
                detail: "bad magic in tree file header".into(),
            }
            .into());
        }
        if self.page_size() as usize != page_size {
            return Err(IndexError::CorruptedIndex {
                path: path.to_path_buf(),
                detail: format!(
                    "tree page size {} does not match parameter file page size {}",
                    self.page_size(),
                    page_size
                ),
            }
            .into());
        }
        if self.block_count() > actual_blocks {
            return Err(IndexError::CorruptedIndex {
                path: path.to_path_buf(),
                detail: format!(
                    "tree file holds {} blocks but header claims {}",
                    actual_blocks,
                    self.block_count()
                ),
            }
            .into());
        }
        if self.root_block() == 0 || self.root_block() >= self.block_count() {
            return Err(IndexError::CorruptedIndex {
                path: path.to_path_buf(),
                detail: format!("root block {} out of range", self.root_block()),
            }
            .into());
        }
        Ok(())
    }

    zerocopy_accessors! {
        page_size: u32,
        root_block: u32,
        block_count: u32,
        height: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_32_bytes() {
        assert_eq!(std::mem::size_of::<TreeFileHeader>(), TREE_HEADER_SIZE);
    }

    #[test]
    fn round_trips_through_bytes() {
        let header = TreeFileHeader::new(4096, 7, 9, 2);
        let mut buf = [0u8; 64];
        header.write_to(&mut buf).unwrap();

        let parsed = TreeFileHeader::from_bytes(&buf).unwrap();
        assert_eq!(parsed.page_size(), 4096);
        assert_eq!(parsed.root_block(), 7);
        assert_eq!(parsed.block_count(), 9);
        assert_eq!(parsed.height(), 2);
    }

    #[test]
    fn validate_accepts_matching_file() {
        let header = TreeFileHeader::new(4096, 3, 4, 1);
        assert!(header.validate(Path::new("t.qalsh"), 4096, 4).is_ok());
    }

    #[test]
    fn validate_rejects_bad_magic() {
        let mut buf = [0u8; TREE_HEADER_SIZE];
        TreeFileHeader::new(4096, 3, 4, 1).write_to(&mut buf).unwrap();
        buf[0] = b'X';

        let parsed = TreeFileHeader::from_bytes(&buf).unwrap();
        let err = parsed
            .validate(Path::new("t.qalsh"), 4096, 4)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptedIndex { .. })
        ));
    }

    #[test]
    fn validate_rejects_truncated_file() {
        let header = TreeFileHeader::new(4096, 3, 8, 1);
        let err = header.validate(Path::new("t.qalsh"), 4096, 4).unwrap_err();
        assert!(err.to_string().contains("claims"));
    }

    #[test]
    fn validate_rejects_page_size_mismatch() {
        let header = TreeFileHeader::new(4096, 3, 4, 1);
        assert!(header.validate(Path::new("t.qalsh"), 8192, 4).is_err());
    }
}
