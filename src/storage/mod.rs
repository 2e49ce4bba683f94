//! # Storage Module
//!
//! This module provides the foundational storage layer for the index,
//! implementing memory-mapped page access with zero-copy semantics.
//!
//! ## Architecture Overview
//!
//! Every persistent structure in this crate is a file of fixed-size pages.
//! Instead of copying data between kernel and user space, files are mapped
//! directly into the process address space:
//!
//! - **Zero-copy reads**: page accesses return `&[u8]` slices pointing into
//!   the mmap region
//! - **Minimal syscall overhead**: page faults handled transparently by the OS
//! - **Compile-time safety**: `page(&self)` borrows immutably while
//!   `page_mut(&mut self)` requires exclusivity, so no reference can outlive
//!   a remap
//!
//! ## File Layout
//!
//! An index directory holds one parameter file plus one B+-tree file per
//! projection; a data directory holds the record-packed vector pages:
//!
//! ```text
//! index_dir/
//! ├── para          # text parameter file (n, d, B, ..., hash matrix)
//! ├── 0.qalsh       # B+-tree over projection 0
//! ├── 1.qalsh
//! └── ...
//! data_dir/
//! └── vectors.data  # B-byte pages, floor(B / 4d) records per page
//! ```
//!
//! ## Page Size
//!
//! Unlike a general-purpose database, the page size `B` here is a build
//! parameter: it fixes the B+-tree fanout, the leaf increment, and the
//! record packing, and it is recorded in the parameter file so readers agree
//! with the writer. `BlockFile` therefore carries its page size at runtime
//! rather than as a compile-time constant.
//!
//! ## I/O Accounting
//!
//! Queries are evaluated by their page I/O count. The block store itself
//! does not count accesses; the counters live with the query state that
//! owns them, which keeps the accounting exact (one increment per node or
//! data page actually visited) and the storage layer free of shared mutable
//! state.
//!
//! ## Module Organization
//!
//! - `block_file`: low-level paged mmap storage (`BlockFile`)
//! - `page`: node page header shared by B+-tree interior and leaf pages
//! - `headers`: per-file header blocks (magic, root pointer, block count)
//! - `data_store`: record-packed vector pages (`DataStore`)

mod block_file;
mod data_store;
mod headers;
mod page;

pub use block_file::BlockFile;
pub use data_store::{DataStore, DATA_FILE_NAME};
pub use headers::{TreeFileHeader, TREE_HEADER_SIZE, TREE_MAGIC};
pub use page::{NodeHeader, PageType, NODE_HEADER_SIZE};

use eyre::{ensure, Result};
use zerocopy::{FromBytes, Immutable, KnownLayout};

/// Parses a zerocopy struct from a byte slice with size validation.
#[inline]
pub fn parse_zerocopy<'a, T: FromBytes + KnownLayout + Immutable>(
    bytes: &'a [u8],
    type_name: &str,
) -> Result<&'a T> {
    let size = std::mem::size_of::<T>();
    ensure!(
        bytes.len() >= size,
        "buffer too small for {}: {} < {}",
        type_name,
        bytes.len(),
        size
    );
    T::ref_from_bytes(&bytes[..size])
        .map_err(|e| eyre::eyre!("failed to parse {}: {:?}", type_name, e))
}

/// Parses a mutable zerocopy struct from a byte slice with size validation.
#[inline]
pub fn parse_zerocopy_mut<'a, T: FromBytes + KnownLayout + zerocopy::IntoBytes>(
    bytes: &'a mut [u8],
    type_name: &str,
) -> Result<&'a mut T> {
    let size = std::mem::size_of::<T>();
    ensure!(
        bytes.len() >= size,
        "buffer too small for {}: {} < {}",
        type_name,
        bytes.len(),
        size
    );
    T::mut_from_bytes(&mut bytes[..size])
        .map_err(|e| eyre::eyre!("failed to parse {}: {:?}", type_name, e))
}
