//! # Packed Vector Store
//!
//! The data store re-emits the dataset into a page-aligned binary file so a
//! query can fetch any record with exactly one page access. This is the
//! "new format" the index reads candidate vectors from during search.
//!
//! ## Record Packing
//!
//! Each record is `d` little-endian f32 values. Records are packed in id
//! order, `floor(B / 4d)` per B-byte page, with the tail of every page
//! zero-padded; record `id` therefore lives at
//!
//! ```text
//! page   = id / per_page
//! offset = (id % per_page) * 4 * d
//! ```
//!
//! and no record straddles a page boundary.
//!
//! ## I/O Accounting
//!
//! `read_into` performs one page-sized access. The caller counts it: during
//! k-NN search each promoted candidate costs one data-page read plus one
//! distance evaluation, accounted together as `dist_io`; the sequential
//! scan driver instead iterates pages with [`DataStore::page`] and pays one
//! I/O per page regardless of how many records it holds.

use std::fs;
use std::path::Path;

use eyre::{ensure, Result};
use zerocopy::byteorder::{LittleEndian, F32};
use zerocopy::FromBytes;

use super::BlockFile;
use crate::error::IndexError;

pub const DATA_FILE_NAME: &str = "vectors.data";

#[derive(Debug)]
pub struct DataStore {
    file: BlockFile,
    dim: usize,
    count: u32,
    per_page: usize,
}

impl DataStore {
    /// Packs `data` (a flat `count * dim` buffer in id order) into the data
    /// folder, replacing any previous file.
    pub fn create(dir: &Path, data: &[f32], dim: usize, page_size: usize) -> Result<Self> {
        ensure!(dim > 0, "dimension must be positive");
        ensure!(
            data.len() % dim == 0,
            "data length {} is not a multiple of dimension {}",
            data.len(),
            dim
        );

        let per_page = page_size / (4 * dim);
        ensure!(
            per_page > 0,
            "page size {} cannot hold a single {}-dimensional record",
            page_size,
            dim
        );

        let count = (data.len() / dim) as u32;
        ensure!(count > 0, "refusing to create an empty data store");

        fs::create_dir_all(dir).map_err(|e| IndexError::IoFailure {
            path: dir.to_path_buf(),
            detail: format!("failed to create data directory: {e}"),
        })?;

        let page_count = count.div_ceil(per_page as u32);
        let mut file = BlockFile::create(dir.join(DATA_FILE_NAME), page_size, page_count)?;

        for id in 0..count as usize {
            let page_no = (id / per_page) as u32;
            let offset = (id % per_page) * 4 * dim;
            let page = file.page_mut(page_no)?;
            let record = &data[id * dim..(id + 1) * dim];
            for (j, &v) in record.iter().enumerate() {
                let at = offset + 4 * j;
                page[at..at + 4].copy_from_slice(&v.to_le_bytes());
            }
        }
        file.sync()?;

        Ok(Self {
            file,
            dim,
            count,
            per_page,
        })
    }

    /// Opens an existing data folder. `count`, `dim`, and `page_size` come
    /// from the parameter file; the file length must cover all records.
    pub fn open(dir: &Path, count: u32, dim: usize, page_size: usize) -> Result<Self> {
        ensure!(dim > 0, "dimension must be positive");

        let per_page = page_size / (4 * dim);
        ensure!(
            per_page > 0,
            "page size {} cannot hold a single {}-dimensional record",
            page_size,
            dim
        );

        let path = dir.join(DATA_FILE_NAME);
        let file = BlockFile::open(&path, page_size)?;

        let needed = count.div_ceil(per_page as u32);
        if file.page_count() < needed {
            return Err(IndexError::CorruptedIndex {
                path,
                detail: format!(
                    "data file holds {} pages but {} records need {}",
                    file.page_count(),
                    count,
                    needed
                ),
            }
            .into());
        }

        Ok(Self {
            file,
            dim,
            count,
            per_page,
        })
    }

    /// Reads record `id` into `out`. One page access.
    pub fn read_into(&self, id: u32, out: &mut [f32]) -> Result<()> {
        if id >= self.count {
            return Err(IndexError::OutOfRangeId { id, n: self.count }.into());
        }
        if out.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: out.len(),
            }
            .into());
        }

        let page = self.file.page((id as usize / self.per_page) as u32)?;
        let offset = (id as usize % self.per_page) * 4 * self.dim;
        decode_record(&page[offset..offset + 4 * self.dim], out);
        Ok(())
    }

    /// Raw page access for sequential scans; pair with
    /// [`DataStore::decode_slot`].
    pub fn page(&self, page_no: u32) -> Result<&[u8]> {
        self.file.page(page_no)
    }

    /// Decodes the record in `slot` of a page previously obtained from
    /// [`DataStore::page`]. The caller is responsible for keeping the
    /// implied id (`page_no * per_page + slot`) below `count`.
    pub fn decode_slot(&self, page: &[u8], slot: usize, out: &mut [f32]) {
        debug_assert!(slot < self.per_page);
        debug_assert_eq!(out.len(), self.dim);
        let offset = slot * 4 * self.dim;
        decode_record(&page[offset..offset + 4 * self.dim], out);
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn records_per_page(&self) -> usize {
        self.per_page
    }

    pub fn page_count(&self) -> u32 {
        self.file.page_count()
    }

    /// Hints the kernel to fault in the whole file, for sequential scans.
    pub fn prefetch_all(&self) {
        self.file.prefetch(0, self.file.page_count());
    }
}

fn decode_record(bytes: &[u8], out: &mut [f32]) {
    // F32<LittleEndian> is unaligned, so this never fails for a slice of
    // the right length.
    let values = <[F32<LittleEndian>]>::ref_from_bytes(bytes)
        .expect("record slice length is a multiple of 4");
    for (o, v) in out.iter_mut().zip(values) {
        *o = v.get();
    }
}
