//! # Paged Block File
//!
//! `BlockFile` is the low-level building block behind both the B+-tree
//! files and the packed vector store: a named file treated as an array of
//! fixed-size pages, memory-mapped for zero-copy access.
//!
//! ## Runtime Page Size
//!
//! The page size `B` is a build parameter of the index (it controls tree
//! fanout and record packing), so unlike a conventional storage engine it
//! is a field, not a constant. Creation and open both pin it; a file whose
//! length is not a multiple of the expected page size is rejected as
//! corrupted rather than rounded.
//!
//! ## Safety Model
//!
//! Memory-mapped regions become invalid when a file is remapped. The borrow
//! checker enforces the discipline at compile time:
//!
//! ```text
//! page(&self) -> &[u8]          // immutable borrow of self
//! page_mut(&mut self) -> &mut [u8]  // exclusive borrow
//! ```
//!
//! Files here are written once during bulk load and read-only afterwards,
//! so there is no `grow`: the creator computes the exact page count up
//! front and the map never moves.
//!
//! ## I/O Accounting
//!
//! `BlockFile` performs no counting. Query code increments its own page-I/O
//! counter at every node or data page it visits, which is the unit the
//! search cost model is stated in.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;

use crate::error::IndexError;

#[derive(Debug)]
pub struct BlockFile {
    path: PathBuf,
    mmap: MmapMut,
    page_size: usize,
    page_count: u32,
}

impl BlockFile {
    /// Creates a file of exactly `page_count` zeroed pages.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize, page_count: u32) -> Result<Self> {
        let path = path.as_ref();

        ensure!(page_size > 0, "page size must be positive");
        ensure!(page_count > 0, "initial page count must be at least 1");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| IndexError::IoFailure {
                path: path.to_path_buf(),
                detail: format!("create failed: {e}"),
            })?;

        let file_size = page_count as u64 * page_size as u64;
        file.set_len(file_size)
            .wrap_err_with(|| format!("failed to set file size to {} bytes", file_size))?;

        // SAFETY: MmapMut::map_mut is unsafe because memory-mapped files can
        // be modified externally. This is safe because:
        // 1. The file was just created with truncate=true and is owned by
        //    this process for the duration of the mapping
        // 2. The file size is a valid multiple of page_size
        // 3. The mmap lifetime is tied to BlockFile, preventing use-after-unmap
        // 4. All access goes through page()/page_mut() which bounds-check
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            page_size,
            page_count,
        })
    }

    /// Opens an existing file, validating that its length is a nonzero
    /// multiple of `page_size`.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let path = path.as_ref();

        ensure!(page_size > 0, "page size must be positive");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| IndexError::IoFailure {
                path: path.to_path_buf(),
                detail: format!("open failed: {e}"),
            })?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        if file_size == 0 || file_size % page_size as u64 != 0 {
            return Err(IndexError::CorruptedIndex {
                path: path.to_path_buf(),
                detail: format!(
                    "file size {} is not a nonzero multiple of page size {}",
                    file_size, page_size
                ),
            }
            .into());
        }

        let page_count = (file_size / page_size as u64) as u32;

        // SAFETY: MmapMut::map_mut is unsafe because memory-mapped files can
        // be modified externally. This is safe because:
        // 1. Index and data files are not modified by external processes
        //    once built
        // 2. The mmap lifetime is tied to BlockFile, preventing use-after-unmap
        // 3. All access goes through page()/page_mut() which bounds-check
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            page_size,
            page_count,
        })
    }

    pub fn page(&self, page_no: u32) -> Result<&[u8]> {
        if page_no >= self.page_count {
            return Err(IndexError::IoFailure {
                path: self.path.clone(),
                detail: format!(
                    "page {} out of bounds (page_count={})",
                    page_no, self.page_count
                ),
            }
            .into());
        }
        let offset = page_no as usize * self.page_size;
        Ok(&self.mmap[offset..offset + self.page_size])
    }

    pub fn page_mut(&mut self, page_no: u32) -> Result<&mut [u8]> {
        if page_no >= self.page_count {
            return Err(IndexError::IoFailure {
                path: self.path.clone(),
                detail: format!(
                    "page {} out of bounds (page_count={})",
                    page_no, self.page_count
                ),
            }
            .into());
        }
        let offset = page_no as usize * self.page_size;
        Ok(&mut self.mmap[offset..offset + self.page_size])
    }

    pub fn sync(&self) -> Result<()> {
        self.mmap
            .flush()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advises the kernel that a page range will be read soon. A hint only;
    /// sequential scans use it, point lookups do not need it.
    pub fn prefetch(&self, start_page: u32, count: u32) {
        if start_page >= self.page_count {
            return;
        }

        let end_page = (start_page + count).min(self.page_count);
        let start_offset = start_page as usize * self.page_size;
        let len = (end_page - start_page) as usize * self.page_size;

        #[cfg(unix)]
        // SAFETY: madvise with MADV_WILLNEED is a hint to the kernel. The
        // range is valid because:
        // 1. start_page was bounds-checked above
        // 2. end_page is clamped to self.page_count
        // 3. start_offset + len never exceeds the mapped file size
        unsafe {
            libc::madvise(
                self.mmap.as_ptr().add(start_offset) as *mut libc::c_void,
                len,
                libc::MADV_WILLNEED,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_open_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.bin");

        {
            let mut bf = BlockFile::create(&path, 512, 3).unwrap();
            bf.page_mut(1).unwrap()[0] = 0xAB;
            bf.sync().unwrap();
        }

        let bf = BlockFile::open(&path, 512).unwrap();
        assert_eq!(bf.page_count(), 3);
        assert_eq!(bf.page_size(), 512);
        assert_eq!(bf.page(1).unwrap()[0], 0xAB);
        assert_eq!(bf.page(2).unwrap()[0], 0x00);
    }

    #[test]
    fn open_missing_file_is_io_failure() {
        let dir = tempdir().unwrap();
        let err = BlockFile::open(dir.path().join("absent.bin"), 512).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::IoFailure { .. })
        ));
    }

    #[test]
    fn open_rejects_partial_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, vec![0u8; 700]).unwrap();

        let err = BlockFile::open(&path, 512).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::CorruptedIndex { .. })
        ));
    }

    #[test]
    fn page_out_of_bounds() {
        let dir = tempdir().unwrap();
        let bf = BlockFile::create(dir.path().join("p.bin"), 256, 2).unwrap();

        let err = bf.page(2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::IoFailure { .. })
        ));
    }

    #[test]
    fn pages_are_zeroed_on_create() {
        let dir = tempdir().unwrap();
        let bf = BlockFile::create(dir.path().join("z.bin"), 128, 4).unwrap();
        assert!(bf.page(3).unwrap().iter().all(|&b| b == 0));
    }
}
