//! # Tree Bulk Load and Access
//!
//! `BTree` ties the node layouts to a `BlockFile`: bulk load writes leaves
//! and interior levels bottom-up into a freshly created file of the exact
//! size, and `open` validates the header block before handing out node
//! views.
//!
//! ## Bulk Load
//!
//! 1. Chunk the sorted entries into leaves at full entry capacity; link
//!    siblings; remember each leaf's first key.
//! 2. Chunk the `(first key, block)` list into interior nodes of full
//!    fanout, one level at a time, until a single node remains. That node
//!    is the root and is written last.
//! 3. Stamp block 0 with the file header (root block, block count,
//!    height) and sync.
//!
//! The block count is computed before the file is created, so the mapping
//! is never remapped mid-build.

use std::path::Path;

use eyre::{ensure, Result};
use tracing::debug;

use super::interior::{interior_capacity, InteriorNode, InteriorNodeMut};
use super::leaf::{leaf_entry_capacity, leaf_increment, LeafNode, LeafNodeMut};
use crate::config::MIN_PAGE_SIZE;
use crate::storage::{BlockFile, TreeFileHeader};

#[derive(Debug)]
pub struct BTree {
    file: BlockFile,
    root_block: u32,
    height: u32,
}

impl BTree {
    /// Builds a tree over `entries`, which must be sorted ascending by
    /// (key, id), replacing any file at `path`.
    pub fn bulkload(path: &Path, page_size: usize, entries: &[(f32, u32)]) -> Result<Self> {
        ensure!(!entries.is_empty(), "refusing to bulk load an empty tree");
        ensure!(
            page_size >= MIN_PAGE_SIZE,
            "page size {} below minimum {}",
            page_size,
            MIN_PAGE_SIZE
        );
        debug_assert!(entries
            .windows(2)
            .all(|w| (w[0].0, w[0].1) <= (w[1].0, w[1].1)));

        let entry_cap = leaf_entry_capacity(page_size);
        let increment = leaf_increment(page_size);
        let fanout = interior_capacity(page_size);

        let num_leaves = entries.len().div_ceil(entry_cap);
        let mut level_count = num_leaves;
        let mut total_nodes = num_leaves;
        while level_count > 1 {
            level_count = level_count.div_ceil(fanout);
            total_nodes += level_count;
        }

        let mut file = BlockFile::create(path, page_size, (1 + total_nodes) as u32)?;

        let mut next_block: u32 = 1;
        let mut children: Vec<(f32, u32)> = Vec::with_capacity(num_leaves);
        for (chunk_idx, chunk) in entries.chunks(entry_cap).enumerate() {
            let block = next_block;
            next_block += 1;

            let left = if chunk_idx == 0 { 0 } else { block - 1 };
            let right = if chunk_idx + 1 == num_leaves { 0 } else { block + 1 };

            let mut leaf = LeafNodeMut::init(file.page_mut(block)?)?;
            leaf.set_left_sibling(left);
            leaf.set_right_sibling(right);
            for (pos, (key, id)) in chunk.iter().enumerate() {
                if pos % increment == 0 {
                    leaf.set_key(pos / increment, *key);
                }
                leaf.set_entry(pos, *id);
            }
            leaf.set_num_keys(chunk.len().div_ceil(increment) as u16);
            leaf.set_num_entries(chunk.len() as u16);

            children.push((chunk[0].0, block));
        }

        let mut level: u8 = 1;
        while children.len() > 1 {
            let num_nodes = children.len().div_ceil(fanout);
            let mut parents: Vec<(f32, u32)> = Vec::with_capacity(num_nodes);
            for (group_idx, group) in children.chunks(fanout).enumerate() {
                let block = next_block;
                next_block += 1;

                let left = if group_idx == 0 { 0 } else { block - 1 };
                let right = if group_idx + 1 == num_nodes { 0 } else { block + 1 };

                let mut node = InteriorNodeMut::init(file.page_mut(block)?, level)?;
                node.set_left_sibling(left);
                node.set_right_sibling(right);
                for (idx, (key, child)) in group.iter().enumerate() {
                    node.set_slot(idx, *key, *child);
                }
                node.set_num_keys(group.len() as u16);

                parents.push((group[0].0, block));
            }
            children = parents;
            level += 1;
        }

        let root_block = children[0].1;
        let height = (level - 1) as u32;
        debug_assert_eq!(next_block, 1 + total_nodes as u32);

        let header = TreeFileHeader::new(page_size as u32, root_block, next_block, height);
        header.write_to(file.page_mut(0)?)?;
        file.sync()?;

        debug!(
            path = %path.display(),
            entries = entries.len(),
            leaves = num_leaves,
            height,
            "bulk loaded projection tree"
        );

        Ok(Self {
            file,
            root_block,
            height,
        })
    }

    /// Opens an existing tree file, validating its header block.
    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        let file = BlockFile::open(path, page_size)?;
        let header = TreeFileHeader::from_bytes(file.page(0)?)?;
        header.validate(path, page_size, file.page_count())?;

        let root_block = header.root_block();
        let height = header.height();
        Ok(Self {
            file,
            root_block,
            height,
        })
    }

    pub fn root_block(&self) -> u32 {
        self.root_block
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn page_size(&self) -> usize {
        self.file.page_size()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn leaf(&self, block: u32) -> Result<LeafNode<'_>> {
        LeafNode::from_page(self.file.page(block)?)
    }

    pub fn interior(&self, block: u32) -> Result<InteriorNode<'_>> {
        InteriorNode::from_page(self.file.page(block)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: usize = 128;

    fn entries(n: usize) -> Vec<(f32, u32)> {
        (0..n).map(|i| (i as f32 * 0.5, i as u32)).collect()
    }

    fn collect_leaf_ids(tree: &BTree) -> Vec<u32> {
        // walk down the left spine, then follow right siblings
        let mut block = tree.root_block();
        while tree.interior(block).is_ok() {
            block = tree.interior(block).unwrap().son(0);
        }
        let mut ids = Vec::new();
        loop {
            let leaf = tree.leaf(block).unwrap();
            for pos in 0..leaf.num_entries() {
                ids.push(leaf.entry_id(pos));
            }
            match leaf.right_sibling() {
                0 => break,
                next => block = next,
            }
        }
        ids
    }

    #[test]
    fn single_leaf_tree_has_root_block_one() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let tree = BTree::bulkload(&path, PAGE, &entries(5)).unwrap();

        assert_eq!(tree.root_block(), 1);
        assert_eq!(tree.height(), 0);
        assert!(tree.leaf(1).is_ok());
    }

    #[test]
    fn multi_leaf_tree_builds_interior_levels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let cap = leaf_entry_capacity(PAGE);
        let tree = BTree::bulkload(&path, PAGE, &entries(cap * 3 + 1)).unwrap();

        assert!(tree.root_block() > 1);
        assert!(tree.height() >= 1);
        let root = tree.interior(tree.root_block()).unwrap();
        assert!(root.num_keys() >= 2);
    }

    #[test]
    fn bulkload_preserves_entry_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let cap = leaf_entry_capacity(PAGE);
        let input = entries(cap * 4 + 7);
        let tree = BTree::bulkload(&path, PAGE, &input).unwrap();

        let ids = collect_leaf_ids(&tree);
        assert_eq!(ids.len(), input.len());
        assert_eq!(
            ids,
            input.iter().map(|(_, id)| *id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn leaves_are_doubly_linked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let cap = leaf_entry_capacity(PAGE);
        let tree = BTree::bulkload(&path, PAGE, &entries(cap * 3)).unwrap();

        let mut block = 1u32;
        let mut prev = 0u32;
        loop {
            let leaf = tree.leaf(block).unwrap();
            assert_eq!(leaf.left_sibling(), prev);
            match leaf.right_sibling() {
                0 => break,
                next => {
                    prev = block;
                    block = next;
                }
            }
        }
    }

    #[test]
    fn separator_keys_match_child_first_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let cap = leaf_entry_capacity(PAGE);
        let input = entries(cap * 3);
        let tree = BTree::bulkload(&path, PAGE, &input).unwrap();

        let root = tree.interior(tree.root_block()).unwrap();
        for idx in 0..root.num_keys() {
            let child = tree.leaf(root.son(idx)).unwrap();
            assert_eq!(root.key(idx), child.key(0));
        }
    }

    #[test]
    fn open_round_trips_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let cap = leaf_entry_capacity(PAGE);
        let built = BTree::bulkload(&path, PAGE, &entries(cap * 2 + 3)).unwrap();
        let (root, height) = (built.root_block(), built.height());
        drop(built);

        let opened = BTree::open(&path, PAGE).unwrap();
        assert_eq!(opened.root_block(), root);
        assert_eq!(opened.height(), height);
        assert_eq!(collect_leaf_ids(&opened).len(), cap * 2 + 3);
    }

    #[test]
    fn open_rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.qalsh");
        let cap = leaf_entry_capacity(PAGE);
        BTree::bulkload(&path, PAGE, &entries(cap * 5)).unwrap();

        // chop off the last block
        let len = std::fs::metadata(&path).unwrap().len();
        let f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        f.set_len(len - PAGE as u64).unwrap();

        let err = BTree::open(&path, PAGE).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::IndexError>(),
            Some(crate::error::IndexError::CorruptedIndex { .. })
        ));
    }
}
