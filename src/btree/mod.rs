//! # Bulk-Loaded B+-Tree
//!
//! This module implements the disk-resident B+-tree that stores one sorted
//! projection of the dataset. The tree is built once, bottom-up, from the
//! full sorted entry list and never mutated afterwards; there is no insert
//! or delete path.
//!
//! ## Entry Model
//!
//! An entry is a `(key: f32, id: u32)` pair: the projected value of a data
//! point and its record id. The bulk-load input is sorted ascending by
//! (key, id), and that order is exactly the left-to-right leaf order of
//! the finished tree.
//!
//! ## Variable-Increment Leaf Layout
//!
//! A leaf does not store a key per entry. It stores one representative key
//! per `increment` entries, where `increment` is derived from the page
//! size (one key slot per [`crate::config::LEAF_KEY_STRIDE`] bytes of
//! page):
//!
//! ```text
//! +----------------------+
//! | NodeHeader (16B)     |  type=Leaf, level=0, siblings, counts
//! +----------------------+
//! | Key slots (f32)      |  key[s] = key of entry s * increment
//! +----------------------+
//! | Entry ids (u32)      |  record ids in (key, id) order
//! +----------------------+
//! ```
//!
//! The search descends to a key slot, then scans the `increment` entries
//! the slot covers. This trades a little scan work for a much higher
//! entry capacity per leaf, which is what bounds page I/O during the
//! expanding-window traversal.
//!
//! Invariants:
//! - a leaf's first stored key equals its first entry's key
//! - `num_entries <= increment * num_keys`; only the last key slot may be
//!   partially covered
//! - leaves are doubly linked; concatenating them left-to-right replays
//!   the bulk-load input order
//!
//! ## Interior Nodes
//!
//! Interior nodes are arrays of `(separator key, child block)` slots where
//! the separator is the first key of the child's subtree. Routing uses
//! "largest slot with key <= q"; a query smaller than every separator
//! falls off the left edge, which the search layer handles explicitly
//! (the leftmost branch is taken and the left cursor starts exhausted).
//!
//! ## File Layout
//!
//! Block 0 holds the [`crate::storage::TreeFileHeader`]; nodes occupy
//! blocks 1 and up, leaves first, then each interior level, the root
//! written last. `root_block == 1` means the whole tree is a single leaf.

mod interior;
mod leaf;
mod tree;

pub use interior::{interior_capacity, InteriorNode, InteriorNodeMut, InteriorSlot};
pub use leaf::{leaf_entry_capacity, leaf_increment, leaf_key_capacity, LeafNode, LeafNodeMut};
pub use tree::BTree;
