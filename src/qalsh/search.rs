//! # k-NN Search
//!
//! The expanding-window search over the m projection trees. Each tree is
//! entered at the query's projected value and walked outward through two
//! cursors, left and right; a virtual bucket of width `w * r` centered on
//! the query admits cursor positions, and the radius r grows geometrically
//! until a termination condition fires.
//!
//! ## Cursors
//!
//! A cursor pins one leaf and covers one key-slot run: `index_pos` names
//! the key slot, `leaf_pos` the entry the scan starts from, and `size` how
//! many consecutive entries the run holds. Advancing moves one key slot
//! outward, or over the sibling link when the leaf is spent; a cursor with
//! nowhere to go becomes `None` and never revives. The two cursors of a
//! projection may pin the same leaf; they hold block ids into the shared
//! read-only mapping, so aliasing is harmless.
//!
//! ```text
//!   keys:   ... k3  k2  k1 | q |  k1' k2' k3' ...
//!                 <- left cursor   right cursor ->
//! ```
//!
//! ## Collision Counting
//!
//! When a cursor's key lies inside the bucket, every entry of its run
//! bumps that id's collision count; an id crossing the threshold l is
//! promoted exactly once: its vector is read from the data store, the
//! exact L_p distance computed, and the result list updated. Projections
//! take turns round-robin, so no single projection can exhaust the
//! candidate budget while others still have in-bucket runs.
//!
//! ## Termination
//!
//! 1. the k-th distance beats `c * r` and at least k candidates were
//!    evaluated (the provable early exit), or
//! 2. the candidate budget `T = 100 + k - 1` is spent, or
//! 3. every cursor is exhausted (the dataset is smaller than the budget).
//!
//! The returned cost is `page_io + dist_io`: tree pages visited plus one
//! per promoted candidate (its data-page read and distance evaluation).

use eyre::{ensure, Result};
use smallvec::SmallVec;

use super::{MinKList, QalshIndex};
use crate::btree::{BTree, LeafNode};
use crate::config::CANDIDATES;
use crate::distance::lp_dist;
use crate::error::IndexError;
use crate::storage::DataStore;

/// A live cursor position inside one projection tree.
#[derive(Debug, Clone, Copy)]
struct PageCursor {
    block: u32,
    index_pos: usize,
    leaf_pos: usize,
    size: usize,
}

/// `None` once the cursor has walked off its end of the projection.
type Cursor = Option<PageCursor>;

impl QalshIndex {
    /// Finds the `top_k` approximate nearest neighbors of `query`,
    /// filling `list`. Returns the total I/O cost of the query.
    pub fn knn(
        &self,
        top_k: usize,
        query: &[f32],
        store: &DataStore,
        list: &mut MinKList,
    ) -> Result<u64> {
        if query.len() != self.params.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.params.dim,
                actual: query.len(),
            }
            .into());
        }
        ensure!(top_k > 0, "top_k must be positive");

        let m = self.params.m;
        let l = self.params.l as u32;
        let ratio = self.params.ratio;
        let w = self.params.w;

        let mut page_io: u64 = 0;
        let mut dist_io: u64 = 0;

        // per-query transient state, dropped on every exit path
        let mut freq = vec![0u32; self.params.n];
        let mut checked = vec![false; self.params.n];
        let mut flag = vec![true; m];
        let mut q_val = vec![0.0f32; m];
        let mut lptr: Vec<Cursor> = Vec::with_capacity(m);
        let mut rptr: Vec<Cursor> = Vec::with_capacity(m);

        for i in 0..m {
            q_val[i] = self.hash_value(i, query);
            let (left, right) = locate(&self.trees[i], q_val[i], &mut page_io)?;
            lptr.push(left);
            rptr.push(right);
        }

        let threshold = (CANDIDATES + top_k - 1) as u64;
        let mut knn_dist = f32::INFINITY;
        let mut radius = find_radius(&self.trees, &q_val, &lptr, &rptr, ratio, w)?;
        let mut bucket = w * radius / 2.0;
        let mut candidate = vec![0.0f32; self.params.dim];

        loop {
            flag.fill(true);
            let mut num_flag = 0usize;

            while num_flag < m && dist_io < threshold {
                for i in 0..m {
                    if !flag[i] {
                        continue;
                    }
                    let tree = &self.trees[i];
                    let ldist = proj_dist(tree, q_val[i], &lptr[i])?.unwrap_or(f32::INFINITY);
                    let rdist = proj_dist(tree, q_val[i], &rptr[i])?.unwrap_or(f32::INFINITY);

                    if ldist < bucket && ldist <= rdist {
                        if let Some(cur) = lptr[i] {
                            let leaf = tree.leaf(cur.block)?;
                            let start = cur.leaf_pos + 1 - cur.size;
                            for pos in (start..=cur.leaf_pos).rev() {
                                let id = leaf.entry_id(pos);
                                if checked[id as usize] {
                                    continue;
                                }
                                freq[id as usize] += 1;
                                if freq[id as usize] > l {
                                    checked[id as usize] = true;
                                    store.read_into(id, &mut candidate)?;
                                    let dist = lp_dist(self.params.p, &candidate, query);
                                    knn_dist = list.insert(dist, id);
                                    dist_io += 1;
                                    if dist_io >= threshold {
                                        break;
                                    }
                                }
                            }
                            advance_left(tree, &mut lptr[i], &mut page_io)?;
                        }
                    } else if rdist < bucket && rdist < ldist {
                        if let Some(cur) = rptr[i] {
                            let leaf = tree.leaf(cur.block)?;
                            let end = cur.leaf_pos + cur.size;
                            for pos in cur.leaf_pos..end {
                                let id = leaf.entry_id(pos);
                                if checked[id as usize] {
                                    continue;
                                }
                                freq[id as usize] += 1;
                                if freq[id as usize] > l {
                                    checked[id as usize] = true;
                                    store.read_into(id, &mut candidate)?;
                                    let dist = lp_dist(self.params.p, &candidate, query);
                                    knn_dist = list.insert(dist, id);
                                    dist_io += 1;
                                    if dist_io >= threshold {
                                        break;
                                    }
                                }
                            }
                            advance_right(tree, &mut rptr[i], &mut page_io)?;
                        }
                    } else {
                        flag[i] = false;
                        num_flag += 1;
                    }
                    if num_flag >= m || dist_io >= threshold {
                        break;
                    }
                }
            }

            if knn_dist < ratio * radius && dist_io >= top_k as u64 {
                break;
            }
            if dist_io >= threshold {
                break;
            }
            if lptr.iter().all(Option::is_none) && rptr.iter().all(Option::is_none) {
                // nothing left to surface anywhere
                break;
            }

            radius = update_radius(&self.trees, &q_val, &lptr, &rptr, ratio, w, radius)?;
            bucket = w * radius / 2.0;
        }

        Ok(page_io + dist_io)
    }
}

/// Descends one tree to the leaf covering `q` and positions the initial
/// cursor pair. When `q` is smaller than every key in the tree the left
/// cursor starts exhausted and the right cursor at the first leaf.
fn locate(tree: &BTree, q: f32, page_io: &mut u64) -> Result<(Cursor, Cursor)> {
    let root = tree.root_block();
    if root > 1 {
        let mut block = root;
        let mut node = tree.interior(block)?;
        *page_io += 1;

        let mut lescape = false;
        while node.level() > 1 {
            let follow = match node.find_position_by_key(q) {
                Some(pos) => pos,
                None if lescape => 0,
                None if block == root => {
                    lescape = true;
                    0
                }
                None => {
                    return Err(IndexError::CorruptedIndex {
                        path: tree.path().to_path_buf(),
                        detail: "no branch found below the root during descent".into(),
                    }
                    .into());
                }
            };
            block = node.son(follow);
            node = tree.interior(block)?;
            *page_io += 1;
        }

        let follow = match node.find_position_by_key(q) {
            Some(pos) => pos,
            None => {
                lescape = true;
                0
            }
        };
        let leaf_block = node.son(follow);

        if lescape {
            let leaf = tree.leaf(leaf_block)?;
            *page_io += 1;
            Ok((None, Some(first_slot_cursor(&leaf, leaf_block))))
        } else {
            position_within_leaf(tree, leaf_block, q, page_io)
        }
    } else {
        let leaf = tree.leaf(root)?;
        if leaf.find_position_by_key(q).is_none() {
            *page_io += 1;
            Ok((None, Some(first_slot_cursor(&leaf, root))))
        } else {
            position_within_leaf(tree, root, q, page_io)
        }
    }
}

/// Splits a leaf around the key slot covering `q`: the left cursor takes
/// the slot itself, the right cursor the next slot (or the first slot of
/// the right sibling when the leaf ends).
fn position_within_leaf(
    tree: &BTree,
    block: u32,
    q: f32,
    page_io: &mut u64,
) -> Result<(Cursor, Cursor)> {
    let leaf = tree.leaf(block)?;
    *page_io += 1;

    let pos = leaf.find_position_by_key(q).unwrap_or(0);
    let inc = leaf.increment();
    let nk = leaf.num_keys();
    let ne = leaf.num_entries();

    let left = if pos == nk - 1 {
        PageCursor {
            block,
            index_pos: pos,
            leaf_pos: ne - 1,
            size: ne - pos * inc,
        }
    } else {
        PageCursor {
            block,
            index_pos: pos,
            leaf_pos: pos * inc + inc - 1,
            size: inc,
        }
    };

    let right = if pos + 1 < nk {
        let rp = pos + 1;
        let size = if rp == nk - 1 { ne - rp * inc } else { inc };
        Some(PageCursor {
            block,
            index_pos: rp,
            leaf_pos: rp * inc,
            size,
        })
    } else {
        match leaf.right_sibling() {
            0 => None,
            next => {
                let sibling = tree.leaf(next)?;
                *page_io += 1;
                Some(first_slot_cursor(&sibling, next))
            }
        }
    };

    Ok((Some(left), right))
}

fn first_slot_cursor(leaf: &LeafNode<'_>, block: u32) -> PageCursor {
    PageCursor {
        block,
        index_pos: 0,
        leaf_pos: 0,
        size: leaf.increment().min(leaf.num_entries()),
    }
}

/// Projected distance from `q` to the cursor's current key, `None` for an
/// exhausted cursor.
fn proj_dist(tree: &BTree, q: f32, cursor: &Cursor) -> Result<Option<f32>> {
    match cursor {
        Some(cur) => {
            let leaf = tree.leaf(cur.block)?;
            Ok(Some((leaf.key(cur.index_pos) - q).abs()))
        }
        None => Ok(None),
    }
}

/// Moves a left cursor one key slot outward, or onto the left sibling
/// leaf, or to exhaustion.
fn advance_left(tree: &BTree, cursor: &mut Cursor, page_io: &mut u64) -> Result<()> {
    let Some(mut cur) = cursor.take() else {
        return Ok(());
    };
    let leaf = tree.leaf(cur.block)?;

    if cur.index_pos > 0 {
        cur.index_pos -= 1;
        let inc = leaf.increment();
        cur.leaf_pos = cur.index_pos * inc + inc - 1;
        cur.size = inc;
        *cursor = Some(cur);
    } else if let prev @ 1.. = leaf.left_sibling() {
        let sibling = tree.leaf(prev)?;
        *page_io += 1;
        let inc = sibling.increment();
        let nk = sibling.num_keys();
        let ne = sibling.num_entries();
        cur.block = prev;
        cur.index_pos = nk - 1;
        cur.leaf_pos = ne - 1;
        cur.size = ne - (nk - 1) * inc;
        *cursor = Some(cur);
    }
    Ok(())
}

/// Mirror of [`advance_left`] toward higher keys.
fn advance_right(tree: &BTree, cursor: &mut Cursor, page_io: &mut u64) -> Result<()> {
    let Some(mut cur) = cursor.take() else {
        return Ok(());
    };
    let leaf = tree.leaf(cur.block)?;

    if cur.index_pos + 1 < leaf.num_keys() {
        cur.index_pos += 1;
        let inc = leaf.increment();
        cur.leaf_pos = cur.index_pos * inc;
        cur.size = if cur.index_pos == leaf.num_keys() - 1 {
            leaf.num_entries() - cur.index_pos * inc
        } else {
            inc
        };
        *cursor = Some(cur);
    } else if let next @ 1.. = leaf.right_sibling() {
        let sibling = tree.leaf(next)?;
        *page_io += 1;
        cur.block = next;
        cur.index_pos = 0;
        cur.leaf_pos = 0;
        cur.size = sibling.increment().min(sibling.num_entries());
        *cursor = Some(cur);
    }
    Ok(())
}

/// Initial radius: the smallest power of the ratio whose bucket reaches
/// the median initial cursor distance, never below 1.
fn find_radius(
    trees: &[BTree],
    q_val: &[f32],
    lptr: &[Cursor],
    rptr: &[Cursor],
    ratio: f32,
    w: f32,
) -> Result<f32> {
    let radius = update_radius(trees, q_val, lptr, rptr, ratio, w, 1.0 / ratio)?;
    Ok(radius.max(1.0))
}

/// Next radius from the median of the live projected cursor distances
/// (lower of the two middles for even counts); one ratio step up when no
/// cursor is live.
fn update_radius(
    trees: &[BTree],
    q_val: &[f32],
    lptr: &[Cursor],
    rptr: &[Cursor],
    ratio: f32,
    w: f32,
    old_radius: f32,
) -> Result<f32> {
    let mut dists: SmallVec<[f32; 128]> = SmallVec::new();
    for i in 0..q_val.len() {
        if let Some(d) = proj_dist(&trees[i], q_val[i], &lptr[i])? {
            dists.push(d);
        }
        if let Some(d) = proj_dist(&trees[i], q_val[i], &rptr[i])? {
            dists.push(d);
        }
    }
    if dists.is_empty() {
        return Ok(ratio * old_radius);
    }

    dists.sort_unstable_by(|a, b| a.total_cmp(b));
    let median = dists[(dists.len() - 1) / 2];
    if median <= 0.0 {
        return Ok(ratio * old_radius);
    }

    let kappa = ((2.0 * median / w).ln() / ratio.ln()).ceil() as i32;
    Ok(ratio.powi(kappa))
}
