//! # Bounded Top-k Result List
//!
//! A capacity-k list of `(distance, id)` pairs kept sorted ascending.
//! Insertion keeps the k smallest distances seen so far and reports the
//! current k-th distance, which the search compares against its radius
//! for early termination.
//!
//! Positions beyond the filled prefix read as `+inf`, so a caller asking
//! for more neighbors than the dataset holds sees sentinel distances
//! rather than an error.

/// Bounded ascending list of the k nearest candidates.
#[derive(Debug, Clone)]
pub struct MinKList {
    k: usize,
    items: Vec<(f32, u32)>,
}

impl MinKList {
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "top-k list needs positive capacity");
        Self {
            k,
            items: Vec::with_capacity(k + 1),
        }
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Inserts a candidate, keeping the k smallest. Returns the current
    /// k-th distance (`+inf` while the list is underfilled). A pair that
    /// is already present is ignored.
    pub fn insert(&mut self, key: f32, id: u32) -> f32 {
        if self.items.len() == self.k
            && key >= self.items[self.k - 1].0
            && !self.contains(key, id)
        {
            return self.items[self.k - 1].0;
        }

        if !self.contains(key, id) {
            let pos = self.items.partition_point(|&(d, _)| d <= key);
            self.items.insert(pos, (key, id));
            self.items.truncate(self.k);
        }

        self.kth_key()
    }

    /// The i-th smallest distance, `+inf` beyond the filled prefix.
    pub fn ith_key(&self, i: usize) -> f32 {
        self.items.get(i).map_or(f32::INFINITY, |&(d, _)| d)
    }

    /// The id paired with the i-th smallest distance.
    pub fn ith_id(&self, i: usize) -> Option<u32> {
        self.items.get(i).map(|&(_, id)| id)
    }

    /// Current k-th distance: `+inf` until the list fills.
    pub fn kth_key(&self) -> f32 {
        if self.items.len() == self.k {
            self.items[self.k - 1].0
        } else {
            f32::INFINITY
        }
    }

    fn contains(&self, key: f32, id: u32) -> bool {
        self.items.iter().any(|&(d, i)| i == id && d == key)
    }
}
