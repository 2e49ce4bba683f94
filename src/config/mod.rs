//! # Configuration
//!
//! Tuning constants shared across the crate. See [`constants`] for the
//! values and the dependency notes that go with them.

mod constants;

pub use constants::{
    CANDIDATES, FLOAT_ZERO, LEAF_KEY_STRIDE, MAX_K, MIN_PAGE_SIZE, MONTE_CARLO_SAMPLES,
    PARAM_FILE_NAME, TOP_K_ROUNDS, TREE_FILE_EXTENSION,
};
