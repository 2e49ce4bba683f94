//! # Configuration Constants
//!
//! This module centralizes the tuning constants of the index. Values that
//! depend on each other are co-located and the dependencies documented, so a
//! change in one place does not silently invalidate another.
//!
//! ## Dependency Graph
//!
//! ```text
//! CANDIDATES (100)
//!       │
//!       ├─> beta = CANDIDATES / n during parameter derivation
//!       │
//!       └─> per-query candidate budget T = CANDIDATES + k - 1
//!
//! LEAF_KEY_STRIDE (64 bytes)
//!       │
//!       └─> leaf key-slot capacity = page_size / LEAF_KEY_STRIDE
//!             which in turn fixes the leaf `increment` (entries per
//!             key-slot) and therefore the leaf entry capacity
//!
//! MONTE_CARLO_SAMPLES (1,000,000)
//!       │
//!       └─> standard error of the estimated collision probabilities is
//!           about 0.0005; the derived hash count m is stable to +-1
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `CANDIDATES >= 1` (the candidate budget must admit at least one
//!    distance evaluation)
//! 2. `LEAF_KEY_STRIDE >= 8` (a key slot plus at least one entry)
//! 3. `MIN_PAGE_SIZE >= 2 * LEAF_KEY_STRIDE` (a leaf holds at least two
//!    key slots, so sibling stepping inside a leaf is exercised)

/// Base candidate budget. A k-NN query terminates unconditionally after
/// `CANDIDATES + k - 1` exact distance evaluations, and parameter
/// derivation uses `beta = CANDIDATES / n` as the false-positive ratio.
pub const CANDIDATES: usize = 100;

/// Depth of the ground-truth file: exact distances are recorded for the
/// top `MAX_K` neighbors of every query.
pub const MAX_K: usize = 100;

/// The k values evaluated by the search and linear-scan drivers.
pub const TOP_K_ROUNDS: [usize; 11] = [1, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

/// Bytes of leaf page per stored key slot. A leaf stores one
/// representative key for every `increment` entries, where `increment`
/// is derived from this stride; see `btree::leaf`.
pub const LEAF_KEY_STRIDE: usize = 64;

/// Smallest supported page size. Below this a leaf could not hold two
/// key slots and the bulk-loaded layout degenerates.
pub const MIN_PAGE_SIZE: usize = 128;

/// Sample count for the Monte-Carlo estimate of collision probabilities
/// under a general p-stable distribution.
pub const MONTE_CARLO_SAMPLES: usize = 1_000_000;

/// Tolerance for matching a requested norm against the closed-form
/// families (p = 0.5, 1, 2) and the tabulated bucket widths.
pub const FLOAT_ZERO: f32 = 1e-6;

/// Name of the parameter file inside an index directory.
pub const PARAM_FILE_NAME: &str = "para";

/// Extension of the per-projection B+-tree files (`<i>.qalsh`).
pub const TREE_FILE_EXTENSION: &str = "qalsh";

const _: () = assert!(CANDIDATES >= 1, "candidate budget must be positive");

const _: () = assert!(
    LEAF_KEY_STRIDE >= 8,
    "a key stride must cover a key slot plus at least one entry"
);

const _: () = assert!(
    MIN_PAGE_SIZE >= 2 * LEAF_KEY_STRIDE,
    "MIN_PAGE_SIZE must admit at least two leaf key slots"
);
