//! # Command-Line Drivers
//!
//! The operations behind the `qalsh` binary's `-alg` switch:
//!
//! | alg | command        | what it does                                  |
//! |-----|----------------|-----------------------------------------------|
//! | 0   | `ground_truth` | exact k-NN over the text dataset, persisted   |
//! | 1   | `indexing`     | paged data store + index construction         |
//! | 2   | `lshknn`       | c-k-ANN search, evaluated against the truth   |
//! | 3   | `linear_scan`  | disk-based brute force, same report format    |
//!
//! The binary itself only parses arguments and dispatches; everything
//! with behavior lives here where the tests can reach it.

mod commands;

pub use commands::{ground_truth, indexing, linear_scan, lshknn};
