//! # qalsh - External-Memory c-k-ANN Search
//!
//! A disk-resident index for approximate nearest-neighbor search in
//! high-dimensional spaces under arbitrary L_p norms with p in (0, 2],
//! built on query-aware locality-sensitive hashing. Given n vectors on
//! disk it answers k-NN queries with a provable c-approximation guarantee
//! while bounding the page I/O spent per query.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Drivers (cli, binary)        │
//! ├─────────────────────────────────────┤
//! │   QalshIndex (params, build, knn)   │
//! ├──────────────────┬──────────────────┤
//! │  m projection    │  hash families   │
//! │  B+-trees        │  (p-stable)      │
//! ├──────────────────┴──────────────────┤
//! │  DataStore (record-packed vectors)  │
//! ├─────────────────────────────────────┤
//! │  BlockFile (mmap'd B-byte pages)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! A build projects every point onto m random p-stable directions and
//! bulk loads each sorted projection into its own B+-tree. A query walks
//! all m trees outward from its own projection simultaneously, counts
//! collisions, and evaluates the exact distance only for points frequent
//! enough to be promising, growing its search radius geometrically until
//! the answer is provably good enough or the candidate budget is spent.
//!
//! ## On-Disk Layout
//!
//! ```text
//! index_dir/
//! ├── para          # parameters + hash matrix (text)
//! ├── 0.qalsh       # one B+-tree per projection
//! └── ...
//! data_dir/
//! └── vectors.data  # B-byte pages, floor(B / 4d) records each
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use qalsh::{DataStore, MinKList, QalshIndex};
//!
//! let index = QalshIndex::build(&data, d, 4096, 2.0, 0.0, 2.0, index_dir, seed)?;
//! let store = DataStore::create(data_dir, &data, d, 4096)?;
//!
//! let mut results = MinKList::new(10);
//! let io = index.knn(10, &query, &store, &mut results)?;
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: memory-mapped block files, the packed vector store
//! - `btree`: bulk-loaded B+-trees with variable-increment leaves
//! - `lsh`: p-stable hash families and collision probabilities
//! - `qalsh`: parameter derivation, build/load, the k-NN state machine
//! - `distance`: L_p distance kernel
//! - `dataset`: text dataset / ground-truth file IO
//! - `cli`: the driver commands behind the binary

#[macro_use]
mod macros;

pub mod btree;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod lsh;
pub mod qalsh;
pub mod storage;

pub use error::IndexError;
pub use lsh::HashFamily;
pub use qalsh::{MinKList, Params, QalshIndex};
pub use storage::{BlockFile, DataStore};
