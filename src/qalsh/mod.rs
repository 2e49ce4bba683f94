//! # Query-Aware LSH Index
//!
//! The orchestrator of the crate: parameter derivation, hash-function
//! generation, bulk loading of one B+-tree per projection, persistence,
//! and the k-NN search state machine.
//!
//! ## Index Anatomy
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │            QalshIndex                │
//! ├──────────────────────────────────────┤
//! │ Params: n d B p zeta c w p1 p2 m l   │
//! ├──────────────────────────────────────┤
//! │ hash matrix a[m][d] (p-stable draws) │
//! ├──────────────────────────────────────┤
//! │ m B+-trees, one per projection       │
//! │   tree i: (a_i . x_j, j) sorted asc  │
//! └──────────────────────────────────────┘
//! ```
//!
//! The trees are query-independent: a query q is hashed with the same
//! matrix, and each tree is entered at q's projected value. The search
//! walks outward from that entry point in both directions, counting
//! collisions across trees, and promotes any point seen in more than l
//! projections to an exact distance evaluation against the data store.
//!
//! ## Build vs Load
//!
//! `build` derives parameters from (n, d, B, p, zeta, c), samples the
//! hash matrix from a caller-seeded RNG (identical seeds rebuild
//! identical indexes), writes the `para` file, and bulk loads the m
//! trees. `load` reverses it: parse `para`, reopen the trees, validate
//! headers. Everything on disk is immutable afterwards; queries share the
//! index freely.
//!
//! ## Module Organization
//!
//! - `params`: parameter derivation and the `para` file
//! - `search`: the expanding-window k-NN procedure
//! - `topk`: the bounded result list

mod params;
mod search;
mod topk;

pub use params::Params;
pub use topk::MinKList;

use std::fs;
use std::path::{Path, PathBuf};

use eyre::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::btree::BTree;
use crate::config::{PARAM_FILE_NAME, TREE_FILE_EXTENSION};
use crate::distance::dot;
use crate::error::IndexError;
use crate::lsh::HashFamily;

#[derive(Debug)]
pub struct QalshIndex {
    pub(crate) params: Params,
    pub(crate) a: Vec<f32>,
    pub(crate) trees: Vec<BTree>,
}

impl QalshIndex {
    /// Derives parameters, samples the hash matrix, persists `para`, and
    /// bulk loads one tree per projection. `data` is a flat `n * dim`
    /// buffer in id order.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        data: &[f32],
        dim: usize,
        page_size: usize,
        p: f32,
        zeta: f32,
        ratio: f32,
        index_dir: &Path,
        seed: u64,
    ) -> Result<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(IndexError::DimensionMismatch {
                expected: dim.max(1),
                actual: data.len() % dim.max(1),
            }
            .into());
        }
        let n = data.len() / dim;

        fs::create_dir_all(index_dir).map_err(|e| IndexError::IoFailure {
            path: index_dir.to_path_buf(),
            detail: format!("failed to create index directory: {e}"),
        })?;

        let mut rng = StdRng::seed_from_u64(seed);
        let params = Params::derive(n, dim, page_size, p, zeta, ratio, &mut rng)?;
        let family = params.family();

        let a: Vec<f32> = (0..params.m * dim).map(|_| family.sample(&mut rng)).collect();

        params::write_params(&index_dir.join(PARAM_FILE_NAME), &params, &a)?;
        log_params(&params, family);

        let mut table: Vec<(f32, u32)> = Vec::with_capacity(n);
        let mut trees = Vec::with_capacity(params.m);
        for i in 0..params.m {
            table.clear();
            for j in 0..n {
                let key = dot(&a[i * dim..(i + 1) * dim], &data[j * dim..(j + 1) * dim]);
                table.push((key, j as u32));
            }
            table.sort_unstable_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

            trees.push(BTree::bulkload(
                &tree_path(index_dir, i),
                page_size,
                &table,
            )?);
        }

        Ok(Self { params, a, trees })
    }

    /// Reopens a persisted index. A malformed `para` or a damaged tree
    /// file surfaces as `CorruptedIndex`; nothing stays open on failure.
    pub fn load(index_dir: &Path) -> Result<Self> {
        let (params, a) = params::read_params(&index_dir.join(PARAM_FILE_NAME))?;

        let mut trees = Vec::with_capacity(params.m);
        for i in 0..params.m {
            trees.push(BTree::open(&tree_path(index_dir, i), params.page_size)?);
        }

        info!(
            m = params.m,
            l = params.l,
            n = params.n,
            d = params.dim,
            "loaded index"
        );
        Ok(Self { params, a, trees })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Projects `point` onto hash function `table`.
    pub(crate) fn hash_value(&self, table: usize, point: &[f32]) -> f32 {
        let dim = self.params.dim;
        dot(&self.a[table * dim..(table + 1) * dim], point)
    }

    /// Assembles an index from already-built parts. Test hook for
    /// exercising the search with handpicked parameters and projections.
    #[cfg(test)]
    pub(crate) fn from_parts(params: Params, a: Vec<f32>, trees: Vec<BTree>) -> Self {
        Self { params, a, trees }
    }
}

fn tree_path(index_dir: &Path, i: usize) -> PathBuf {
    index_dir.join(format!("{i}.{TREE_FILE_EXTENSION}"))
}

fn log_params(params: &Params, family: HashFamily) {
    info!(
        n = params.n,
        d = params.dim,
        B = params.page_size,
        ratio = params.ratio,
        w = params.w,
        p1 = params.p1,
        p2 = params.p2,
        p = params.p,
        alpha = params.alpha,
        beta = params.beta,
        delta = params.delta,
        zeta = params.zeta,
        m = params.m,
        l = params.l,
        ?family,
        "derived index parameters"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gaussian_cloud(n: usize, dim: usize, seed: u64) -> Vec<f32> {
        use rand::Rng;
        use rand_distr::StandardNormal;
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n * dim).map(|_| rng.sample(StandardNormal)).collect()
    }

    #[test]
    fn build_writes_para_and_tree_files() {
        let dir = tempdir().unwrap();
        let data = gaussian_cloud(200, 6, 5);

        let index =
            QalshIndex::build(&data, 6, 4096, 2.0, 0.0, 2.0, dir.path(), 99).unwrap();

        assert!(dir.path().join("para").exists());
        for i in 0..index.params().m {
            assert!(dir.path().join(format!("{i}.qalsh")).exists());
        }
    }

    #[test]
    fn rebuild_into_same_directory_is_refused() {
        let dir = tempdir().unwrap();
        let data = gaussian_cloud(100, 4, 6);

        QalshIndex::build(&data, 4, 4096, 2.0, 0.0, 2.0, dir.path(), 1).unwrap();
        let err =
            QalshIndex::build(&data, 4, 4096, 2.0, 0.0, 2.0, dir.path(), 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::IndexAlreadyExists { .. })
        ));
    }

    #[test]
    fn load_round_trips_params_and_matrix() {
        let dir = tempdir().unwrap();
        let data = gaussian_cloud(150, 4, 7);

        let built = QalshIndex::build(&data, 4, 4096, 1.0, 0.0, 2.0, dir.path(), 42).unwrap();
        let loaded = QalshIndex::load(dir.path()).unwrap();

        assert_eq!(loaded.params().m, built.params().m);
        assert_eq!(loaded.params().l, built.params().l);
        assert_eq!(loaded.params().n, 150);
        assert_eq!(loaded.a.len(), built.a.len());
        // coefficients survive the 6-decimal text round trip
        for (x, y) in loaded.a.iter().zip(built.a.iter()) {
            assert!((x - y).abs() <= 5e-7 * (1.0 + y.abs()));
        }
    }

    #[test]
    fn same_seed_rebuilds_identical_matrix() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        let data = gaussian_cloud(120, 5, 8);

        let a = QalshIndex::build(&data, 5, 4096, 2.0, 0.0, 2.0, dir_a.path(), 77).unwrap();
        let b = QalshIndex::build(&data, 5, 4096, 2.0, 0.0, 2.0, dir_b.path(), 77).unwrap();

        assert_eq!(a.a, b.a);
        assert_eq!(
            std::fs::read(dir_a.path().join("para")).unwrap(),
            std::fs::read(dir_b.path().join("para")).unwrap()
        );
    }

    #[test]
    fn load_missing_tree_file_fails_cleanly() {
        let dir = tempdir().unwrap();
        let data = gaussian_cloud(100, 4, 9);

        QalshIndex::build(&data, 4, 4096, 2.0, 0.0, 2.0, dir.path(), 3).unwrap();
        std::fs::remove_file(dir.path().join("0.qalsh")).unwrap();

        assert!(QalshIndex::load(dir.path()).is_err());
    }
}
