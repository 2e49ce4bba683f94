//! End-to-end index lifecycle tests: build, persist, reload, search.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tempfile::tempdir;

use qalsh::{DataStore, IndexError, MinKList, QalshIndex};

const PAGE: usize = 4096;

fn gaussian_cloud(n: usize, dim: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * dim).map(|_| rng.sample(StandardNormal)).collect()
}

fn run_queries(
    index: &QalshIndex,
    store: &DataStore,
    queries: &[f32],
    dim: usize,
    k: usize,
) -> Vec<(u64, Vec<(f32, Option<u32>)>)> {
    let mut out = Vec::new();
    let mut list = MinKList::new(k);
    for query in queries.chunks(dim) {
        list.reset();
        let io = index.knn(k, query, store, &mut list).unwrap();
        let rows = (0..k).map(|i| (list.ith_key(i), list.ith_id(i))).collect();
        out.push((io, rows));
    }
    out
}

#[test]
fn reloaded_index_answers_bit_identically() {
    let index_dir = tempdir().unwrap();
    let data_dir = tempdir().unwrap();
    let (n, dim, k) = (500, 8, 10);
    let data = gaussian_cloud(n, dim, 11);
    let queries = gaussian_cloud(20, dim, 12);

    QalshIndex::build(&data, dim, PAGE, 2.0, 0.0, 2.0, index_dir.path(), 1234).unwrap();
    let store = DataStore::create(data_dir.path(), &data, dim, PAGE).unwrap();

    let first = QalshIndex::load(index_dir.path()).unwrap();
    let second = QalshIndex::load(index_dir.path()).unwrap();

    let answers_a = run_queries(&first, &store, &queries, dim, k);
    let answers_b = run_queries(&second, &store, &queries, dim, k);
    assert_eq!(answers_a, answers_b);
}

#[test]
fn same_seed_same_data_builds_identical_indexes() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let data_dir = tempdir().unwrap();
    let (n, dim, k) = (400, 6, 5);
    let data = gaussian_cloud(n, dim, 21);
    let queries = gaussian_cloud(10, dim, 22);

    QalshIndex::build(&data, dim, PAGE, 1.0, 0.0, 2.0, dir_a.path(), 777).unwrap();
    QalshIndex::build(&data, dim, PAGE, 1.0, 0.0, 2.0, dir_b.path(), 777).unwrap();
    let store = DataStore::create(data_dir.path(), &data, dim, PAGE).unwrap();

    let loaded_a = QalshIndex::load(dir_a.path()).unwrap();
    let loaded_b = QalshIndex::load(dir_b.path()).unwrap();

    assert_eq!(
        run_queries(&loaded_a, &store, &queries, dim, k),
        run_queries(&loaded_b, &store, &queries, dim, k)
    );
}

#[test]
fn truncated_para_reports_corrupted_index() {
    let index_dir = tempdir().unwrap();
    let (n, dim) = (300, 5);
    let data = gaussian_cloud(n, dim, 31);

    QalshIndex::build(&data, dim, PAGE, 2.0, 0.0, 2.0, index_dir.path(), 5).unwrap();

    // cut the file off inside the hash matrix
    let para = index_dir.path().join("para");
    let text = std::fs::read_to_string(&para).unwrap();
    let keep: Vec<&str> = text.lines().take(16).collect();
    std::fs::write(&para, keep.join("\n")).unwrap();

    let err = QalshIndex::load(index_dir.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::CorruptedIndex { .. })
    ));
}

#[test]
fn monte_carlo_norm_builds_and_searches() {
    let index_dir = tempdir().unwrap();
    let data_dir = tempdir().unwrap();
    let (n, dim, k) = (200, 6, 5);
    let data = gaussian_cloud(n, dim, 41);

    let index = QalshIndex::build(&data, dim, PAGE, 1.3, 0.0, 2.0, index_dir.path(), 6).unwrap();
    let params = index.params();
    assert!(params.p1 > params.p2);
    assert!(params.m > 0 && params.l <= params.m);

    let store = DataStore::create(data_dir.path(), &data, dim, PAGE).unwrap();
    let mut list = MinKList::new(k);
    let query = data[17 * dim..18 * dim].to_vec();
    index.knn(k, &query, &store, &mut list).unwrap();

    // the query is an indexed point, so rank 1 is an exact hit
    assert_eq!(list.ith_key(0), 0.0);
    assert_eq!(list.ith_id(0), Some(17));
}

#[test]
fn levy_norm_round_trip() {
    let index_dir = tempdir().unwrap();
    let data_dir = tempdir().unwrap();
    let (n, dim, k) = (250, 4, 3);
    // positive data keeps fractional-norm distances well conditioned
    let data: Vec<f32> = gaussian_cloud(n, dim, 51).iter().map(|v| v.abs()).collect();

    QalshIndex::build(&data, dim, PAGE, 0.5, 1.0, 2.0, index_dir.path(), 7).unwrap();
    let index = QalshIndex::load(index_dir.path()).unwrap();
    let store = DataStore::create(data_dir.path(), &data, dim, PAGE).unwrap();

    let mut list = MinKList::new(k);
    let query = data[3 * dim..4 * dim].to_vec();
    index.knn(k, &query, &store, &mut list).unwrap();
    assert_eq!(list.ith_key(0), 0.0);
}
