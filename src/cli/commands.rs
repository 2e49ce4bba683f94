//! # Driver Commands
//!
//! The four top-level operations the binary dispatches to: exact
//! ground-truth generation, index construction, indexed search, and the
//! disk-based linear-scan baseline. The two search drivers share the same
//! evaluation loop: for each k in the round table, run every query,
//! average the overall ratio against the ground truth, and append a
//! tab-separated row to the output file while mirroring it on stdout.
//!
//! The overall ratio of one query is the mean of `got_i / true_i` over
//! the k ranks, with an exact hit on a zero-distance truth counting as 1.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use eyre::{ensure, Result, WrapErr};
use tracing::info;

use crate::config::{MAX_K, TOP_K_ROUNDS};
use crate::dataset::{read_ground_truth, read_set, write_ground_truth};
use crate::distance::lp_dist;
use crate::error::IndexError;
use crate::qalsh::{MinKList, QalshIndex};
use crate::storage::DataStore;

/// `-alg 0`: exact k-NN by in-memory linear scan, persisted as the
/// ground-truth file.
pub fn ground_truth(
    n: usize,
    qn: usize,
    d: usize,
    p: f32,
    data_set: &Path,
    query_set: &Path,
    truth_set: &Path,
) -> Result<()> {
    let started = Instant::now();
    let data = read_set(data_set, n, d)?;
    let queries = read_set(query_set, qn, d)?;
    info!(elapsed = ?started.elapsed(), "read dataset and query set");

    let started = Instant::now();
    let mut dists = Vec::with_capacity(qn * MAX_K);
    let mut list = MinKList::new(MAX_K);
    for query in queries.chunks(d) {
        list.reset();
        for (j, point) in data.chunks(d).enumerate() {
            list.insert(lp_dist(p, point, query), j as u32);
        }
        for i in 0..MAX_K {
            dists.push(list.ith_key(i));
        }
    }
    write_ground_truth(truth_set, qn, MAX_K, &dists)?;
    info!(elapsed = ?started.elapsed(), queries = qn, "ground truth written");

    Ok(())
}

/// `-alg 1`: re-emit the dataset into the paged data store and build the
/// index.
#[allow(clippy::too_many_arguments)]
pub fn indexing(
    n: usize,
    d: usize,
    page_size: usize,
    p: f32,
    zeta: f32,
    ratio: f32,
    seed: u64,
    data_set: &Path,
    data_folder: &Path,
    output_folder: &Path,
) -> Result<()> {
    let started = Instant::now();
    let data = read_set(data_set, n, d)?;
    info!(elapsed = ?started.elapsed(), "read dataset");

    let started = Instant::now();
    DataStore::create(data_folder, &data, d, page_size)?;
    info!(elapsed = ?started.elapsed(), "dataset re-emitted in paged format");

    let started = Instant::now();
    fs::create_dir_all(output_folder).map_err(|e| IndexError::IoFailure {
        path: output_folder.to_path_buf(),
        detail: format!("failed to create output folder: {e}"),
    })?;
    QalshIndex::build(
        &data,
        d,
        page_size,
        p,
        zeta,
        ratio,
        &output_folder.join("qalsh"),
        seed,
    )?;
    let indexing_time = started.elapsed().as_secs_f32();
    info!(seconds = indexing_time, "index built");

    let mut out = fs::File::create(output_folder.join("qalsh.index"))
        .map(BufWriter::new)
        .wrap_err("failed to create the indexing-time file")?;
    writeln!(out, "Indexing Time: {:.6} seconds", indexing_time)?;

    Ok(())
}

/// `-alg 2`: c-k-ANN search over a previously built index, evaluated
/// against the ground truth for every k in the round table.
pub fn lshknn(
    qn: usize,
    d: usize,
    query_set: &Path,
    truth_set: &Path,
    data_folder: &Path,
    output_folder: &Path,
) -> Result<()> {
    let queries = read_set(query_set, qn, d)?;
    let (truth_qn, maxk, truth) = read_ground_truth(truth_set)?;
    ensure!(
        truth_qn >= qn && maxk >= *TOP_K_ROUNDS.last().unwrap(),
        "ground truth covers {truth_qn} queries to depth {maxk}, need {qn} to depth {}",
        TOP_K_ROUNDS.last().unwrap()
    );

    let index = QalshIndex::load(&output_folder.join("qalsh"))?;
    let params = index.params();
    ensure!(
        params.dim == d,
        "index dimension {} does not match -d {}",
        params.dim,
        d
    );
    let store = DataStore::open(data_folder, params.n as u32, d, params.page_size)?;

    let file = fs::File::create(output_folder.join("qalsh.out"))
        .wrap_err("failed to create the search output file")?;
    let mut out = BufWriter::new(file);

    println!("c-k-ANN search by QALSH:");
    println!("  Top-k\t\tRatio\t\tI/O\t\tTime (ms)");
    for &top_k in TOP_K_ROUNDS.iter() {
        let started = Instant::now();
        let mut overall_ratio = 0.0f64;
        let mut io_cost: u64 = 0;

        let mut list = MinKList::new(top_k);
        for (qi, query) in queries.chunks(d).enumerate() {
            list.reset();
            io_cost += index.knn(top_k, query, &store, &mut list)?;
            overall_ratio += query_ratio(&list, &truth[qi * maxk..], top_k);
        }

        let avg_ratio = overall_ratio / qn as f64;
        let avg_io = (io_cost as f64 / qn as f64).ceil() as u64;
        let avg_ms = started.elapsed().as_secs_f64() * 1000.0 / qn as f64;

        println!("  {top_k:3}\t\t{avg_ratio:.4}\t\t{avg_io}\t\t{avg_ms:.2}");
        writeln!(out, "{top_k}\t{avg_ratio:.6}\t{avg_io}\t{avg_ms:.6}")?;
    }
    out.flush()?;

    Ok(())
}

/// `-alg 3`: brute-force scan over the paged data store, reported in the
/// same format as the indexed search.
#[allow(clippy::too_many_arguments)]
pub fn linear_scan(
    n: usize,
    qn: usize,
    d: usize,
    page_size: usize,
    p: f32,
    query_set: &Path,
    truth_set: &Path,
    data_folder: &Path,
    output_folder: &Path,
) -> Result<()> {
    let queries = read_set(query_set, qn, d)?;
    let (truth_qn, maxk, truth) = read_ground_truth(truth_set)?;
    ensure!(
        truth_qn >= qn,
        "ground truth covers {truth_qn} queries, need {qn}"
    );

    let store = DataStore::open(data_folder, n as u32, d, page_size)?;
    store.prefetch_all();

    fs::create_dir_all(output_folder).map_err(|e| IndexError::IoFailure {
        path: output_folder.to_path_buf(),
        detail: format!("failed to create output folder: {e}"),
    })?;
    let file = fs::File::create(output_folder.join("linear.out"))
        .wrap_err("failed to create the linear-scan output file")?;
    let mut out = BufWriter::new(file);

    println!("Linear-scan search:");
    println!("  Top-k\t\tRatio\t\tI/O\t\tTime (ms)");
    for &top_k in TOP_K_ROUNDS.iter() {
        let started = Instant::now();
        let mut overall_ratio = 0.0f64;
        let mut io_cost: u64 = 0;

        let mut list = MinKList::new(top_k);
        for (qi, query) in queries.chunks(d).enumerate() {
            list.reset();
            io_cost += linear(&store, p, query, &mut list)?;
            overall_ratio += query_ratio(&list, &truth[qi * maxk..], top_k);
        }

        let avg_ratio = overall_ratio / qn as f64;
        let avg_io = (io_cost as f64 / qn as f64).ceil() as u64;
        let avg_ms = started.elapsed().as_secs_f64() * 1000.0 / qn as f64;

        println!("  {top_k:3}\t\t{avg_ratio:.4}\t\t{avg_io}\t\t{avg_ms:.2}");
        writeln!(out, "{top_k}\t{avg_ratio:.6}\t{avg_io}\t{avg_ms:.6}")?;
    }
    out.flush()?;

    Ok(())
}

/// One sequential pass over the data-store pages; the cost is one I/O per
/// page regardless of how many records a page holds.
fn linear(store: &DataStore, p: f32, query: &[f32], list: &mut MinKList) -> Result<u64> {
    let per_page = store.records_per_page();
    let n = store.count() as usize;
    let mut buf = vec![0.0f32; store.dim()];

    for page_no in 0..store.page_count() {
        let page = store.page(page_no)?;
        let base = page_no as usize * per_page;
        for slot in 0..per_page {
            let id = base + slot;
            if id >= n {
                break;
            }
            store.decode_slot(page, slot, &mut buf);
            list.insert(lp_dist(p, &buf, query), id as u32);
        }
    }
    Ok(store.page_count() as u64)
}

/// Mean of per-rank ratios for one query; 0/0 counts as an exact hit.
fn query_ratio(list: &MinKList, truth_row: &[f32], top_k: usize) -> f64 {
    let mut sum = 0.0f64;
    for i in 0..top_k {
        let got = list.ith_key(i);
        let want = truth_row[i];
        sum += if want == 0.0 && got == 0.0 {
            1.0
        } else {
            (got / want) as f64
        };
    }
    sum / top_k as f64
}
