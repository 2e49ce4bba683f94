//! # qalsh CLI Entry Point
//!
//! Binary front end for the four drivers. The `-alg` switch selects the
//! operation; the remaining flags name the inputs it needs.
//!
//! ## Usage
//!
//! ```bash
//! # exact ground truth
//! qalsh -alg 0 -n 60000 -qn 100 -d 128 -p 2.0 \
//!       -ds data.txt -qs query.txt -ts truth.txt
//!
//! # build the index and the paged data store
//! qalsh -alg 1 -n 60000 -d 128 -B 4096 -p 2.0 -zeta 0.0 -ratio 2.0 \
//!       -ds data.txt -df ./data -of ./out
//!
//! # c-k-ANN search
//! qalsh -alg 2 -qn 100 -d 128 -qs query.txt -ts truth.txt -df ./data -of ./out
//!
//! # disk-based linear scan
//! qalsh -alg 3 -n 60000 -qn 100 -d 128 -B 4096 -p 2.0 \
//!       -qs query.txt -ts truth.txt -df ./data -of ./out
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use eyre::{bail, ensure, Result};

use qalsh::cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct Options {
    alg: Option<u32>,
    n: usize,
    qn: usize,
    d: usize,
    page_size: usize,
    p: f32,
    zeta: f32,
    ratio: f32,
    seed: u64,
    data_set: Option<PathBuf>,
    query_set: Option<PathBuf>,
    truth_set: Option<PathBuf>,
    data_folder: Option<PathBuf>,
    output_folder: Option<PathBuf>,
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let mut opts = Options {
        page_size: 4096,
        p: 2.0,
        ratio: 2.0,
        ..Options::default()
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("qalsh {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "-alg" => opts.alg = Some(value(&args, &mut i)?),
            "-n" => opts.n = value(&args, &mut i)?,
            "-qn" => opts.qn = value(&args, &mut i)?,
            "-d" => opts.d = value(&args, &mut i)?,
            "-B" => opts.page_size = value(&args, &mut i)?,
            "-p" => opts.p = value(&args, &mut i)?,
            "-zeta" => opts.zeta = value(&args, &mut i)?,
            "-ratio" => opts.ratio = value(&args, &mut i)?,
            "-seed" => opts.seed = value(&args, &mut i)?,
            "-ds" => opts.data_set = Some(value(&args, &mut i)?),
            "-qs" => opts.query_set = Some(value(&args, &mut i)?),
            "-ts" => opts.truth_set = Some(value(&args, &mut i)?),
            "-df" => opts.data_folder = Some(value(&args, &mut i)?),
            "-of" => opts.output_folder = Some(value(&args, &mut i)?),
            other => bail!("unknown option: {other}"),
        }
        i += 1;
    }

    let Some(alg) = opts.alg else {
        print_usage();
        bail!("missing -alg");
    };

    match alg {
        0 => {
            ensure!(opts.n > 0 && opts.qn > 0 && opts.d > 0, "-alg 0 needs -n, -qn, -d");
            cli::ground_truth(
                opts.n,
                opts.qn,
                opts.d,
                opts.p,
                &required(&opts.data_set, "-ds")?,
                &required(&opts.query_set, "-qs")?,
                &required(&opts.truth_set, "-ts")?,
            )
        }
        1 => {
            ensure!(opts.n > 0 && opts.d > 0, "-alg 1 needs -n and -d");
            cli::indexing(
                opts.n,
                opts.d,
                opts.page_size,
                opts.p,
                opts.zeta,
                opts.ratio,
                opts.seed,
                &required(&opts.data_set, "-ds")?,
                &required(&opts.data_folder, "-df")?,
                &required(&opts.output_folder, "-of")?,
            )
        }
        2 => {
            ensure!(opts.qn > 0 && opts.d > 0, "-alg 2 needs -qn and -d");
            cli::lshknn(
                opts.qn,
                opts.d,
                &required(&opts.query_set, "-qs")?,
                &required(&opts.truth_set, "-ts")?,
                &required(&opts.data_folder, "-df")?,
                &required(&opts.output_folder, "-of")?,
            )
        }
        3 => {
            ensure!(
                opts.n > 0 && opts.qn > 0 && opts.d > 0,
                "-alg 3 needs -n, -qn, -d"
            );
            cli::linear_scan(
                opts.n,
                opts.qn,
                opts.d,
                opts.page_size,
                opts.p,
                &required(&opts.query_set, "-qs")?,
                &required(&opts.truth_set, "-ts")?,
                &required(&opts.data_folder, "-df")?,
                &required(&opts.output_folder, "-of")?,
            )
        }
        other => bail!("unknown algorithm {other} (expected 0..=3)"),
    }
}

fn value<T: std::str::FromStr>(args: &[String], i: &mut usize) -> Result<T> {
    let flag = &args[*i];
    *i += 1;
    let Some(raw) = args.get(*i) else {
        bail!("{flag} expects a value");
    };
    raw.parse()
        .map_err(|_| eyre::eyre!("bad value for {flag}: '{raw}'"))
}

fn required(opt: &Option<PathBuf>, flag: &str) -> Result<PathBuf> {
    opt.clone().ok_or_else(|| eyre::eyre!("missing {flag}"))
}

fn print_usage() {
    println!("Usage: qalsh -alg <0|1|2|3> [options]");
    println!();
    println!("Algorithms:");
    println!("  0  ground truth     (-n -qn -d -p -ds -qs -ts)");
    println!("  1  indexing         (-n -d -B -p -zeta -ratio [-seed] -ds -df -of)");
    println!("  2  c-k-ANN search   (-qn -d -qs -ts -df -of)");
    println!("  3  linear scan      (-n -qn -d -B -p -qs -ts -df -of)");
    println!();
    println!("Options:");
    println!("  -n      <int>    cardinality of the dataset");
    println!("  -qn     <int>    number of queries");
    println!("  -d      <int>    dimensionality");
    println!("  -B      <int>    page size in bytes (default 4096)");
    println!("  -p      <float>  the p of the L_p norm, in (0, 2] (default 2.0)");
    println!("  -zeta   <float>  skewness of the p-stable family, in [-1, 1]");
    println!("  -ratio  <float>  approximation ratio c > 1 (default 2.0)");
    println!("  -seed   <int>    RNG seed for reproducible builds (default 0)");
    println!("  -ds     <path>   dataset file");
    println!("  -qs     <path>   query file");
    println!("  -ts     <path>   ground-truth file");
    println!("  -df     <path>   data folder (paged vectors)");
    println!("  -of     <path>   output folder (index + reports)");
}
