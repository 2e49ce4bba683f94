//! # Dataset and Ground-Truth Files
//!
//! Text-file plumbing around the index: whitespace-separated dataset and
//! query readers, and the ground-truth format the evaluation drivers
//! compare against.
//!
//! ## Dataset / Query Files
//!
//! One record per line: a leading record id followed by d values. The id
//! column is ignored in favor of line order, which is what assigns ids
//! everywhere else in the system.
//!
//! ```text
//! 0 0.12 -3.4 ...
//! 1 1.73  0.9 ...
//! ```
//!
//! ## Ground-Truth Files
//!
//! First line `qn maxk`, then one line per query: the 1-based query id
//! followed by the maxk exact distances in ascending order.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{bail, Result};

use crate::error::IndexError;

/// Reads `n` records of `d` values each, ignoring the leading id column.
pub fn read_set(path: &Path, n: usize, d: usize) -> Result<Vec<f32>> {
    let content = fs::read_to_string(path).map_err(|e| IndexError::IoFailure {
        path: path.to_path_buf(),
        detail: format!("open failed: {e}"),
    })?;

    let mut data = Vec::with_capacity(n * d);
    let mut lines = content.lines();
    for row in 0..n {
        let Some(line) = lines.next() else {
            bail!(
                "'{}' ends after {} of {} records",
                path.display(),
                row,
                n
            );
        };
        let mut tokens = line.split_whitespace();
        // leading record id, superseded by line order
        if tokens.next().is_none() {
            bail!("'{}' record {} is empty", path.display(), row);
        }
        let before = data.len();
        for tok in tokens.take(d) {
            let v: f32 = tok.parse().map_err(|_| {
                eyre::eyre!("'{}' record {}: bad value '{}'", path.display(), row, tok)
            })?;
            data.push(v);
        }
        if data.len() - before != d {
            bail!(
                "'{}' record {} has {} values, expected {}",
                path.display(),
                row,
                data.len() - before,
                d
            );
        }
    }
    Ok(data)
}

/// Writes a ground-truth file: `qn maxk` then one ascending distance row
/// per query. `dists` is a flat `qn * maxk` buffer.
pub fn write_ground_truth(path: &Path, qn: usize, maxk: usize, dists: &[f32]) -> Result<()> {
    debug_assert_eq!(dists.len(), qn * maxk);

    let file = fs::File::create(path).map_err(|e| IndexError::IoFailure {
        path: path.to_path_buf(),
        detail: format!("create failed: {e}"),
    })?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{} {}", qn, maxk)?;
    for (i, row) in dists.chunks(maxk).enumerate() {
        write!(out, "{}", i + 1)?;
        for v in row {
            write!(out, " {:.6}", v)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads a ground-truth file back as `(qn, maxk, distances)`.
pub fn read_ground_truth(path: &Path) -> Result<(usize, usize, Vec<f32>)> {
    let content = fs::read_to_string(path).map_err(|e| IndexError::IoFailure {
        path: path.to_path_buf(),
        detail: format!("open failed: {e}"),
    })?;
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| eyre::eyre!("'{}' is empty", path.display()))?;
    let mut tokens = header.split_whitespace();
    let qn: usize = parse_token(tokens.next(), path, "query count")?;
    let maxk: usize = parse_token(tokens.next(), path, "maxk")?;

    let mut dists = Vec::with_capacity(qn * maxk);
    for row in 0..qn {
        let Some(line) = lines.next() else {
            bail!("'{}' ends after {} of {} queries", path.display(), row, qn);
        };
        let mut tokens = line.split_whitespace();
        let _query_id: usize = parse_token(tokens.next(), path, "query id")?;
        let before = dists.len();
        for tok in tokens.take(maxk) {
            let v: f32 = tok
                .parse()
                .map_err(|_| eyre::eyre!("'{}' row {}: bad value '{}'", path.display(), row, tok))?;
            dists.push(v);
        }
        if dists.len() - before != maxk {
            bail!(
                "'{}' row {} has {} distances, expected {}",
                path.display(),
                row,
                dists.len() - before,
                maxk
            );
        }
    }
    Ok((qn, maxk, dists))
}

fn parse_token<T: std::str::FromStr>(tok: Option<&str>, path: &Path, what: &str) -> Result<T> {
    tok.and_then(|t| t.parse().ok())
        .ok_or_else(|| eyre::eyre!("'{}': missing or bad {}", path.display(), what))
}
