//! # Typed Failure Kinds
//!
//! Most fallible paths in this crate report failures through `eyre::Result`
//! with contextual messages, following the storage layer conventions. The
//! kinds in this module exist for the cases a caller must distinguish
//! programmatically: a build refusing to clobber an existing index, a load
//! rejecting a damaged one, and the defensive checks on data-store reads.
//!
//! An [`IndexError`] travels inside the `eyre::Report`; callers that care
//! recover it with `report.downcast_ref::<IndexError>()`.

use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds that callers are expected to match on.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Unable to open or create a file, short read/write, or a page access
    /// out of range. Fatal to the enclosing top-level operation.
    #[error("i/o failure on '{path}': {detail}")]
    IoFailure { path: PathBuf, detail: String },

    /// A persisted structure does not parse back: malformed parameter file,
    /// tree file smaller than its header claims, inconsistent node levels,
    /// or a descent that finds no branch at a non-root node.
    #[error("corrupted index at '{path}': {detail}")]
    CorruptedIndex { path: PathBuf, detail: String },

    /// A build found a parameter file already in place and refused to
    /// overwrite it.
    #[error("index already exists at '{path}' (remove the directory to rebuild)")]
    IndexAlreadyExists { path: PathBuf },

    /// A vector of the wrong dimensionality reached the data store or the
    /// query interface.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A record id outside `[0, n)` reached the data store.
    #[error("record id {id} out of range (n={n})")]
    OutOfRangeId { id: u32, n: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_survive_an_eyre_report() {
        let report = eyre::Report::new(IndexError::DimensionMismatch {
            expected: 8,
            actual: 4,
        });

        let kind = report.downcast_ref::<IndexError>();
        assert!(matches!(
            kind,
            Some(IndexError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn display_includes_path() {
        let err = IndexError::IndexAlreadyExists {
            path: PathBuf::from("/tmp/idx"),
        };
        assert!(err.to_string().contains("/tmp/idx"));
    }
}
