//! The single error type for the tsdelta library.

use thiserror::Error;

use crate::types::DataType;

pub type Result<T> = std::result::Result<T, DeltaError>;

#[derive(Error, Debug)]
pub enum DeltaError {
    // ── Caller misuse ──────────────────────────────────────────────────────
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ── Corrupt or foreign data ────────────────────────────────────────────
    #[error("magic number mismatch: expected {expected:#010x}, found {found:#010x} (wrong codec used to decode, or corrupt frame)")]
    MagicMismatch { expected: i32, found: i32 },

    #[error("vector count mismatch: frame holds {found} vectors but {expected} were expected")]
    VectorCountMismatch { expected: usize, found: usize },

    #[error("truncated input while reading {context}: needed {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("data type mismatch: block holds {found:?} but {expected:?} was requested")]
    TypeMismatch { expected: DataType, found: DataType },

    // ── External collaborators ─────────────────────────────────────────────
    /// Raised by a finisher implementation while compressing or expanding a payload.
    #[error("finisher failed: {0}")]
    Finisher(#[from] anyhow::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
