//! Error kinds for the quadratic sieve core.
//!
//! Follows the split the teacher's binary uses at a coarser grain (`anyhow`
//! for ad-hoc glue, a structured enum at the library boundary): callers of
//! this crate match on [`QsError`] variants per spec §7, while internal
//! multi-step plumbing is free to bubble up `anyhow::Error` through
//! `QsError::Internal`.

use rug::Integer;
use thiserror::Error;

/// Snapshot of sieve progress, attached to [`QsError::Cancelled`] so a caller
/// that hit a timeout can judge whether to retry with a larger budget.
#[derive(Debug, Clone, Default)]
pub struct PartialProgress {
    pub relations_found: usize,
    pub relations_needed: usize,
    pub windows_sieved: u64,
    pub candidates_tested: u64,
}

#[derive(Debug, Error)]
pub enum QsError {
    /// `n <= 1` passed to `find_divisor`, `n` even handed to an odd-modulus
    /// reducer, or similar contract-adjacent but caller-recoverable misuse.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The null-space search over the current relation set produced no
    /// usable (non-trivial) factor. Recoverable: re-enter the sieve loop
    /// with a larger interval budget or factor base.
    #[error("insufficient relations to extract a factor ({0:?})")]
    InsufficientRelations(PartialProgress),

    /// A 64-bit arithmetic path detected an overflow that should be
    /// impossible given correctly-sized inputs. Always a contract
    /// violation in a misconfigured caller or a bug in this crate, never a
    /// recoverable user-facing condition.
    #[error("numeric overflow in 64-bit path: {0}")]
    NumericOverflow(String),

    /// Sieve was cancelled (caller-requested or wall-clock budget):
    /// propagates to the caller with whatever partial factorization state
    /// existed at cancellation time.
    #[error("sieve cancelled after {0:?}")]
    Cancelled(PartialProgress),

    /// Catch-all for internal plumbing errors (e.g. GMP conversion
    /// failures) that don't fit a more specific variant.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QsError>;

impl QsError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        QsError::InvalidInput(msg.into())
    }
}

/// Precondition check shared by `find_divisor` and the QS entry point.
pub fn require_composite_input(n: &Integer) -> Result<()> {
    if *n <= 1 {
        return Err(QsError::invalid(format!(
            "find_divisor requires n > 1, got {n}"
        )));
    }
    Ok(())
}
