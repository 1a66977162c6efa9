//! Series error types.

use thiserror::Error;

/// Errors produced by series expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeriesError {
    /// An installment or recurring intent with a zero occurrence count.
    #[error("occurrence count must be at least 1")]
    ZeroOccurrences,

    /// Date arithmetic walked off the end of the supported calendar.
    #[error("schedule date out of range")]
    DateOutOfRange,
}
