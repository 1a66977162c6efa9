//! Billing error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by the billing rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// Payment amount must be strictly positive.
    #[error("payment amount must be positive")]
    NonPositiveAmount,

    /// Payment amount exceeds the invoice's remaining balance.
    #[error("payment of {amount} exceeds remaining balance {remaining}")]
    ExceedsRemaining {
        /// The requested payment amount.
        amount: Decimal,
        /// The invoice's remaining balance.
        remaining: Decimal,
    },

    /// A reference period outside the calendar (month not in 1..=12).
    #[error("invalid reference period {month}/{year}")]
    InvalidPeriod {
        /// Reference month.
        month: u32,
        /// Reference year.
        year: i32,
    },
}
