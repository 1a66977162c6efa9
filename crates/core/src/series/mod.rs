//! Series expansion and slice selection.
//!
//! One user-submitted intent can stand for many concrete transactions: a
//! fixed installment set or an open-ended recurring schedule. The expander
//! turns the intent into occurrence specs; the scope selector addresses a
//! series as a whole, a head, a tail, or a single entry by ordinal.

pub mod error;
pub mod expander;
pub mod schedule;
pub mod scope;

pub use error::SeriesError;
pub use expander::{
    DEFAULT_RECURRING_OCCURRENCES, OccurrenceSpec, Recurrence, TransactionIntent, expand,
};
pub use schedule::months_ahead;
pub use scope::SeriesScope;
