//! Transaction domain types and aggregate recomputation.
//!
//! Three derived aggregates are never incremented in place; they are always
//! recomputed in full from the underlying transaction rows:
//!
//! - account current balance ([`balance::account_balance`])
//! - invoice total ([`balance::invoice_total`])
//! - card utilized limit ([`balance::card_used_limit`])
//!
//! Full recomputation is self-healing against drift and idempotent, which is
//! what allows callers to re-run it after every mutation.

pub mod balance;
pub mod types;

pub use balance::{account_balance, card_used_limit, invoice_total};
pub use types::{PostingRow, TransactionKind, TransactionOrigin, signed_amount};
