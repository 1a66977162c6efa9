//! Repository abstractions for data access.
//!
//! Repositories own the write paths. Every mutation that can disturb a
//! derived aggregate (account balance, invoice total, card utilized limit)
//! runs inside one database transaction together with the reconciliation
//! recompute, so readers never observe a half-applied state.

pub mod invoice;
pub mod reconcile;
pub mod transaction;

pub use invoice::{
    CreateInvoiceInput, InvoiceError, InvoiceFilter, InvoiceRepository, InvoiceWithPurchases,
    PayInvoiceInput, PaymentOutcome,
};
pub use transaction::{
    CreateTransactionInput, TransactionError, TransactionFilter, TransactionRepository,
    UpdateTransactionInput,
};
