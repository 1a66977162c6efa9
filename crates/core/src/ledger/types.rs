//! Ledger domain types shared by the reconciliation folds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction kind: the direction money moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
    /// Movement between accounts; does not change a single account's balance.
    Transfer,
}

/// How a transaction came to exist.
///
/// The origin decides which aggregates a row participates in:
/// card purchases only move invoice totals, settlements are the only
/// card-originated rows that touch an account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOrigin {
    /// Entered directly by the user.
    Manual,
    /// A credit-card charge, always linked to exactly one invoice.
    CardPurchase,
    /// Payment of an invoice, owned by the payment processor.
    InvoiceSettlement,
}

/// Minimal snapshot of a transaction row, as consumed by the folds.
///
/// The database layer maps its entity models into this shape so the folds
/// stay free of persistence types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingRow {
    /// Absolute amount (always positive).
    pub amount: Decimal,
    /// Income, expense, or transfer.
    pub kind: TransactionKind,
    /// Manual, card purchase, or invoice settlement.
    pub origin: TransactionOrigin,
    /// Whether the row has been settled.
    pub paid: bool,
}

/// Returns the signed contribution of an amount to an account balance.
///
/// Income adds, expense subtracts, transfer contributes nothing (a transfer
/// between two accounts of the same user nets to zero per account here).
#[must_use]
pub fn signed_amount(kind: TransactionKind, amount: Decimal) -> Decimal {
    match kind {
        TransactionKind::Income => amount,
        TransactionKind::Expense => -amount,
        TransactionKind::Transfer => Decimal::ZERO,
    }
}
