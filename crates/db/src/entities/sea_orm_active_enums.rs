//! Database enum types mapped to Postgres enums.
//!
//! The transaction and invoice enums have pure counterparts in `bolso-core`;
//! `From` impls bridge the two so repositories can feed rows straight into
//! the core folds.

use bolso_core::billing::InvoiceStatus as CoreInvoiceStatus;
use bolso_core::ledger::{
    TransactionKind as CoreTransactionKind, TransactionOrigin as CoreTransactionOrigin,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account type (checking, savings, wallet, investment).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_kind")]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Checking account.
    #[sea_orm(string_value = "checking")]
    Checking,
    /// Savings account.
    #[sea_orm(string_value = "savings")]
    Savings,
    /// Cash wallet.
    #[sea_orm(string_value = "wallet")]
    Wallet,
    /// Investment account.
    #[sea_orm(string_value = "investment")]
    Investment,
}

/// Category direction.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "category_kind")]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Income category.
    #[sea_orm(string_value = "income")]
    Income,
    /// Expense category.
    #[sea_orm(string_value = "expense")]
    Expense,
}

/// Transaction kind.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money in.
    #[sea_orm(string_value = "income")]
    Income,
    /// Money out.
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Movement between own accounts.
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

/// How a transaction entered the ledger.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_origin")]
#[serde(rename_all = "snake_case")]
pub enum TransactionOrigin {
    /// Entered directly by the user.
    #[sea_orm(string_value = "manual")]
    Manual,
    /// A purchase attached to a credit card invoice.
    #[sea_orm(string_value = "card_purchase")]
    CardPurchase,
    /// A payment (or companion liability) of an invoice.
    #[sea_orm(string_value = "invoice_settlement")]
    InvoiceSettlement,
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_status")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Still accumulating purchases.
    #[sea_orm(string_value = "open")]
    Open,
    /// Past its closing date, awaiting payment.
    #[sea_orm(string_value = "closed")]
    Closed,
    /// Fully paid.
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Past due date without full payment.
    #[sea_orm(string_value = "overdue")]
    Overdue,
}

impl From<CoreTransactionKind> for TransactionKind {
    fn from(kind: CoreTransactionKind) -> Self {
        match kind {
            CoreTransactionKind::Income => Self::Income,
            CoreTransactionKind::Expense => Self::Expense,
            CoreTransactionKind::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionKind> for CoreTransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => Self::Income,
            TransactionKind::Expense => Self::Expense,
            TransactionKind::Transfer => Self::Transfer,
        }
    }
}

impl From<CoreTransactionOrigin> for TransactionOrigin {
    fn from(origin: CoreTransactionOrigin) -> Self {
        match origin {
            CoreTransactionOrigin::Manual => Self::Manual,
            CoreTransactionOrigin::CardPurchase => Self::CardPurchase,
            CoreTransactionOrigin::InvoiceSettlement => Self::InvoiceSettlement,
        }
    }
}

impl From<TransactionOrigin> for CoreTransactionOrigin {
    fn from(origin: TransactionOrigin) -> Self {
        match origin {
            TransactionOrigin::Manual => Self::Manual,
            TransactionOrigin::CardPurchase => Self::CardPurchase,
            TransactionOrigin::InvoiceSettlement => Self::InvoiceSettlement,
        }
    }
}

impl From<CoreInvoiceStatus> for InvoiceStatus {
    fn from(status: CoreInvoiceStatus) -> Self {
        match status {
            CoreInvoiceStatus::Open => Self::Open,
            CoreInvoiceStatus::Closed => Self::Closed,
            CoreInvoiceStatus::Paid => Self::Paid,
            CoreInvoiceStatus::Overdue => Self::Overdue,
        }
    }
}

impl From<InvoiceStatus> for CoreInvoiceStatus {
    fn from(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Open => Self::Open,
            InvoiceStatus::Closed => Self::Closed,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Overdue => Self::Overdue,
        }
    }
}
