//! Core reconciliation logic for Bolso.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, derivation rules, and the reconciliation
//! folds that keep account balances, invoice totals, and card limits
//! consistent live here.
//!
//! # Modules
//!
//! - `ledger` - transaction domain types and the aggregate recomputation folds
//! - `billing` - invoice period resolution, invoice status transitions, payment checks
//! - `series` - recurring/installment intent expansion and slice selectors

pub mod billing;
pub mod ledger;
pub mod series;
