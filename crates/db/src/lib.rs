//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//!
//! All derived balances (account `current_balance`, invoice `total`, card
//! `used_limit`) are recomputed by the repositories inside the same database
//! transaction as the write that disturbed them, using the pure folds from
//! `bolso-core`.

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{InvoiceRepository, TransactionRepository};

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
