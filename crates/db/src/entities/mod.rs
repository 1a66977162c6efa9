//! `SeaORM` entity definitions.

pub mod accounts;
pub mod categories;
pub mod category_groups;
pub mod credit_cards;
pub mod invoices;
pub mod sea_orm_active_enums;
pub mod series;
pub mod transactions;
pub mod users;
