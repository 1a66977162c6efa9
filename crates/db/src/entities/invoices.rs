//! `SeaORM` Entity for invoices table.
//!
//! One row per card per billing period, enforced by a unique index on
//! `(card_id, reference_month, reference_year)`. `total` is the sum of the
//! linked card purchases; `settlement_transaction_id` points at the invoice's
//! companion liability (or its most recent payment).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::InvoiceStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub card_id: Uuid,
    pub reference_month: i16,
    pub reference_year: i32,
    pub closing_date: Date,
    pub due_date: Date,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub status: InvoiceStatus,
    pub account_id: Option<Uuid>,
    pub settlement_transaction_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::credit_cards::Entity",
        from = "Column::CardId",
        to = "super::credit_cards::Column::Id"
    )]
    CreditCards,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::credit_cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditCards.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
