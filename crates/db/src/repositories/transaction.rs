//! Transaction repository for ledger transaction database operations.
//!
//! Owns the transaction lifecycle: intent expansion into occurrences,
//! invoice resolution for card purchases, series-scoped updates and deletes,
//! settlement guards, and the aggregate reconciliation that follows every
//! mutation.

use std::collections::BTreeSet;

use bolso_core::billing::InvoiceStatus;
use bolso_core::ledger::TransactionKind as CoreTransactionKind;
use bolso_core::series::{Recurrence, SeriesError, SeriesScope, TransactionIntent, expand};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    credit_cards, invoices,
    sea_orm_active_enums::TransactionOrigin,
    series, transactions,
};
use crate::repositories::invoice::{
    InvoiceError, ensure_owned_account, find_owned_card, resolve_or_create,
};
use crate::repositories::reconcile::{reconcile_account, reconcile_card, reconcile_invoice};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction not found (or not owned by the requesting user).
    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    /// Amount must be strictly positive.
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Description must not be empty.
    #[error("Description must not be empty")]
    EmptyDescription,

    /// Settlement rows are managed through their invoice.
    #[error("Invoice settlements cannot be edited directly; use the invoice payment endpoints")]
    SettlementManaged,

    /// Series expansion failed.
    #[error(transparent)]
    Series(#[from] SeriesError),

    /// Invoice resolution or ownership check failed.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a transaction intent.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Owning user.
    pub user_id: Uuid,
    /// Description.
    pub description: String,
    /// Amount (strictly positive).
    pub amount: Decimal,
    /// Income, expense, or transfer.
    pub kind: CoreTransactionKind,
    /// Accrual date of the first occurrence.
    pub accrual_date: NaiveDate,
    /// Settlement date of the first occurrence, if any.
    pub settlement_date: Option<NaiveDate>,
    /// Whether the first occurrence is already settled.
    pub paid: bool,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Account the money moves through.
    pub account_id: Option<Uuid>,
    /// Category.
    pub category_id: Option<Uuid>,
    /// Credit card; forces card-purchase origin and invoice resolution.
    pub card_id: Option<Uuid>,
    /// Single, installments, or recurring.
    pub recurrence: Recurrence,
}

/// Input for updating a transaction (and optionally its series slice).
///
/// Outer `None` means "leave unchanged"; the nested options clear a value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    /// New description.
    pub description: Option<String>,
    /// New amount (strictly positive).
    pub amount: Option<Decimal>,
    /// New kind.
    pub kind: Option<CoreTransactionKind>,
    /// New accrual date; card purchases re-resolve their invoice.
    pub accrual_date: Option<NaiveDate>,
    /// New settlement date.
    pub settlement_date: Option<Option<NaiveDate>>,
    /// New paid flag.
    pub paid: Option<bool>,
    /// New notes.
    pub notes: Option<Option<String>>,
    /// New account.
    pub account_id: Option<Option<Uuid>>,
    /// New category.
    pub category_id: Option<Option<Uuid>>,
}

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by kind.
    pub kind: Option<CoreTransactionKind>,
    /// Filter by settled state.
    pub paid: Option<bool>,
    /// Filter by accrual date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by accrual date range end.
    pub date_to: Option<NaiveDate>,
    /// Filter by account.
    pub account_id: Option<Uuid>,
    /// Filter by category.
    pub category_id: Option<Uuid>,
}

/// Transaction repository for lifecycle operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a transaction intent, expanding it into one or more rows.
    ///
    /// Card purchases are resolved onto their billing invoice per occurrence;
    /// recurring intents get a series row before the batch is inserted. The
    /// affected account, invoices, and cards are reconciled before commit.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails, a referenced account or card is
    /// not owned by the user, or a database operation fails.
    pub async fn create(
        &self,
        input: CreateTransactionInput,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        if input.amount <= Decimal::ZERO {
            return Err(TransactionError::InvalidAmount);
        }
        if input.description.trim().is_empty() {
            return Err(TransactionError::EmptyDescription);
        }
        if let Some(account_id) = input.account_id {
            ensure_owned_account(&self.db, input.user_id, account_id).await?;
        }
        let card = match input.card_id {
            Some(card_id) => Some(find_owned_card(&self.db, input.user_id, card_id).await?),
            None => None,
        };

        let intent = TransactionIntent {
            description: input.description.clone(),
            amount: input.amount,
            kind: input.kind,
            accrual_date: input.accrual_date,
            settlement_date: input.settlement_date,
            paid: input.paid,
            recurrence: input.recurrence,
        };
        let specs = expand(&intent)?;

        let txn = self.db.begin().await?;
        let now = Utc::now().into();

        let series_id = if matches!(input.recurrence, Recurrence::Recurring { .. }) {
            let row = series::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(input.user_id),
                description: Set(input.description.clone()),
                kind: Set(input.kind.into()),
                start_date: Set(input.accrual_date),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            Some(row.id)
        } else {
            None
        };

        let mut inserted = Vec::with_capacity(specs.len());
        let mut touched_invoices = BTreeSet::new();

        for spec in &specs {
            let (origin, invoice_id) = match &card {
                Some(card) => {
                    // Each occurrence lands on the invoice its own accrual
                    // date resolves to.
                    let invoice = resolve_or_create(&txn, card, spec.accrual_date).await?;
                    touched_invoices.insert(invoice.id);
                    (TransactionOrigin::CardPurchase, Some(invoice.id))
                }
                None => (TransactionOrigin::Manual, None),
            };

            let row = transactions::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(input.user_id),
                description: Set(spec.description.clone()),
                amount: Set(spec.amount),
                kind: Set(input.kind.into()),
                origin: Set(origin),
                accrual_date: Set(spec.accrual_date),
                settlement_date: Set(spec.settlement_date),
                paid: Set(spec.paid),
                notes: Set(input.notes.clone()),
                account_id: Set(input.account_id),
                category_id: Set(input.category_id),
                invoice_id: Set(invoice_id),
                series_id: Set(series_id),
                series_ordinal: Set(spec.series_ordinal.map(ordinal_column)),
                installment_number: Set(spec.installment.map(|(n, _)| ordinal_column(n))),
                installment_total: Set(spec.installment.map(|(_, t)| ordinal_column(t))),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            inserted.push(row);
        }

        if let Some(account_id) = input.account_id {
            reconcile_account(&txn, account_id).await?;
        }
        let mut touched_cards = BTreeSet::new();
        for invoice_id in touched_invoices {
            if let Some(outcome) = reconcile_invoice(&txn, invoice_id).await? {
                touched_cards.insert(outcome.card_id);
            }
        }
        for card_id in touched_cards {
            reconcile_card(&txn, card_id).await?;
        }

        txn.commit().await?;

        tracing::info!(
            user_id = %input.user_id,
            occurrences = inserted.len(),
            "transaction intent recorded"
        );

        Ok(inserted)
    }

    /// Lists transactions with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));

        if let Some(kind) = filter.kind {
            query = query.filter(
                transactions::Column::Kind
                    .eq(crate::entities::sea_orm_active_enums::TransactionKind::from(kind)),
            );
        }
        if let Some(paid) = filter.paid {
            query = query.filter(transactions::Column::Paid.eq(paid));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::AccrualDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::AccrualDate.lte(date_to));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(transactions::Column::CategoryId.eq(category_id));
        }

        let rows = query
            .order_by_desc(transactions::Column::AccrualDate)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows)
    }

    /// Gets a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::NotFound`] if the row does not exist or
    /// belongs to another user.
    pub async fn get(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        self.find_owned(user_id, transaction_id).await
    }

    /// Updates a transaction, optionally fanning out over its series slice.
    ///
    /// Card purchases whose accrual date changes are re-resolved onto the
    /// invoice matching the new date; both the old and new invoices are
    /// reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::SettlementManaged`] for settlement rows,
    /// and the usual validation/ownership errors otherwise.
    pub async fn update(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        scope: SeriesScope,
        input: UpdateTransactionInput,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        let anchor = self.find_owned(user_id, transaction_id).await?;
        if anchor.origin == TransactionOrigin::InvoiceSettlement {
            return Err(TransactionError::SettlementManaged);
        }
        if let Some(amount) = input.amount {
            if amount <= Decimal::ZERO {
                return Err(TransactionError::InvalidAmount);
            }
        }
        if let Some(description) = &input.description {
            if description.trim().is_empty() {
                return Err(TransactionError::EmptyDescription);
            }
        }
        if let Some(Some(account_id)) = input.account_id {
            ensure_owned_account(&self.db, user_id, account_id).await?;
        }

        let txn = self.db.begin().await?;
        let members = selected_members(&txn, &anchor, scope).await?;

        let mut touched_accounts = BTreeSet::new();
        let mut touched_invoices = BTreeSet::new();
        let mut updated = Vec::with_capacity(members.len());

        for member in members {
            if let Some(account_id) = member.account_id {
                touched_accounts.insert(account_id);
            }
            if let Some(invoice_id) = member.invoice_id {
                touched_invoices.insert(invoice_id);
            }

            let accrual_changed = input
                .accrual_date
                .is_some_and(|date| date != member.accrual_date);
            let is_card_purchase = member.origin == TransactionOrigin::CardPurchase;
            let old_invoice_id = member.invoice_id;

            let mut active = member.into_active_model();
            if let Some(description) = &input.description {
                active.description = Set(description.clone());
            }
            if let Some(amount) = input.amount {
                active.amount = Set(amount);
            }
            if let Some(kind) = input.kind {
                active.kind = Set(kind.into());
            }
            if let Some(accrual_date) = input.accrual_date {
                active.accrual_date = Set(accrual_date);
            }
            if let Some(settlement_date) = input.settlement_date {
                active.settlement_date = Set(settlement_date);
            }
            if let Some(paid) = input.paid {
                active.paid = Set(paid);
            }
            if let Some(notes) = &input.notes {
                active.notes = Set(notes.clone());
            }
            if let Some(account_id) = input.account_id {
                active.account_id = Set(account_id);
                if let Some(account_id) = account_id {
                    touched_accounts.insert(account_id);
                }
            }
            if let Some(category_id) = input.category_id {
                active.category_id = Set(category_id);
            }

            // Accrual date moved: the purchase may now belong to a different
            // billing period.
            if is_card_purchase && accrual_changed {
                if let (Some(date), Some(old_invoice_id)) = (input.accrual_date, old_invoice_id) {
                    if let Some(card) = card_of_invoice(&txn, old_invoice_id).await? {
                        let invoice = resolve_or_create(&txn, &card, date).await?;
                        touched_invoices.insert(invoice.id);
                        active.invoice_id = Set(Some(invoice.id));
                    }
                }
            }

            active.updated_at = Set(Utc::now().into());
            updated.push(active.update(&txn).await?);
        }

        reconcile_all(&txn, touched_accounts, touched_invoices, BTreeSet::new()).await?;
        txn.commit().await?;

        Ok(updated)
    }

    /// Deletes a transaction, optionally fanning out over its series slice.
    ///
    /// Deleting a settled invoice payment reverses its contribution to the
    /// invoice's `amount_paid` and re-occupies the card limit it had freed.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::NotFound`] if the row does not exist or
    /// belongs to another user.
    pub async fn delete(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        scope: SeriesScope,
    ) -> Result<usize, TransactionError> {
        let anchor = self.find_owned(user_id, transaction_id).await?;

        let txn = self.db.begin().await?;
        // Settlements never belong to a series; delete exactly the anchor.
        let members = if anchor.origin == TransactionOrigin::InvoiceSettlement {
            vec![anchor]
        } else {
            selected_members(&txn, &anchor, scope).await?
        };

        let mut touched_accounts = BTreeSet::new();
        let mut touched_invoices = BTreeSet::new();
        let mut touched_cards = BTreeSet::new();

        for member in &members {
            if member.origin == TransactionOrigin::InvoiceSettlement && member.paid {
                if let Some(invoice_id) = member.invoice_id {
                    reverse_settlement(&txn, invoice_id, member.amount, &mut touched_cards)
                        .await?;
                }
            }
            if let Some(account_id) = member.account_id {
                touched_accounts.insert(account_id);
            }
            if let Some(invoice_id) = member.invoice_id {
                touched_invoices.insert(invoice_id);
            }
            transactions::Entity::delete_by_id(member.id).exec(&txn).await?;
        }

        let deleted = members.len();
        reconcile_all(&txn, touched_accounts, touched_invoices, touched_cards).await?;
        txn.commit().await?;

        Ok(deleted)
    }

    /// Flips a transaction's paid flag.
    ///
    /// Toggling an invoice settlement also moves the invoice's `amount_paid`
    /// and status, and re-reconciles the card limit.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError::NotFound`] if the row does not exist or
    /// belongs to another user.
    pub async fn toggle_paid(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        let anchor = self.find_owned(user_id, transaction_id).await?;
        let new_paid = !anchor.paid;

        let txn = self.db.begin().await?;

        let mut active = anchor.clone().into_active_model();
        active.paid = Set(new_paid);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        if anchor.origin == TransactionOrigin::InvoiceSettlement {
            if let Some(invoice_id) = anchor.invoice_id {
                let invoice = invoices::Entity::find_by_id(invoice_id)
                    .lock_exclusive()
                    .one(&txn)
                    .await?;
                if let Some(invoice) = invoice {
                    let amount_paid = if new_paid {
                        invoice.amount_paid + anchor.amount
                    } else {
                        (invoice.amount_paid - anchor.amount).max(Decimal::ZERO)
                    };
                    let card_id = invoice.card_id;
                    let mut active = invoice.into_active_model();
                    active.amount_paid = Set(amount_paid);
                    active.status = Set(InvoiceStatus::after_settlement_toggle(new_paid).into());
                    active.updated_at = Set(Utc::now().into());
                    active.update(&txn).await?;
                    reconcile_card(&txn, card_id).await?;
                }
            }
        }

        if let Some(account_id) = anchor.account_id {
            reconcile_account(&txn, account_id).await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    async fn find_owned(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(TransactionError::NotFound(transaction_id))
    }
}

/// Resolves the members of a series slice selected by `scope`, anchored at
/// one member. Non-series rows select only themselves.
async fn selected_members(
    txn: &DatabaseTransaction,
    anchor: &transactions::Model,
    scope: SeriesScope,
) -> Result<Vec<transactions::Model>, TransactionError> {
    let (Some(series_id), Some(anchor_ordinal)) = (anchor.series_id, anchor.series_ordinal)
    else {
        return Ok(vec![anchor.clone()]);
    };
    if scope == SeriesScope::This {
        return Ok(vec![anchor.clone()]);
    }
    let anchor_ordinal = u32::try_from(anchor_ordinal).unwrap_or(1);

    let members = transactions::Entity::find()
        .filter(transactions::Column::SeriesId.eq(series_id))
        .order_by_asc(transactions::Column::SeriesOrdinal)
        .all(txn)
        .await?;

    Ok(members
        .into_iter()
        .filter(|member| {
            member
                .series_ordinal
                .and_then(|ordinal| u32::try_from(ordinal).ok())
                .is_some_and(|ordinal| scope.includes(anchor_ordinal, ordinal))
        })
        .collect())
}

/// Reverses a settled payment's contribution to its invoice.
async fn reverse_settlement(
    txn: &DatabaseTransaction,
    invoice_id: Uuid,
    amount: Decimal,
    touched_cards: &mut BTreeSet<Uuid>,
) -> Result<(), TransactionError> {
    let Some(invoice) = invoices::Entity::find_by_id(invoice_id)
        .lock_exclusive()
        .one(txn)
        .await?
    else {
        return Ok(());
    };

    let amount_paid = (invoice.amount_paid - amount).max(Decimal::ZERO);
    let status = InvoiceStatus::from(invoice.status.clone())
        .after_payment_reversal(invoice.total, amount_paid);
    touched_cards.insert(invoice.card_id);

    let mut active = invoice.into_active_model();
    active.amount_paid = Set(amount_paid);
    active.status = Set(status.into());
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;
    Ok(())
}

async fn card_of_invoice(
    txn: &DatabaseTransaction,
    invoice_id: Uuid,
) -> Result<Option<credit_cards::Model>, TransactionError> {
    let Some(invoice) = invoices::Entity::find_by_id(invoice_id).one(txn).await? else {
        return Ok(None);
    };
    let card = credit_cards::Entity::find_by_id(invoice.card_id)
        .one(txn)
        .await?;
    Ok(card)
}

/// Reconciles the touched aggregates in dependency order: accounts, then
/// invoices (collecting their cards), then cards.
async fn reconcile_all(
    txn: &DatabaseTransaction,
    accounts: BTreeSet<Uuid>,
    invoices: BTreeSet<Uuid>,
    mut cards: BTreeSet<Uuid>,
) -> Result<(), TransactionError> {
    for account_id in accounts {
        reconcile_account(txn, account_id).await?;
    }
    for invoice_id in invoices {
        if let Some(outcome) = reconcile_invoice(txn, invoice_id).await? {
            cards.insert(outcome.card_id);
        }
    }
    for card_id in cards {
        reconcile_card(txn, card_id).await?;
    }
    Ok(())
}

fn ordinal_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
