//! Invoice repository for credit-card invoice database operations.
//!
//! Owns invoice resolution (which monthly invoice a purchase lands on),
//! explicit invoice CRUD, and the payment processor. Every invoice carries a
//! companion liability transaction that mirrors the open amount; payments are
//! recorded as settlement transactions against the paying account.

use bolso_core::billing::{BillingError, BillingPeriod, InvoiceStatus, validate_payment};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    accounts, credit_cards, invoices,
    sea_orm_active_enums::{self, TransactionKind, TransactionOrigin},
    transactions,
};
use crate::repositories::reconcile::{reconcile_account, reconcile_card, reconcile_invoice};

/// Error types for invoice operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    /// Invoice not found (or not owned by the requesting user).
    #[error("Invoice not found: {0}")]
    NotFound(Uuid),

    /// Card not found (or not owned by the requesting user).
    #[error("Credit card not found: {0}")]
    CardNotFound(Uuid),

    /// Paying account not found (or not owned by the requesting user).
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// An invoice already exists for this card and period.
    #[error("Invoice for {month:02}/{year} already exists")]
    DuplicatePeriod {
        /// Billing month.
        month: u32,
        /// Billing year.
        year: i32,
    },

    /// A billing rule was violated.
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for explicitly creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Card the invoice belongs to.
    pub card_id: Uuid,
    /// Billing month (1-12).
    pub month: u32,
    /// Billing year.
    pub year: i32,
    /// Paying account override; defaults to the card's account.
    pub account_id: Option<Uuid>,
}

/// Filter options for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Filter by card.
    pub card_id: Option<Uuid>,
    /// Filter by status.
    pub status: Option<sea_orm_active_enums::InvoiceStatus>,
}

/// Invoice with its linked card purchases.
#[derive(Debug, Clone)]
pub struct InvoiceWithPurchases {
    /// Invoice header.
    pub invoice: invoices::Model,
    /// Card purchases linked to the invoice, oldest first.
    pub purchases: Vec<transactions::Model>,
}

/// Input for paying an invoice.
#[derive(Debug, Clone)]
pub struct PayInvoiceInput {
    /// Amount to pay; may be partial.
    pub amount: Decimal,
    /// Date the money leaves the account.
    pub settlement_date: NaiveDate,
    /// Account the payment is debited from.
    pub account_id: Uuid,
    /// Optional category for the settlement transaction.
    pub category_id: Option<Uuid>,
}

/// Outcome of an invoice payment.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// Invoice after the payment applied.
    pub invoice: invoices::Model,
    /// The settlement transaction that was recorded.
    pub settlement: transactions::Model,
    /// Remaining balance after the payment.
    pub remaining: Decimal,
}

/// Invoice repository for invoice CRUD and payments.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists invoices across the user's cards, newest period first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        user_id: Uuid,
        filter: InvoiceFilter,
    ) -> Result<Vec<invoices::Model>, InvoiceError> {
        let card_ids: Vec<Uuid> = credit_cards::Entity::find()
            .filter(credit_cards::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|card| card.id)
            .collect();

        let mut query = invoices::Entity::find().filter(invoices::Column::CardId.is_in(card_ids));

        if let Some(card_id) = filter.card_id {
            query = query.filter(invoices::Column::CardId.eq(card_id));
        }

        let rows = query
            .order_by_desc(invoices::Column::ReferenceYear)
            .order_by_desc(invoices::Column::ReferenceMonth)
            .all(&self.db)
            .await?;

        // Age before filtering: a stored `open` that is past its due date
        // must answer an `overdue` query, not an `open` one.
        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let row = refresh_status(&self.db, row).await?;
            let keep = match &filter.status {
                Some(status) => row.status == *status,
                None => true,
            };
            if keep {
                invoices.push(row);
            }
        }

        Ok(invoices)
    }

    /// Gets an invoice with its linked card purchases.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::NotFound`] if the invoice does not exist or
    /// belongs to another user.
    pub async fn get(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<InvoiceWithPurchases, InvoiceError> {
        let (invoice, _card) = self.find_owned(user_id, invoice_id).await?;
        let invoice = refresh_status(&self.db, invoice).await?;

        let purchases = transactions::Entity::find()
            .filter(transactions::Column::InvoiceId.eq(invoice.id))
            .filter(transactions::Column::Origin.eq(TransactionOrigin::CardPurchase))
            .order_by_asc(transactions::Column::AccrualDate)
            .all(&self.db)
            .await?;

        Ok(InvoiceWithPurchases { invoice, purchases })
    }

    /// Explicitly creates an invoice for a card and billing period.
    ///
    /// The lazy resolver covers the common path; this exists for opening a
    /// future invoice ahead of its first purchase.
    ///
    /// # Errors
    ///
    /// Returns an error if the card is not owned, the period is invalid, or
    /// an invoice for the period already exists.
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateInvoiceInput,
    ) -> Result<invoices::Model, InvoiceError> {
        if input.month == 0 || input.month > 12 {
            return Err(BillingError::InvalidPeriod {
                month: input.month,
                year: input.year,
            }
            .into());
        }

        let card = find_owned_card(&self.db, user_id, input.card_id).await?;

        if let Some(account_id) = input.account_id {
            ensure_owned_account(&self.db, user_id, account_id).await?;
        }

        let period = BillingPeriod {
            month: input.month,
            year: input.year,
        };

        let existing = invoices::Entity::find()
            .filter(invoices::Column::CardId.eq(card.id))
            .filter(invoices::Column::ReferenceMonth.eq(month_column(period.month)))
            .filter(invoices::Column::ReferenceYear.eq(period.year))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(InvoiceError::DuplicatePeriod {
                month: period.month,
                year: period.year,
            });
        }

        let txn = self.db.begin().await?;
        let invoice = insert_invoice(&txn, &card, period, input.account_id).await?;
        txn.commit().await?;

        Ok(invoice)
    }

    /// Deletes an invoice together with its linked transactions, then
    /// reconciles the accounts and card that were affected.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::NotFound`] if the invoice does not exist or
    /// belongs to another user.
    pub async fn delete(&self, user_id: Uuid, invoice_id: Uuid) -> Result<(), InvoiceError> {
        let (invoice, card) = self.find_owned(user_id, invoice_id).await?;

        let txn = self.db.begin().await?;

        let linked = transactions::Entity::find()
            .filter(transactions::Column::InvoiceId.eq(invoice.id))
            .all(&txn)
            .await?;

        // Settled rows moved an account balance; reconcile those accounts
        // once their rows are gone.
        let mut touched_accounts: Vec<Uuid> = linked
            .iter()
            .filter(|row| row.paid && row.origin != TransactionOrigin::CardPurchase)
            .filter_map(|row| row.account_id)
            .collect();
        touched_accounts.sort_unstable();
        touched_accounts.dedup();

        transactions::Entity::delete_many()
            .filter(transactions::Column::InvoiceId.eq(invoice.id))
            .exec(&txn)
            .await?;
        invoices::Entity::delete_by_id(invoice.id).exec(&txn).await?;

        for account_id in touched_accounts {
            reconcile_account(&txn, account_id).await?;
        }
        reconcile_card(&txn, card.id).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Pays an invoice, partially or in full.
    ///
    /// The stored total is defensively recomputed before validation, the
    /// payment is recorded as a settlement transaction against the paying
    /// account, and the freed card limit is reconciled, all in one database
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice or account is not owned, the amount
    /// is not positive, or the amount exceeds the remaining balance.
    pub async fn pay(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
        input: PayInvoiceInput,
    ) -> Result<PaymentOutcome, InvoiceError> {
        let (invoice, card) = self.find_owned(user_id, invoice_id).await?;
        ensure_owned_account(&self.db, user_id, input.account_id).await?;

        let txn = self.db.begin().await?;

        // The stored total may be stale; never validate a payment against
        // drifted state.
        if let Some(outcome) = reconcile_invoice(&txn, invoice.id).await? {
            if outcome.changed {
                reconcile_card(&txn, outcome.card_id).await?;
            }
        }
        // The row lock serializes concurrent payments: a second payer blocks
        // here until the first commits, then validates against the updated
        // amount_paid instead of the stale snapshot.
        let invoice = invoices::Entity::find_by_id(invoice.id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        let breakdown = validate_payment(input.amount, invoice.total, invoice.amount_paid)?;

        let now = Utc::now().into();
        let settlement = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            description: Set(format!(
                "Payment {} {:02}/{}",
                card.name, invoice.reference_month, invoice.reference_year
            )),
            amount: Set(input.amount),
            kind: Set(TransactionKind::Expense),
            origin: Set(TransactionOrigin::InvoiceSettlement),
            accrual_date: Set(input.settlement_date),
            settlement_date: Set(Some(input.settlement_date)),
            paid: Set(true),
            notes: Set(None),
            account_id: Set(Some(input.account_id)),
            category_id: Set(input.category_id),
            invoice_id: Set(Some(invoice.id)),
            series_id: Set(None),
            series_ordinal: Set(None),
            installment_number: Set(None),
            installment_total: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let status = InvoiceStatus::from(invoice.status.clone())
            .after_payment(invoice.total, breakdown.amount_paid_after);

        let card_id = invoice.card_id;
        let mut active = invoice.into_active_model();
        active.amount_paid = Set(breakdown.amount_paid_after);
        active.status = Set(status.into());
        active.settlement_transaction_id = Set(Some(settlement.id));
        active.updated_at = Set(now);
        let invoice = active.update(&txn).await?;

        reconcile_account(&txn, input.account_id).await?;
        reconcile_card(&txn, card_id).await?;

        txn.commit().await?;

        tracing::info!(
            invoice_id = %invoice.id,
            amount = %input.amount,
            remaining = %breakdown.remaining_after,
            "invoice payment recorded"
        );

        Ok(PaymentOutcome {
            invoice,
            settlement,
            remaining: breakdown.remaining_after,
        })
    }

    /// Finds an invoice and its card, scoped to the owning user.
    async fn find_owned(
        &self,
        user_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<(invoices::Model, credit_cards::Model), InvoiceError> {
        let invoice = invoices::Entity::find_by_id(invoice_id)
            .one(&self.db)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        let card = credit_cards::Entity::find_by_id(invoice.card_id)
            .filter(credit_cards::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            // Another user's invoice looks exactly like a missing one.
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        Ok((invoice, card))
    }
}

/// Resolves the invoice a purchase on `accrual_date` belongs to, creating it
/// lazily if the period has no invoice yet.
///
/// Purchases after the card's closing day land on the next month's invoice.
pub(crate) async fn resolve_or_create<C: ConnectionTrait>(
    conn: &C,
    card: &credit_cards::Model,
    accrual_date: NaiveDate,
) -> Result<invoices::Model, InvoiceError> {
    let period = BillingPeriod::for_purchase(accrual_date, card_day(card.closing_day));

    let existing = invoices::Entity::find()
        .filter(invoices::Column::CardId.eq(card.id))
        .filter(invoices::Column::ReferenceMonth.eq(month_column(period.month)))
        .filter(invoices::Column::ReferenceYear.eq(period.year))
        .one(conn)
        .await?;

    match existing {
        Some(invoice) => Ok(invoice),
        None => insert_invoice(conn, card, period, None).await,
    }
}

/// Inserts an invoice for the period along with its companion liability
/// transaction, and wires the pointer between the two.
async fn insert_invoice<C: ConnectionTrait>(
    conn: &C,
    card: &credit_cards::Model,
    period: BillingPeriod,
    account_id: Option<Uuid>,
) -> Result<invoices::Model, InvoiceError> {
    let closing_day = card_day(card.closing_day);
    let closing_date = period.closing_date(closing_day)?;
    let due_date = period.due_date(closing_day, card_day(card.due_day))?;
    let account_id = account_id.or(card.account_id);

    let now = Utc::now().into();
    let inserted = invoices::ActiveModel {
        id: Set(Uuid::new_v4()),
        card_id: Set(card.id),
        reference_month: Set(month_column(period.month)),
        reference_year: Set(period.year),
        closing_date: Set(closing_date),
        due_date: Set(due_date),
        total: Set(Decimal::ZERO),
        amount_paid: Set(Decimal::ZERO),
        status: Set(sea_orm_active_enums::InvoiceStatus::Open),
        account_id: Set(account_id),
        settlement_transaction_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await;

    let invoice = match inserted {
        Ok(invoice) => invoice,
        // Lost a race against another writer fabricating the same period;
        // the unique index reports it, we surface the period conflict.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(InvoiceError::DuplicatePeriod {
                month: period.month,
                year: period.year,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let companion = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(card.user_id),
        description: Set(format!("{} invoice {period}", card.name)),
        amount: Set(Decimal::ZERO),
        kind: Set(TransactionKind::Expense),
        origin: Set(TransactionOrigin::InvoiceSettlement),
        accrual_date: Set(closing_date),
        settlement_date: Set(Some(due_date)),
        paid: Set(false),
        notes: Set(None),
        account_id: Set(account_id),
        category_id: Set(None),
        invoice_id: Set(Some(invoice.id)),
        series_id: Set(None),
        series_ordinal: Set(None),
        installment_number: Set(None),
        installment_total: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    tracing::debug!(card_id = %card.id, %period, "invoice opened");

    let mut active = invoice.into_active_model();
    active.settlement_transaction_id = Set(Some(companion.id));
    let invoice = active.update(conn).await?;

    Ok(invoice)
}

pub(crate) async fn find_owned_card<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<credit_cards::Model, InvoiceError> {
    credit_cards::Entity::find_by_id(card_id)
        .filter(credit_cards::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or(InvoiceError::CardNotFound(card_id))
}

pub(crate) async fn ensure_owned_account<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    account_id: Uuid,
) -> Result<accounts::Model, InvoiceError> {
    accounts::Entity::find_by_id(account_id)
        .filter(accounts::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or(InvoiceError::AccountNotFound(account_id))
}

/// Ages an invoice's stored status against today's calendar, persisting the
/// transition when one applies.
async fn refresh_status<C: ConnectionTrait>(
    conn: &C,
    invoice: invoices::Model,
) -> Result<invoices::Model, InvoiceError> {
    let current = InvoiceStatus::from(invoice.status.clone());
    let aged = current.aged(
        Utc::now().date_naive(),
        invoice.closing_date,
        invoice.due_date,
    );
    if aged == current {
        return Ok(invoice);
    }

    let mut active = invoice.into_active_model();
    active.status = Set(aged.into());
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// Day-of-month columns are SMALLINT with a 1-31 check; the clamp keeps the
/// conversion total without trusting the database blindly.
fn card_day(value: i16) -> u8 {
    u8::try_from(value.clamp(1, 31)).unwrap_or(1)
}

fn month_column(month: u32) -> i16 {
    i16::try_from(month.clamp(1, 12)).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_day_clamps_out_of_range() {
        assert_eq!(card_day(0), 1);
        assert_eq!(card_day(15), 15);
        assert_eq!(card_day(99), 31);
    }

    #[test]
    fn test_month_column_round_trip() {
        for month in 1..=12u32 {
            assert_eq!(month_column(month), i16::try_from(month).unwrap());
        }
    }
}
