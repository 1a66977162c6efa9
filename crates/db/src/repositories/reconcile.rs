//! Aggregate reconciliation.
//!
//! Derived balances are always recomputed in full from the underlying rows
//! using the folds in `bolso-core`, never incremented in place. The functions
//! here are idempotent and silently skip rows that no longer exist, so
//! callers can re-run them after any mutation without ordering hazards
//! beyond account -> invoice -> card. Each aggregate row is fetched
//! `FOR UPDATE`, so two transactions touching the same account, invoice, or
//! card serialize on the row instead of interleaving their recomputes.

use bolso_core::ledger::{PostingRow, account_balance, card_used_limit, invoice_total};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::{
    accounts, credit_cards, invoices,
    sea_orm_active_enums::{TransactionKind, TransactionOrigin},
    transactions,
};

/// Result of reconciling one invoice.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceReconciliation {
    /// Card the invoice belongs to.
    pub card_id: Uuid,
    /// Recomputed total.
    pub total: Decimal,
    /// Whether the stored total was stale.
    pub changed: bool,
}

fn posting_row(model: &transactions::Model) -> PostingRow {
    PostingRow {
        amount: model.amount,
        kind: model.kind.clone().into(),
        origin: model.origin.clone().into(),
        paid: model.paid,
    }
}

/// Recomputes an account's `current_balance` from its transaction rows.
///
/// # Errors
///
/// Returns an error if a database operation fails.
pub async fn reconcile_account<C: ConnectionTrait>(
    conn: &C,
    account_id: Uuid,
) -> Result<(), DbErr> {
    let Some(account) = accounts::Entity::find_by_id(account_id)
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(());
    };

    let rows: Vec<PostingRow> = transactions::Entity::find()
        .filter(transactions::Column::AccountId.eq(account_id))
        .all(conn)
        .await?
        .iter()
        .map(posting_row)
        .collect();

    let balance = account_balance(account.opening_balance, &rows);
    if balance != account.current_balance {
        tracing::debug!(%account_id, %balance, "account balance reconciled");
        let mut active = account.into_active_model();
        active.current_balance = Set(balance);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;
    }

    Ok(())
}

/// Recomputes an invoice's `total` from its linked card purchases.
///
/// The recomputed total is also carried onto the invoice's companion
/// liability transaction so the pending amount shown in the ledger stays in
/// step with the purchases: a pending companion mirrors the total, a deleted
/// companion is rebuilt, and a settled payment keeps its historical amount.
///
/// Returns `None` if the invoice no longer exists.
///
/// # Errors
///
/// Returns an error if a database operation fails.
pub async fn reconcile_invoice<C: ConnectionTrait>(
    conn: &C,
    invoice_id: Uuid,
) -> Result<Option<InvoiceReconciliation>, DbErr> {
    let Some(invoice) = invoices::Entity::find_by_id(invoice_id)
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    let rows: Vec<PostingRow> = transactions::Entity::find()
        .filter(transactions::Column::InvoiceId.eq(invoice_id))
        .all(conn)
        .await?
        .iter()
        .map(posting_row)
        .collect();

    let total = invoice_total(&rows);
    let changed = total != invoice.total;
    let card_id = invoice.card_id;

    if changed {
        tracing::debug!(%invoice_id, %total, "invoice total reconciled");
        let mut active = invoice.clone().into_active_model();
        active.total = Set(total);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;
    }

    sync_companion(conn, &invoice, total).await?;

    Ok(Some(InvoiceReconciliation {
        card_id,
        total,
        changed,
    }))
}

/// What a recompute should do with the invoice's companion liability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompanionSync {
    /// Companion is settled or already carries the total.
    Keep,
    /// Mirror the new total onto the pending companion.
    Mirror,
    /// Companion row is gone; rebuild it so the liability reappears.
    Recreate,
}

fn companion_sync(companion: Option<&transactions::Model>, total: Decimal) -> CompanionSync {
    match companion {
        None => CompanionSync::Recreate,
        // Settled payments keep their historical amount; only the pending
        // liability mirrors the running total.
        Some(row) if row.paid || row.amount == total => CompanionSync::Keep,
        Some(_) => CompanionSync::Mirror,
    }
}

async fn sync_companion<C: ConnectionTrait>(
    conn: &C,
    invoice: &invoices::Model,
    total: Decimal,
) -> Result<(), DbErr> {
    let companion = match invoice.settlement_transaction_id {
        Some(id) => transactions::Entity::find_by_id(id).one(conn).await?,
        None => None,
    };

    match companion_sync(companion.as_ref(), total) {
        CompanionSync::Keep => Ok(()),
        CompanionSync::Mirror => {
            let Some(companion) = companion else {
                return Ok(());
            };
            let mut active = companion.into_active_model();
            active.amount = Set(total);
            active.updated_at = Set(Utc::now().into());
            active.update(conn).await?;
            Ok(())
        }
        CompanionSync::Recreate => recreate_companion(conn, invoice, total).await,
    }
}

async fn recreate_companion<C: ConnectionTrait>(
    conn: &C,
    invoice: &invoices::Model,
    total: Decimal,
) -> Result<(), DbErr> {
    let Some(card) = credit_cards::Entity::find_by_id(invoice.card_id)
        .one(conn)
        .await?
    else {
        return Ok(());
    };

    let now = Utc::now().into();
    let companion = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(card.user_id),
        description: Set(format!(
            "{} invoice {:02}/{}",
            card.name, invoice.reference_month, invoice.reference_year
        )),
        amount: Set(total),
        kind: Set(TransactionKind::Expense),
        origin: Set(TransactionOrigin::InvoiceSettlement),
        accrual_date: Set(invoice.closing_date),
        settlement_date: Set(Some(invoice.due_date)),
        paid: Set(false),
        notes: Set(None),
        account_id: Set(invoice.account_id),
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

    tracing::debug!(invoice_id = %invoice.id, "companion liability rebuilt");

    invoices::ActiveModel {
        id: Set(invoice.id),
        settlement_transaction_id: Set(Some(companion.id)),
        updated_at: Set(now),
        ..Default::default()
    }
    .update(conn)
    .await?;

    Ok(())
}

/// Recomputes a card's `used_limit` from its invoices.
///
/// # Errors
///
/// Returns an error if a database operation fails.
pub async fn reconcile_card<C: ConnectionTrait>(conn: &C, card_id: Uuid) -> Result<(), DbErr> {
    let Some(card) = credit_cards::Entity::find_by_id(card_id)
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(());
    };

    let outstanding = invoices::Entity::find()
        .filter(invoices::Column::CardId.eq(card_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|invoice| (invoice.total, invoice.amount_paid));

    let used_limit = card_used_limit(outstanding);
    if used_limit != card.used_limit {
        tracing::debug!(%card_id, %used_limit, "card utilized limit reconciled");
        let mut active = card.into_active_model();
        active.used_limit = Set(used_limit);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolso_core::ledger as core_ledger;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn model(kind: TransactionKind, origin: TransactionOrigin, paid: bool) -> transactions::Model {
        let now = Utc::now().into();
        transactions::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            description: "Groceries".to_string(),
            amount: dec!(42.50),
            kind,
            origin,
            accrual_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            settlement_date: None,
            paid,
            notes: None,
            account_id: None,
            category_id: None,
            invoice_id: None,
            series_id: None,
            series_ordinal: None,
            installment_number: None,
            installment_total: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_posting_row_maps_entity_fields() {
        let row = posting_row(&model(
            TransactionKind::Expense,
            TransactionOrigin::CardPurchase,
            true,
        ));
        assert_eq!(row.amount, dec!(42.50));
        assert_eq!(row.kind, core_ledger::TransactionKind::Expense);
        assert_eq!(row.origin, core_ledger::TransactionOrigin::CardPurchase);
        assert!(row.paid);
    }

    #[test]
    fn test_posting_rows_feed_the_account_fold() {
        // A settled manual expense debits; the paid card purchase does not.
        let rows = vec![
            posting_row(&model(
                TransactionKind::Expense,
                TransactionOrigin::Manual,
                true,
            )),
            posting_row(&model(
                TransactionKind::Expense,
                TransactionOrigin::CardPurchase,
                true,
            )),
        ];
        assert_eq!(core_ledger::account_balance(dec!(100), &rows), dec!(57.50));
    }

    #[test]
    fn test_companion_sync_rebuilds_deleted_companion() {
        assert_eq!(companion_sync(None, dec!(150)), CompanionSync::Recreate);
    }

    #[test]
    fn test_companion_sync_mirrors_pending_companion() {
        let mut companion = model(
            TransactionKind::Expense,
            TransactionOrigin::InvoiceSettlement,
            false,
        );
        companion.amount = dec!(80);
        assert_eq!(
            companion_sync(Some(&companion), dec!(150)),
            CompanionSync::Mirror
        );
        companion.amount = dec!(150);
        assert_eq!(
            companion_sync(Some(&companion), dec!(150)),
            CompanionSync::Keep
        );
    }

    #[test]
    fn test_companion_sync_never_touches_settled_payment() {
        let mut settlement = model(
            TransactionKind::Expense,
            TransactionOrigin::InvoiceSettlement,
            true,
        );
        settlement.amount = dec!(80);
        assert_eq!(
            companion_sync(Some(&settlement), dec!(150)),
            CompanionSync::Keep
        );
    }
}
