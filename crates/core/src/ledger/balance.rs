//! The three reconciliation folds.
//!
//! Each function is a deterministic fold over row snapshots: calling it twice
//! with the same input yields the same output, and it cannot fail. Callers
//! run these inside the same database transaction as the write that
//! triggered them.

use rust_decimal::Decimal;

use super::types::{PostingRow, TransactionOrigin, signed_amount};

/// Recomputes an account's current balance.
///
/// `current_balance = opening_balance + Σ signed(amount)` over every row that
/// is paid and did not originate as a card purchase. Card purchases never
/// move an account balance directly; only their eventual settlement does.
#[must_use]
pub fn account_balance<'a, I>(opening_balance: Decimal, rows: I) -> Decimal
where
    I: IntoIterator<Item = &'a PostingRow>,
{
    rows.into_iter()
        .filter(|row| row.paid && row.origin != TransactionOrigin::CardPurchase)
        .fold(opening_balance, |acc, row| {
            acc + signed_amount(row.kind, row.amount)
        })
}

/// Recomputes an invoice's total from the rows linked to it.
///
/// Only card-purchase rows count; the invoice's own settlement rows and any
/// stray manual rows are excluded.
#[must_use]
pub fn invoice_total<'a, I>(rows: I) -> Decimal
where
    I: IntoIterator<Item = &'a PostingRow>,
{
    rows.into_iter()
        .filter(|row| row.origin == TransactionOrigin::CardPurchase)
        .map(|row| row.amount)
        .sum()
}

/// Recomputes a card's utilized limit from its invoices' `(total, amount_paid)`.
///
/// Each invoice occupies `max(total - amount_paid, 0)` of the limit, so paying
/// an invoice (or toggling its settlement back to unpaid) frees or re-occupies
/// limit through the same idempotent recompute. A card with no invoices has a
/// utilized limit of zero.
#[must_use]
pub fn card_used_limit<I>(invoices: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    invoices
        .into_iter()
        .map(|(total, amount_paid)| (total - amount_paid).max(Decimal::ZERO))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::TransactionKind;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn row(
        amount: Decimal,
        kind: TransactionKind,
        origin: TransactionOrigin,
        paid: bool,
    ) -> PostingRow {
        PostingRow {
            amount,
            kind,
            origin,
            paid,
        }
    }

    #[test]
    fn test_account_balance_empty_is_opening() {
        assert_eq!(account_balance(dec!(150), []), dec!(150));
    }

    #[test]
    fn test_account_balance_signed_sum() {
        let rows = vec![
            row(
                dec!(1000),
                TransactionKind::Income,
                TransactionOrigin::Manual,
                true,
            ),
            row(
                dec!(300),
                TransactionKind::Expense,
                TransactionOrigin::Manual,
                true,
            ),
        ];
        assert_eq!(account_balance(dec!(100), &rows), dec!(800));
    }

    #[test]
    fn test_account_balance_skips_unpaid() {
        let rows = vec![
            row(
                dec!(1000),
                TransactionKind::Income,
                TransactionOrigin::Manual,
                false,
            ),
            row(
                dec!(50),
                TransactionKind::Expense,
                TransactionOrigin::Manual,
                true,
            ),
        ];
        assert_eq!(account_balance(dec!(0), &rows), dec!(-50));
    }

    #[test]
    fn test_account_balance_skips_card_purchases() {
        // A paid card purchase must not debit the account; its settlement does.
        let rows = vec![
            row(
                dec!(200),
                TransactionKind::Expense,
                TransactionOrigin::CardPurchase,
                true,
            ),
            row(
                dec!(200),
                TransactionKind::Expense,
                TransactionOrigin::InvoiceSettlement,
                true,
            ),
        ];
        assert_eq!(account_balance(dec!(500), &rows), dec!(300));
    }

    #[test]
    fn test_account_balance_transfer_contributes_nothing() {
        let rows = vec![row(
            dec!(400),
            TransactionKind::Transfer,
            TransactionOrigin::Manual,
            true,
        )];
        assert_eq!(account_balance(dec!(10), &rows), dec!(10));
    }

    #[test]
    fn test_invoice_total_sums_card_purchases_only() {
        let rows = vec![
            row(
                dec!(100),
                TransactionKind::Expense,
                TransactionOrigin::CardPurchase,
                false,
            ),
            row(
                dec!(50),
                TransactionKind::Expense,
                TransactionOrigin::CardPurchase,
                false,
            ),
            // The companion settlement row is linked to the invoice too.
            row(
                dec!(150),
                TransactionKind::Expense,
                TransactionOrigin::InvoiceSettlement,
                false,
            ),
        ];
        assert_eq!(invoice_total(&rows), dec!(150));
    }

    #[test]
    fn test_invoice_total_empty_is_zero() {
        assert_eq!(invoice_total([]), Decimal::ZERO);
    }

    #[test]
    fn test_card_used_limit_unpaid_invoices() {
        let invoices = vec![(dec!(150), dec!(0)), (dec!(50), dec!(0))];
        assert_eq!(card_used_limit(invoices), dec!(200));
    }

    #[test]
    fn test_card_used_limit_payment_frees_limit() {
        let invoices = vec![(dec!(150), dec!(150)), (dec!(50), dec!(20))];
        assert_eq!(card_used_limit(invoices), dec!(30));
    }

    #[test]
    fn test_card_used_limit_overpayment_floors_at_zero() {
        let invoices = vec![(dec!(100), dec!(120))];
        assert_eq!(card_used_limit(invoices), Decimal::ZERO);
    }

    #[test]
    fn test_card_used_limit_no_invoices_is_zero() {
        assert_eq!(card_used_limit([]), Decimal::ZERO);
    }

    // ========================================================================
    // Properties: the folds are idempotent and order-insensitive
    // ========================================================================

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn row_strategy() -> impl Strategy<Value = PostingRow> {
        (
            amount_strategy(),
            prop_oneof![
                Just(TransactionKind::Income),
                Just(TransactionKind::Expense),
                Just(TransactionKind::Transfer),
            ],
            prop_oneof![
                Just(TransactionOrigin::Manual),
                Just(TransactionOrigin::CardPurchase),
                Just(TransactionOrigin::InvoiceSettlement),
            ],
            any::<bool>(),
        )
            .prop_map(|(amount, kind, origin, paid)| PostingRow {
                amount,
                kind,
                origin,
                paid,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Recomputing twice with unchanged rows yields the same balance.
        #[test]
        fn prop_account_balance_idempotent(
            opening in amount_strategy(),
            rows in prop::collection::vec(row_strategy(), 0..30),
        ) {
            let first = account_balance(opening, &rows);
            let second = account_balance(opening, &rows);
            prop_assert_eq!(first, second);
        }

        /// The fold equals opening plus the signed sum of eligible rows.
        #[test]
        fn prop_account_balance_matches_signed_sum(
            opening in amount_strategy(),
            rows in prop::collection::vec(row_strategy(), 0..30),
        ) {
            let expected: Decimal = rows
                .iter()
                .filter(|r| r.paid && r.origin != TransactionOrigin::CardPurchase)
                .map(|r| signed_amount(r.kind, r.amount))
                .sum();
            prop_assert_eq!(account_balance(opening, &rows), opening + expected);
        }

        /// Row order never changes an invoice total.
        #[test]
        fn prop_invoice_total_order_insensitive(
            mut rows in prop::collection::vec(row_strategy(), 0..30),
        ) {
            let forward = invoice_total(&rows);
            rows.reverse();
            prop_assert_eq!(invoice_total(&rows), forward);
        }

        /// Utilized limit is never negative.
        #[test]
        fn prop_card_used_limit_non_negative(
            invoices in prop::collection::vec(
                (amount_strategy(), amount_strategy()),
                0..20,
            ),
        ) {
            prop_assert!(card_used_limit(invoices) >= Decimal::ZERO);
        }

        /// With nothing paid, the utilized limit is exactly the sum of totals.
        #[test]
        fn prop_card_used_limit_unpaid_sums_totals(
            totals in prop::collection::vec(amount_strategy(), 0..20),
        ) {
            let expected: Decimal = totals.iter().copied().sum();
            let invoices = totals.into_iter().map(|t| (t, Decimal::ZERO));
            prop_assert_eq!(card_used_limit(invoices), expected);
        }
    }
}
