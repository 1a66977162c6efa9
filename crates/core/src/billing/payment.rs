//! Payment precondition checks.
//!
//! Validation happens before any write: a rejected payment leaves no partial
//! effects behind.

use rust_decimal::Decimal;

use super::error::BillingError;

/// Outcome of validating a payment against an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentBreakdown {
    /// Remaining balance before this payment.
    pub remaining_before: Decimal,
    /// Remaining balance once this payment applies.
    pub remaining_after: Decimal,
    /// Cumulative amount paid once this payment applies.
    pub amount_paid_after: Decimal,
    /// Whether this payment fully settles the invoice.
    pub fully_paid: bool,
}

/// Validates a payment of `amount` against an invoice with the given `total`
/// and cumulative `amount_paid`.
///
/// # Errors
///
/// Returns [`BillingError::NonPositiveAmount`] for zero or negative amounts,
/// and [`BillingError::ExceedsRemaining`] when the amount is larger than the
/// remaining balance.
pub fn validate_payment(
    amount: Decimal,
    total: Decimal,
    amount_paid: Decimal,
) -> Result<PaymentBreakdown, BillingError> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::NonPositiveAmount);
    }

    let remaining = total - amount_paid;
    if amount > remaining {
        return Err(BillingError::ExceedsRemaining { amount, remaining });
    }

    let amount_paid_after = amount_paid + amount;
    Ok(PaymentBreakdown {
        remaining_before: remaining,
        remaining_after: total - amount_paid_after,
        amount_paid_after,
        fully_paid: amount_paid_after >= total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_payment() {
        let breakdown = validate_payment(dec!(100), dec!(100), dec!(0)).unwrap();
        assert_eq!(breakdown.remaining_before, dec!(100));
        assert_eq!(breakdown.remaining_after, dec!(0));
        assert_eq!(breakdown.amount_paid_after, dec!(100));
        assert!(breakdown.fully_paid);
    }

    #[test]
    fn test_partial_payment() {
        let breakdown = validate_payment(dec!(40), dec!(100), dec!(0)).unwrap();
        assert_eq!(breakdown.remaining_after, dec!(60));
        assert!(!breakdown.fully_paid);
    }

    #[test]
    fn test_second_partial_payment_completes() {
        let breakdown = validate_payment(dec!(50), dec!(100), dec!(50)).unwrap();
        assert_eq!(breakdown.remaining_before, dec!(50));
        assert_eq!(breakdown.remaining_after, dec!(0));
        assert!(breakdown.fully_paid);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result = validate_payment(dec!(0), dec!(100), dec!(0));
        assert_eq!(result, Err(BillingError::NonPositiveAmount));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = validate_payment(dec!(-10), dec!(100), dec!(0));
        assert_eq!(result, Err(BillingError::NonPositiveAmount));
    }

    #[test]
    fn test_exceeding_remaining_rejected() {
        let result = validate_payment(dec!(60), dec!(100), dec!(50));
        assert_eq!(
            result,
            Err(BillingError::ExceedsRemaining {
                amount: dec!(60),
                remaining: dec!(50),
            })
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Paying in two halves lands on the same cumulative state as one
        /// full payment.
        #[test]
        fn prop_split_payment_equals_full(total_cents in 2i64..1_000_000) {
            let total = Decimal::new(total_cents, 2);
            let half = total / dec!(2);

            let first = validate_payment(half, total, Decimal::ZERO).unwrap();
            let second = validate_payment(total - half, total, first.amount_paid_after).unwrap();
            let full = validate_payment(total, total, Decimal::ZERO).unwrap();

            prop_assert_eq!(second.amount_paid_after, full.amount_paid_after);
            prop_assert_eq!(second.remaining_after, full.remaining_after);
            prop_assert!(second.fully_paid);
        }

        /// A valid payment never leaves a negative remaining balance.
        #[test]
        fn prop_remaining_never_negative(
            amount_cents in 1i64..1_000_000,
            total_cents in 1i64..1_000_000,
            paid_cents in 0i64..1_000_000,
        ) {
            let amount = Decimal::new(amount_cents, 2);
            let total = Decimal::new(total_cents, 2);
            let paid = Decimal::new(paid_cents, 2);

            if let Ok(breakdown) = validate_payment(amount, total, paid) {
                prop_assert!(breakdown.remaining_after >= Decimal::ZERO);
            }
        }
    }
}
