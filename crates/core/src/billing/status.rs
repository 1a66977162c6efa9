//! Invoice status state machine.
//!
//! Status is an explicit tagged state rather than a combination of boolean
//! flags; the transition functions here are the only legal mutators.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a credit-card invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Still accumulating purchases.
    Open,
    /// Closed for new purchases, awaiting payment.
    Closed,
    /// Fully paid.
    Paid,
    /// Past due date without full payment.
    Overdue,
}

impl InvoiceStatus {
    /// State after a payment brings `amount_paid` against `total`.
    ///
    /// Full payment settles the invoice; a partial payment leaves the
    /// current state untouched.
    #[must_use]
    pub fn after_payment(self, total: Decimal, amount_paid: Decimal) -> Self {
        if amount_paid >= total {
            Self::Paid
        } else {
            self
        }
    }

    /// State after a settlement is removed or reduced (settlement deletion).
    ///
    /// If the invoice is no longer fully covered it falls back to closed;
    /// a still fully covered invoice stays paid.
    #[must_use]
    pub fn after_payment_reversal(self, total: Decimal, amount_paid: Decimal) -> Self {
        if amount_paid >= total && total > Decimal::ZERO {
            Self::Paid
        } else {
            Self::Closed
        }
    }

    /// State after the settlement transaction's paid flag is toggled.
    #[must_use]
    pub const fn after_settlement_toggle(paid: bool) -> Self {
        if paid { Self::Paid } else { Self::Closed }
    }

    /// State implied by the calendar on `today`.
    ///
    /// An open invoice past its closing date stops accumulating and becomes
    /// closed; any unpaid invoice past its due date is overdue. A paid
    /// invoice never ages.
    #[must_use]
    pub fn aged(self, today: NaiveDate, closing_date: NaiveDate, due_date: NaiveDate) -> Self {
        match self {
            Self::Paid => Self::Paid,
            _ if today > due_date => Self::Overdue,
            Self::Open if today > closing_date => Self::Closed,
            other => other,
        }
    }

    /// Whether the invoice is fully settled.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_payment_settles() {
        let status = InvoiceStatus::Open.after_payment(dec!(100), dec!(100));
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_partial_payment_keeps_state() {
        assert_eq!(
            InvoiceStatus::Open.after_payment(dec!(100), dec!(40)),
            InvoiceStatus::Open
        );
        assert_eq!(
            InvoiceStatus::Closed.after_payment(dec!(100), dec!(40)),
            InvoiceStatus::Closed
        );
    }

    #[test]
    fn test_overpayment_settles() {
        let status = InvoiceStatus::Closed.after_payment(dec!(100), dec!(120));
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_reversal_reopens_as_closed() {
        let status = InvoiceStatus::Paid.after_payment_reversal(dec!(100), dec!(50));
        assert_eq!(status, InvoiceStatus::Closed);
    }

    #[test]
    fn test_reversal_still_covered_stays_paid() {
        let status = InvoiceStatus::Paid.after_payment_reversal(dec!(100), dec!(100));
        assert_eq!(status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_zero_total_reversal_is_closed() {
        let status = InvoiceStatus::Paid.after_payment_reversal(dec!(0), dec!(0));
        assert_eq!(status, InvoiceStatus::Closed);
    }

    #[test]
    fn test_aging_open_past_closing_becomes_closed() {
        let closing = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        assert_eq!(
            InvoiceStatus::Open.aged(today, closing, due),
            InvoiceStatus::Closed
        );
        // On the closing day itself the invoice still accepts purchases.
        assert_eq!(
            InvoiceStatus::Open.aged(closing, closing, due),
            InvoiceStatus::Open
        );
    }

    #[test]
    fn test_aging_unpaid_past_due_becomes_overdue() {
        let closing = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 21).unwrap();
        assert_eq!(
            InvoiceStatus::Open.aged(today, closing, due),
            InvoiceStatus::Overdue
        );
        assert_eq!(
            InvoiceStatus::Closed.aged(today, closing, due),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn test_aging_paid_never_ages() {
        let closing = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let due = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let later = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(
            InvoiceStatus::Paid.aged(later, closing, due),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn test_settlement_toggle() {
        assert_eq!(
            InvoiceStatus::after_settlement_toggle(true),
            InvoiceStatus::Paid
        );
        assert_eq!(
            InvoiceStatus::after_settlement_toggle(false),
            InvoiceStatus::Closed
        );
    }
}
