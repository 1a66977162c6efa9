//! Invoice period resolution.
//!
//! A credit-card purchase belongs to exactly one monthly invoice, determined
//! by the purchase's accrual date and the card's closing day: anything after
//! the closing day rolls into the following month's invoice. This rule is
//! deterministic and pure; the database layer uses it to look up or lazily
//! create the invoice row.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::BillingError;

/// A card's monthly statement period, keyed by reference month and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Reference month (1..=12).
    pub month: u32,
    /// Reference year.
    pub year: i32,
}

impl BillingPeriod {
    /// Resolves the period a purchase belongs to.
    ///
    /// A purchase on the closing day itself still belongs to the accrual
    /// month; one day later belongs to the next month. Month 13 rolls over
    /// to January of the following year.
    #[must_use]
    pub fn for_purchase(accrual_date: NaiveDate, closing_day: u8) -> Self {
        let period = Self {
            month: accrual_date.month(),
            year: accrual_date.year(),
        };

        if accrual_date.day() > u32::from(closing_day) {
            period.next()
        } else {
            period
        }
    }

    /// The period one month later.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                month: 1,
                year: self.year + 1,
            }
        } else {
            Self {
                month: self.month + 1,
                year: self.year,
            }
        }
    }

    /// The invoice's closing date: the card's closing day within the
    /// reference month, clamped to the month's length.
    pub fn closing_date(self, closing_day: u8) -> Result<NaiveDate, BillingError> {
        self.clamped_date(self.month, self.year, u32::from(closing_day))
    }

    /// The invoice's due date: the card's due day, in the reference month if
    /// it falls after the closing day, otherwise in the following month.
    pub fn due_date(self, closing_day: u8, due_day: u8) -> Result<NaiveDate, BillingError> {
        if due_day > closing_day {
            self.clamped_date(self.month, self.year, u32::from(due_day))
        } else {
            let next = self.next();
            self.clamped_date(next.month, next.year, u32::from(due_day))
        }
    }

    fn clamped_date(self, month: u32, year: i32, day: u32) -> Result<NaiveDate, BillingError> {
        let day = day.clamp(1, days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day).ok_or(BillingError::InvalidPeriod {
            month: self.month,
            year: self.year,
        })
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

const fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_purchase_before_closing_day_stays_in_month() {
        let period = BillingPeriod::for_purchase(date(2025, 1, 5), 10);
        assert_eq!(period, BillingPeriod { month: 1, year: 2025 });
    }

    #[test]
    fn test_purchase_on_closing_day_stays_in_month() {
        let period = BillingPeriod::for_purchase(date(2025, 1, 10), 10);
        assert_eq!(period, BillingPeriod { month: 1, year: 2025 });
    }

    #[test]
    fn test_purchase_after_closing_day_rolls_to_next_month() {
        let period = BillingPeriod::for_purchase(date(2025, 1, 15), 10);
        assert_eq!(period, BillingPeriod { month: 2, year: 2025 });
    }

    #[test]
    fn test_december_purchase_rolls_to_january() {
        let period = BillingPeriod::for_purchase(date(2025, 12, 28), 10);
        assert_eq!(period, BillingPeriod { month: 1, year: 2026 });
    }

    #[test]
    fn test_closing_date_clamped_to_month_length() {
        let period = BillingPeriod { month: 2, year: 2025 };
        assert_eq!(period.closing_date(31).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn test_closing_date_leap_february() {
        let period = BillingPeriod { month: 2, year: 2024 };
        assert_eq!(period.closing_date(31).unwrap(), date(2024, 2, 29));
    }

    #[test]
    fn test_due_date_after_closing_same_month() {
        let period = BillingPeriod { month: 3, year: 2025 };
        assert_eq!(period.due_date(10, 20).unwrap(), date(2025, 3, 20));
    }

    #[test]
    fn test_due_date_before_closing_rolls_to_next_month() {
        let period = BillingPeriod { month: 3, year: 2025 };
        assert_eq!(period.due_date(25, 5).unwrap(), date(2025, 4, 5));
    }

    #[test]
    fn test_due_date_rollover_across_year() {
        let period = BillingPeriod { month: 12, year: 2025 };
        assert_eq!(period.due_date(25, 5).unwrap(), date(2026, 1, 5));
    }

    #[test]
    fn test_display_zero_pads_month() {
        let period = BillingPeriod { month: 2, year: 2025 };
        assert_eq!(period.to_string(), "02/2025");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Resolution is deterministic: same inputs, same period.
        #[test]
        fn prop_resolution_deterministic(
            days in 0i64..5000,
            closing_day in 1u8..=31,
        ) {
            let accrual = date(2020, 1, 1) + chrono::Duration::days(days);
            let first = BillingPeriod::for_purchase(accrual, closing_day);
            let second = BillingPeriod::for_purchase(accrual, closing_day);
            prop_assert_eq!(first, second);
        }

        /// The resolved period is always the accrual month or the month after.
        #[test]
        fn prop_period_is_accrual_month_or_next(
            days in 0i64..5000,
            closing_day in 1u8..=31,
        ) {
            let accrual = date(2020, 1, 1) + chrono::Duration::days(days);
            let period = BillingPeriod::for_purchase(accrual, closing_day);
            let same = BillingPeriod { month: accrual.month(), year: accrual.year() };
            prop_assert!(period == same || period == same.next());
        }

        /// Closing and due dates exist for every valid period and day pair.
        #[test]
        fn prop_dates_always_resolve(
            month in 1u32..=12,
            year in 2000i32..2100,
            closing_day in 1u8..=31,
            due_day in 1u8..=31,
        ) {
            let period = BillingPeriod { month, year };
            prop_assert!(period.closing_date(closing_day).is_ok());
            prop_assert!(period.due_date(closing_day, due_day).is_ok());
        }
    }
}
