//! Calendar-correct month stepping.
//!
//! Occurrence dates keep the original day-of-month and advance whole
//! calendar months, clamping to the last day of shorter months. Naive
//! day arithmetic would drift: 2025-01-31 + 30 days lands in March.

use chrono::{Months, NaiveDate};

use super::error::SeriesError;

/// Returns `date` advanced by `months` calendar months, clamping the
/// day-of-month to the target month's length.
///
/// # Errors
///
/// Returns [`SeriesError::DateOutOfRange`] if the result falls outside the
/// representable calendar.
pub fn months_ahead(date: NaiveDate, months: u32) -> Result<NaiveDate, SeriesError> {
    date.checked_add_months(Months::new(months))
        .ok_or(SeriesError::DateOutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zero_months_is_identity() {
        assert_eq!(months_ahead(date(2025, 1, 15), 0).unwrap(), date(2025, 1, 15));
    }

    #[test]
    fn test_simple_month_step() {
        assert_eq!(months_ahead(date(2025, 1, 15), 1).unwrap(), date(2025, 2, 15));
        assert_eq!(months_ahead(date(2025, 1, 15), 2).unwrap(), date(2025, 3, 15));
    }

    #[test]
    fn test_month_end_clamps_not_drifts() {
        // Jan 31 + 1 month is Feb 28, never Mar 3.
        assert_eq!(months_ahead(date(2025, 1, 31), 1).unwrap(), date(2025, 2, 28));
        // And the third occurrence returns to the 31st.
        assert_eq!(months_ahead(date(2025, 1, 31), 2).unwrap(), date(2025, 3, 31));
    }

    #[test]
    fn test_leap_february() {
        assert_eq!(months_ahead(date(2024, 1, 31), 1).unwrap(), date(2024, 2, 29));
    }

    #[test]
    fn test_year_rollover() {
        assert_eq!(months_ahead(date(2025, 11, 30), 3).unwrap(), date(2026, 2, 28));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The day never exceeds the original day (clamping only shrinks).
        #[test]
        fn prop_day_never_grows(
            days in 0i64..20000,
            months in 0u32..240,
        ) {
            use chrono::Datelike;
            let start = date(1990, 1, 1) + chrono::Duration::days(days);
            let stepped = months_ahead(start, months).unwrap();
            prop_assert!(stepped.day() <= start.day());
        }

        /// Stepping i months always lands exactly i calendar months ahead.
        #[test]
        fn prop_month_delta_exact(
            days in 0i64..20000,
            months in 0u32..240,
        ) {
            use chrono::Datelike;
            let start = date(1990, 1, 1) + chrono::Duration::days(days);
            let stepped = months_ahead(start, months).unwrap();
            let start_index = start.year() * 12 + i32::try_from(start.month0()).unwrap();
            let stepped_index = stepped.year() * 12 + i32::try_from(stepped.month0()).unwrap();
            prop_assert_eq!(stepped_index - start_index, i32::try_from(months).unwrap());
        }
    }
}
