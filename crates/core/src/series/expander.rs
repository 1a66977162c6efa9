//! Intent expansion.
//!
//! A single submitted transaction intent expands into 1..N occurrence specs.
//! Installments carry their ordinal directly on each occurrence (`i/n`
//! description suffix, no series row); recurring occurrences reference a
//! series row by id and 1-based ordinal, created by the caller before
//! persisting the batch.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::error::SeriesError;
use super::schedule::months_ahead;
use crate::ledger::TransactionKind;

/// Default horizon for a recurring intent with no explicit occurrence count.
pub const DEFAULT_RECURRING_OCCURRENCES: u32 = 12;

/// How an intent repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// A single concrete transaction.
    Single,
    /// A fixed installment set; every occurrence carries the full declared
    /// amount.
    Installments {
        /// Total number of installments.
        total: u32,
    },
    /// A monthly recurring schedule.
    Recurring {
        /// Number of occurrences to materialize; defaults to
        /// [`DEFAULT_RECURRING_OCCURRENCES`].
        occurrences: Option<u32>,
    },
}

/// A user-submitted transaction intent, before expansion.
#[derive(Debug, Clone)]
pub struct TransactionIntent {
    /// Description template.
    pub description: String,
    /// Amount (positive).
    pub amount: Decimal,
    /// Income, expense, or transfer.
    pub kind: TransactionKind,
    /// Accrual date of the first occurrence.
    pub accrual_date: NaiveDate,
    /// Settlement date of the first occurrence, if any.
    pub settlement_date: Option<NaiveDate>,
    /// Requested paid flag; only the first occurrence may honor it.
    pub paid: bool,
    /// How the intent repeats.
    pub recurrence: Recurrence,
}

/// One concrete transaction produced from an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceSpec {
    /// Final description (suffixed/annotated past the first occurrence).
    pub description: String,
    /// Amount.
    pub amount: Decimal,
    /// Accrual date of this occurrence.
    pub accrual_date: NaiveDate,
    /// Settlement date of this occurrence, if the intent had one.
    pub settlement_date: Option<NaiveDate>,
    /// Paid flag (forced false past the first occurrence).
    pub paid: bool,
    /// 1-based ordinal within a recurring series; `None` for single and
    /// installment occurrences.
    pub series_ordinal: Option<u32>,
    /// `(number, total)` for installment occurrences; `None` otherwise.
    pub installment: Option<(u32, u32)>,
}

/// Expands an intent into its occurrence specs.
///
/// # Errors
///
/// Returns [`SeriesError::ZeroOccurrences`] for empty installment/recurring
/// counts and [`SeriesError::DateOutOfRange`] if the schedule walks off the
/// calendar.
pub fn expand(intent: &TransactionIntent) -> Result<Vec<OccurrenceSpec>, SeriesError> {
    match intent.recurrence {
        Recurrence::Single => Ok(vec![OccurrenceSpec {
            description: intent.description.clone(),
            amount: intent.amount,
            accrual_date: intent.accrual_date,
            settlement_date: intent.settlement_date,
            paid: intent.paid,
            series_ordinal: None,
            installment: None,
        }]),
        Recurrence::Installments { total } => expand_installments(intent, total),
        Recurrence::Recurring { occurrences } => {
            expand_recurring(intent, occurrences.unwrap_or(DEFAULT_RECURRING_OCCURRENCES))
        }
    }
}

fn expand_installments(
    intent: &TransactionIntent,
    total: u32,
) -> Result<Vec<OccurrenceSpec>, SeriesError> {
    if total == 0 {
        return Err(SeriesError::ZeroOccurrences);
    }

    let mut specs = Vec::with_capacity(total as usize);
    for i in 0..total {
        let number = i + 1;
        specs.push(OccurrenceSpec {
            description: format!("{} {number}/{total}", intent.description),
            amount: intent.amount,
            accrual_date: months_ahead(intent.accrual_date, i)?,
            settlement_date: intent
                .settlement_date
                .map(|d| months_ahead(d, i))
                .transpose()?,
            paid: intent.paid && i == 0,
            series_ordinal: None,
            installment: Some((number, total)),
        });
    }
    Ok(specs)
}

fn expand_recurring(
    intent: &TransactionIntent,
    occurrences: u32,
) -> Result<Vec<OccurrenceSpec>, SeriesError> {
    if occurrences == 0 {
        return Err(SeriesError::ZeroOccurrences);
    }

    let mut specs = Vec::with_capacity(occurrences as usize);
    for i in 0..occurrences {
        let accrual_date = months_ahead(intent.accrual_date, i)?;
        let description = if i == 0 {
            intent.description.clone()
        } else {
            format!(
                "{} ({:02}/{})",
                intent.description,
                accrual_date.month(),
                accrual_date.year()
            )
        };
        specs.push(OccurrenceSpec {
            description,
            amount: intent.amount,
            accrual_date,
            settlement_date: intent
                .settlement_date
                .map(|d| months_ahead(d, i))
                .transpose()?,
            paid: intent.paid && i == 0,
            series_ordinal: Some(i + 1),
            installment: None,
        });
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn intent(recurrence: Recurrence) -> TransactionIntent {
        TransactionIntent {
            description: "Gym".to_string(),
            amount: dec!(300),
            kind: TransactionKind::Expense,
            accrual_date: date(2025, 1, 15),
            settlement_date: None,
            paid: true,
            recurrence,
        }
    }

    #[test]
    fn test_single_expands_to_one() {
        let specs = expand(&intent(Recurrence::Single)).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].description, "Gym");
        assert!(specs[0].paid);
        assert_eq!(specs[0].series_ordinal, None);
        assert_eq!(specs[0].installment, None);
    }

    #[test]
    fn test_installments_three_of_three() {
        let specs = expand(&intent(Recurrence::Installments { total: 3 })).unwrap();
        assert_eq!(specs.len(), 3);

        assert_eq!(specs[0].description, "Gym 1/3");
        assert_eq!(specs[1].description, "Gym 2/3");
        assert_eq!(specs[2].description, "Gym 3/3");

        assert_eq!(specs[0].accrual_date, date(2025, 1, 15));
        assert_eq!(specs[1].accrual_date, date(2025, 2, 15));
        assert_eq!(specs[2].accrual_date, date(2025, 3, 15));

        // Each occurrence carries the full declared amount.
        assert!(specs.iter().all(|s| s.amount == dec!(300)));
        // Only the first may start as paid.
        assert!(specs[0].paid);
        assert!(!specs[1].paid);
        assert!(!specs[2].paid);

        assert_eq!(specs[0].installment, Some((1, 3)));
        assert_eq!(specs[2].installment, Some((3, 3)));
        assert!(specs.iter().all(|s| s.series_ordinal.is_none()));
    }

    #[test]
    fn test_installments_zero_rejected() {
        let result = expand(&intent(Recurrence::Installments { total: 0 }));
        assert_eq!(result, Err(SeriesError::ZeroOccurrences));
    }

    #[test]
    fn test_recurring_annotates_later_occurrences() {
        let specs = expand(&intent(Recurrence::Recurring {
            occurrences: Some(3),
        }))
        .unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].description, "Gym");
        assert_eq!(specs[1].description, "Gym (02/2025)");
        assert_eq!(specs[2].description, "Gym (03/2025)");

        assert_eq!(specs[0].series_ordinal, Some(1));
        assert_eq!(specs[1].series_ordinal, Some(2));
        assert_eq!(specs[2].series_ordinal, Some(3));
    }

    #[test]
    fn test_recurring_later_occurrences_unpaid() {
        let specs = expand(&intent(Recurrence::Recurring {
            occurrences: Some(4),
        }))
        .unwrap();
        assert!(specs[0].paid);
        assert!(specs[1..].iter().all(|s| !s.paid));
    }

    #[test]
    fn test_recurring_default_horizon() {
        let specs = expand(&intent(Recurrence::Recurring { occurrences: None })).unwrap();
        assert_eq!(specs.len(), DEFAULT_RECURRING_OCCURRENCES as usize);
    }

    #[test]
    fn test_recurring_month_end_clamps() {
        let mut i = intent(Recurrence::Recurring {
            occurrences: Some(3),
        });
        i.accrual_date = date(2025, 1, 31);
        let specs = expand(&i).unwrap();

        assert_eq!(specs[0].accrual_date, date(2025, 1, 31));
        assert_eq!(specs[1].accrual_date, date(2025, 2, 28));
        assert_eq!(specs[2].accrual_date, date(2025, 3, 31));
    }

    #[test]
    fn test_settlement_date_advances_with_occurrence() {
        let mut i = intent(Recurrence::Installments { total: 2 });
        i.settlement_date = Some(date(2025, 1, 20));
        let specs = expand(&i).unwrap();
        assert_eq!(specs[0].settlement_date, Some(date(2025, 1, 20)));
        assert_eq!(specs[1].settlement_date, Some(date(2025, 2, 20)));
    }

    #[test]
    fn test_unpaid_intent_first_occurrence_stays_unpaid() {
        let mut i = intent(Recurrence::Installments { total: 2 });
        i.paid = false;
        let specs = expand(&i).unwrap();
        assert!(specs.iter().all(|s| !s.paid));
    }
}
