//! Series slice selectors.
//!
//! A series is addressed as an explicit range over (series id, ordinal)
//! rather than an owning collection: this is what makes "delete future
//! occurrences only" a plain range query.

use serde::{Deserialize, Serialize};

/// Which members of a series an update or delete applies to, anchored at one
/// member's ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesScope {
    /// Only the anchor transaction.
    #[default]
    This,
    /// Every member of the series.
    All,
    /// The anchor and every later ordinal.
    #[serde(rename = "future")]
    ThisAndFuture,
    /// The anchor and every earlier ordinal.
    #[serde(rename = "past")]
    ThisAndPast,
}

impl SeriesScope {
    /// Whether a member with `candidate` ordinal is selected, anchored at
    /// `anchor`.
    #[must_use]
    pub const fn includes(self, anchor: u32, candidate: u32) -> bool {
        match self {
            Self::This => candidate == anchor,
            Self::All => true,
            Self::ThisAndFuture => candidate >= anchor,
            Self::ThisAndPast => candidate <= anchor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SeriesScope::This, 3, &[3])]
    #[case(SeriesScope::All, 3, &[1, 2, 3, 4, 5])]
    #[case(SeriesScope::ThisAndFuture, 3, &[3, 4, 5])]
    #[case(SeriesScope::ThisAndPast, 3, &[1, 2, 3])]
    fn test_scope_selection(
        #[case] scope: SeriesScope,
        #[case] anchor: u32,
        #[case] expected: &[u32],
    ) {
        let selected: Vec<u32> = (1..=5).filter(|&o| scope.includes(anchor, o)).collect();
        assert_eq!(selected, expected);
    }

    #[test]
    fn test_anchor_always_included() {
        for scope in [
            SeriesScope::This,
            SeriesScope::All,
            SeriesScope::ThisAndFuture,
            SeriesScope::ThisAndPast,
        ] {
            assert!(scope.includes(7, 7));
        }
    }

    #[test]
    fn test_default_is_this() {
        assert_eq!(SeriesScope::default(), SeriesScope::This);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::from_str::<SeriesScope>("\"future\"").unwrap(),
            SeriesScope::ThisAndFuture
        );
        assert_eq!(
            serde_json::from_str::<SeriesScope>("\"past\"").unwrap(),
            SeriesScope::ThisAndPast
        );
        assert_eq!(
            serde_json::from_str::<SeriesScope>("\"all\"").unwrap(),
            SeriesScope::All
        );
    }
}
