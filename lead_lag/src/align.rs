//! Backward asof alignment of a candidate series onto the reference timeline.
//!
//! Each candidate bar is paired with the latest reference bar whose timestamp is
//! at or before its own. Nothing is interpolated and nothing is looked up ahead;
//! candidate bars older than the whole reference series are dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::direction::{DirectedBar, Direction};

/// A candidate bar joined to its asof reference bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    pub candidate_timestamp: DateTime<Utc>,
    pub candidate_close: f64,
    pub candidate_direction: Direction,
    pub reference_direction: Direction,
    /// Timestamp of the matched reference bar; never after `candidate_timestamp`.
    pub reference_change_timestamp: DateTime<Utc>,
}

impl AlignedRow {
    fn join(reference: &DirectedBar, candidate: &DirectedBar) -> Self {
        Self {
            candidate_timestamp: candidate.timestamp(),
            candidate_close: candidate.close(),
            candidate_direction: candidate.direction,
            reference_direction: reference.direction,
            reference_change_timestamp: reference.timestamp(),
        }
    }
}

/// Forward-only cursor answering "latest item at or before `at`" over a sorted slice.
///
/// Queries must come in non-decreasing order of `at`; each item is passed at
/// most once, so a full scan is O(n + m).
pub struct AsofCursor<'a, T, F> {
    items: &'a [T],
    key: F,
    next: usize,
}

impl<'a, T, F> AsofCursor<'a, T, F>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    pub fn new(items: &'a [T], key: F) -> Self {
        Self {
            items,
            key,
            next: 0,
        }
    }

    pub fn seek(&mut self, at: DateTime<Utc>) -> Option<&'a T> {
        while self.next < self.items.len() && (self.key)(&self.items[self.next]) <= at {
            self.next += 1;
        }
        self.next.checked_sub(1).map(|i| &self.items[i])
    }
}

/// Aligns with a single forward pass over both sorted sequences.
pub fn align(reference: &[DirectedBar], candidate: &[DirectedBar]) -> Vec<AlignedRow> {
    let mut cursor = AsofCursor::new(reference, DirectedBar::timestamp);
    candidate
        .iter()
        .filter_map(|c| cursor.seek(c.timestamp()).map(|r| AlignedRow::join(r, c)))
        .collect()
}

/// Aligns by binary-searching the reference for every candidate bar.
///
/// Produces exactly the same rows as [`align`].
pub fn align_by_search(reference: &[DirectedBar], candidate: &[DirectedBar]) -> Vec<AlignedRow> {
    candidate
        .iter()
        .filter_map(|c| {
            let upper = reference.partition_point(|r| r.timestamp() <= c.timestamp());
            upper
                .checked_sub(1)
                .map(|i| AlignedRow::join(&reference[i], c))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use market_data_ingestor::models::bar::Bar;
    use proptest::prelude::*;

    use crate::direction::{FirstBarPolicy, classify};

    use super::*;

    fn directed(points: &[(i64, f64)]) -> Vec<DirectedBar> {
        let bars: Vec<Bar> = points
            .iter()
            .map(|(secs, close)| Bar::flat(Utc.timestamp_opt(*secs, 0).unwrap(), *close))
            .collect();
        classify(&bars, FirstBarPolicy::Undefined)
    }

    fn secs(ts: DateTime<Utc>) -> i64 {
        ts.timestamp()
    }

    #[test]
    fn matches_latest_reference_at_or_before() {
        let reference = directed(&[(0, 100.0), (60, 105.0), (120, 103.0)]);
        let candidate = directed(&[(60, 1.0), (70, 2.0), (500, 3.0)]);

        let rows = align(&reference, &candidate);

        let pairs: Vec<(i64, i64)> = rows
            .iter()
            .map(|r| (secs(r.candidate_timestamp), secs(r.reference_change_timestamp)))
            .collect();
        assert_eq!(pairs, vec![(60, 60), (70, 60), (500, 120)]);
        assert_eq!(rows[1].reference_direction, Direction::Up);
        assert_eq!(rows[2].reference_direction, Direction::Down);
    }

    #[test]
    fn drops_candidate_bars_before_reference() {
        let reference = directed(&[(100, 1.0), (200, 2.0)]);
        let candidate = directed(&[(10, 1.0), (50, 2.0), (150, 3.0)]);

        let rows = align(&reference, &candidate);
        assert_eq!(rows.len(), 1);
        assert_eq!(secs(rows[0].candidate_timestamp), 150);
    }

    #[test]
    fn empty_inputs_give_empty_output() {
        let some = directed(&[(0, 1.0)]);
        assert!(align(&[], &some).is_empty());
        assert!(align(&some, &[]).is_empty());
        assert!(align_by_search(&[], &some).is_empty());
    }

    #[test]
    fn tolerates_different_granularities() {
        // hourly reference, 15-minute candidate
        let reference = directed(&[(0, 10.0), (3600, 11.0), (7200, 12.0)]);
        let candidate: Vec<(i64, f64)> = (0..10).map(|i| (i * 900, 1.0 + i as f64)).collect();
        let candidate = directed(&candidate);

        let rows = align(&reference, &candidate);
        assert_eq!(rows.len(), 10);
        assert_eq!(secs(rows[3].reference_change_timestamp), 0);
        assert_eq!(secs(rows[4].reference_change_timestamp), 3600);
        assert_eq!(secs(rows[9].reference_change_timestamp), 7200);
    }

    fn series_strategy() -> impl Strategy<Value = Vec<(i64, f64)>> {
        (
            proptest::collection::btree_set(0i64..5_000, 0..40),
            proptest::collection::vec(1.0f64..1_000.0, 40),
        )
            .prop_map(|(ts, closes)| ts.into_iter().zip(closes).collect())
    }

    proptest! {
        #[test]
        fn cursor_and_search_agree(reference in series_strategy(), candidate in series_strategy()) {
            let reference = directed(&reference);
            let candidate = directed(&candidate);
            prop_assert_eq!(align(&reference, &candidate), align_by_search(&reference, &candidate));
        }

        #[test]
        fn never_looks_ahead(reference in series_strategy(), candidate in series_strategy()) {
            let reference = directed(&reference);
            let candidate = directed(&candidate);
            for row in align(&reference, &candidate) {
                prop_assert!(row.reference_change_timestamp <= row.candidate_timestamp);
                // no reference bar sits strictly between the match and the candidate
                let skipped_closer = reference.iter().any(|r| {
                    r.timestamp() > row.reference_change_timestamp
                        && r.timestamp() <= row.candidate_timestamp
                });
                prop_assert!(!skipped_closer);
            }
        }

        #[test]
        fn keeps_every_candidate_bar_with_a_reference_before_it(
            reference in series_strategy(),
            candidate in series_strategy(),
        ) {
            let reference = directed(&reference);
            let candidate = directed(&candidate);
            let expected = match reference.first() {
                Some(first) => candidate.iter().filter(|c| c.timestamp() >= first.timestamp()).count(),
                None => 0,
            };
            prop_assert_eq!(align(&reference, &candidate).len(), expected);
        }
    }
}
