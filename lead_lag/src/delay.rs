//! Delay between a reference direction change and the candidate bar that follows it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{align::AlignedRow, direction::Direction};

/// Delay statistics for one reference direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayRecord {
    pub direction: Direction,
    pub mean_delay_seconds: f64,
    /// Reference bar of the first agreeing row in this direction.
    pub representative_reference_time: DateTime<Utc>,
    /// Candidate bar of the first agreeing row in this direction.
    pub representative_candidate_time: DateTime<Utc>,
    /// Number of agreeing rows averaged.
    pub samples: usize,
}

/// Rows where the candidate moved in the same (defined) direction as the reference.
pub fn agreeing_rows(rows: &[AlignedRow]) -> Vec<AlignedRow> {
    rows.iter()
        .filter(|r| r.candidate_direction.agrees_with(r.reference_direction))
        .cloned()
        .collect()
}

/// Seconds from the reference bar to the candidate bar, with millisecond precision.
pub fn delay_seconds(row: &AlignedRow) -> f64 {
    (row.candidate_timestamp - row.reference_change_timestamp).num_milliseconds() as f64 / 1000.0
}

struct Group {
    total: f64,
    samples: usize,
    reference_time: DateTime<Utc>,
    candidate_time: DateTime<Utc>,
}

/// Groups agreeing rows by reference direction and averages their delays.
///
/// Groups come out in the order their direction first appears; the
/// representative times are those of the group's first row.
pub fn summarize_delays(agreeing: &[AlignedRow]) -> Vec<DelayRecord> {
    let mut groups: IndexMap<Direction, Group> = IndexMap::new();
    for row in agreeing {
        let delay = delay_seconds(row);
        groups
            .entry(row.reference_direction)
            .and_modify(|g| {
                g.total += delay;
                g.samples += 1;
            })
            .or_insert(Group {
                total: delay,
                samples: 1,
                reference_time: row.reference_change_timestamp,
                candidate_time: row.candidate_timestamp,
            });
    }

    groups
        .into_iter()
        .map(|(direction, g)| DelayRecord {
            direction,
            mean_delay_seconds: g.total / g.samples as f64,
            representative_reference_time: g.reference_time,
            representative_candidate_time: g.candidate_time,
            samples: g.samples,
        })
        .collect()
}
