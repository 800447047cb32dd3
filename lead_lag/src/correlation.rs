//! Linear correlation of close prices against the reference.

use market_data_ingestor::models::bar::Bar;
use serde::Serialize;

use crate::{align::AsofCursor, errors::AnalysisError};

pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.8;

/// Pearson correlation coefficient.
///
/// `None` when the slices differ in length, hold fewer than two points, or
/// either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Pairs each candidate close with the asof reference close.
///
/// Only candidate bars inside the reference window `[first, last]` are used.
/// Returns `(reference_closes, candidate_closes)` of equal length.
pub fn aligned_closes(reference: &[Bar], candidate: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let (Some(first), Some(last)) = (reference.first(), reference.last()) else {
        return (Vec::new(), Vec::new());
    };
    let mut cursor = AsofCursor::new(reference, |b: &Bar| b.timestamp);
    candidate
        .iter()
        .filter(|c| c.timestamp >= first.timestamp && c.timestamp <= last.timestamp)
        .filter_map(|c| cursor.seek(c.timestamp).map(|r| (r.close, c.close)))
        .unzip()
}

/// Correlation of a candidate's closes with the reference over their overlap.
pub fn correlation(reference: &[Bar], candidate: &[Bar]) -> Option<f64> {
    let (xs, ys) = aligned_closes(reference, candidate);
    pearson(&xs, &ys)
}

/// Keeps candidates whose correlation reaches the threshold (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationFilter {
    threshold: f64,
}

impl Default for CorrelationFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CORRELATION_THRESHOLD,
        }
    }
}

impl CorrelationFilter {
    /// The threshold must be finite and in `(-1, 1]`; at -1 the filter would admit everything.
    pub fn new(threshold: f64) -> Result<Self, AnalysisError> {
        if !threshold.is_finite() || threshold <= -1.0 || threshold > 1.0 {
            return Err(AnalysisError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn admits(&self, correlation: f64) -> bool {
        correlation >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn bars(points: &[(i64, f64)]) -> Vec<Bar> {
        points
            .iter()
            .map(|(s, c)| Bar::flat(Utc.timestamp_opt(*s, 0).unwrap(), *c))
            .collect()
    }

    #[test]
    fn perfect_and_inverse_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_cases() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[], &[]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[3.0, 3.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let filter = CorrelationFilter::default();
        assert_eq!(filter.threshold(), 0.8);
        assert!(filter.admits(0.8));
        assert!(!filter.admits(0.7999));
        assert!(filter.admits(1.0));
    }

    #[test]
    fn threshold_validation() {
        assert!(CorrelationFilter::new(0.5).is_ok());
        assert!(CorrelationFilter::new(1.0).is_ok());
        assert_eq!(
            CorrelationFilter::new(-1.0),
            Err(AnalysisError::InvalidThreshold(-1.0))
        );
        assert!(CorrelationFilter::new(1.5).is_err());
        assert!(CorrelationFilter::new(f64::NAN).is_err());
    }

    #[test]
    fn aligns_closes_within_reference_window() {
        let reference = bars(&[(100, 10.0), (200, 20.0), (300, 30.0)]);
        let candidate = bars(&[(50, 1.0), (150, 2.0), (200, 3.0), (310, 4.0)]);

        let (xs, ys) = aligned_closes(&reference, &candidate);
        assert_eq!(xs, vec![10.0, 20.0]);
        assert_eq!(ys, vec![2.0, 3.0]);
    }

    #[test]
    fn no_overlap_is_undefined() {
        let reference = bars(&[(100, 10.0), (200, 20.0)]);
        let candidate = bars(&[(0, 1.0), (50, 2.0)]);
        assert_eq!(correlation(&reference, &candidate), None);
        assert_eq!(correlation(&[], &candidate), None);
    }
}
