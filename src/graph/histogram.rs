//! Histogram of a single numeric column.

use super::{Chart, ChartData, ChartKind, numeric_column};
use crate::error::ChartError;
use crate::table::Table;

/// Number of equal-width bins.
pub const HISTOGRAM_BINS: usize = 20;

pub(super) fn validate(table: &Table, y: &str) -> Result<(), ChartError> {
    numeric_column(table, y, ChartKind::Histogram).map(|_| ())
}

pub(super) fn compute(table: &Table, y: &str) -> Result<Chart, ChartError> {
    let values: Vec<f64> = numeric_column(table, y, ChartKind::Histogram)?
        .numeric_values()
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();
    let (edges, counts) = bin(&values, HISTOGRAM_BINS);

    Ok(Chart {
        kind: ChartKind::Histogram,
        title: "Histogram".to_string(),
        x_label: y.to_string(),
        y_label: "Count".to_string(),
        data: ChartData::Histogram { edges, counts },
    })
}

/// Splits the value range into `bins` equal intervals. The last interval is
/// closed on the right so the maximum is counted.
///
/// Widths are taken as `hi / bins - lo / bins` so ranges near `f64::MAX` do
/// not overflow.
fn bin(values: &[f64], bins: usize) -> (Vec<f64>, Vec<usize>) {
    let (lo, hi) = match values.iter().copied().fold(None, |acc: Option<(f64, f64)>, v| {
        Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
    }) {
        None => (0.0, 1.0),
        Some((lo, hi)) if lo == hi => {
            let half = 0.5_f64.max(lo.abs() * f64::EPSILON);
            (lo - half, hi + half)
        }
        Some(range) => range,
    };

    let n = bins as f64;
    let width = hi / n - lo / n;
    let edges = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect();
    let mut counts = vec![0; bins];
    for v in values {
        let i = ((v / width - lo / width) as usize).min(bins - 1);
        counts[i] += 1;
    }
    (edges, counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_value_lands_in_a_bin() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let (edges, counts) = bin(&values, HISTOGRAM_BINS);
        assert_eq!(edges.len(), 21);
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[20], 100.0);
        assert_eq!(counts.iter().sum::<usize>(), 101);
        assert_eq!(counts[19], 6);
    }

    #[test]
    fn constant_values_get_a_unit_range() {
        let (edges, counts) = bin(&[4.0, 4.0, 4.0], 20);
        assert_eq!(edges[0], 3.5);
        assert_eq!(edges[20], 4.5);
        assert_eq!(counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn no_values_still_produce_bins() {
        let (edges, counts) = bin(&[], 20);
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[20], 1.0);
        assert!(counts.iter().all(|&c| c == 0));
    }

    #[test]
    fn extreme_ranges_keep_finite_edges() {
        let (edges, counts) = bin(&[-1e308, 1e308], HISTOGRAM_BINS);
        assert!(edges.iter().all(|e| e.is_finite()));
        assert_eq!(edges[0], -1e308);
        assert_eq!(edges[20], 1e308);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[19], 1);
    }

    #[test]
    fn large_constant_values_still_get_a_range() {
        let (edges, counts) = bin(&[1e308, 1e308], HISTOGRAM_BINS);
        assert!(edges[0] < 1e308 && edges[20] > 1e308 && edges[20].is_finite());
        assert_eq!(counts.iter().sum::<usize>(), 2);
    }
}
