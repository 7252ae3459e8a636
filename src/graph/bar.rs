//! Bar chart of the mean of Y for each distinct X.

use super::{Chart, ChartData, ChartKind, numeric_column};
use crate::cell::CellValue;
use crate::error::ChartError;
use crate::table::Table;
use std::cmp::Ordering;
use std::collections::HashMap;

pub(super) fn validate(table: &Table, x: &str, y: &str) -> Result<(), ChartError> {
    table.column(x)?;
    numeric_column(table, y, ChartKind::Bar)?;
    Ok(())
}

/// Groups rows by X and averages Y within each group.
///
/// Rows with a missing X are ignored, and a group whose Y values are all
/// missing gets no bar. Neither does a group whose mean is not finite.
/// Groups come out in ascending key order.
pub(super) fn compute(table: &Table, x: &str, y: &str) -> Result<Chart, ChartError> {
    let keys = &table.column(x)?.values;
    let values = &numeric_column(table, y, ChartKind::Bar)?.values;

    let mut groups: HashMap<&CellValue, (f64, usize)> = HashMap::new();
    for (key, value) in keys.iter().zip(values) {
        if key.is_null() {
            continue;
        }
        if let Some(v) = value.as_f64() {
            // running mean, a plain sum overflows near f64::MAX
            let (mean, n) = groups.entry(key).or_insert((0.0, 0));
            *n += 1;
            *mean += v / *n as f64 - *mean / *n as f64;
        }
    }

    let mut groups: Vec<(&CellValue, f64)> = groups
        .into_iter()
        .map(|(key, (mean, _))| (key, mean))
        .filter(|(_, mean)| mean.is_finite())
        .collect();
    groups.sort_by(|a, b| compare_keys(a.0, b.0));

    let (labels, means) = groups
        .into_iter()
        .map(|(key, mean)| (key.to_string(), mean))
        .unzip();

    Ok(Chart {
        kind: ChartKind::Bar,
        title: "Bar Chart (Mean Aggregation)".to_string(),
        x_label: x.to_string(),
        y_label: format!("Mean of {}", y),
        data: ChartData::Bars {
            labels,
            values: means,
        },
    })
}

fn compare_keys(a: &CellValue, b: &CellValue) -> Ordering {
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.total_cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_datetime(), b.as_datetime()) {
        return a.cmp(&b);
    }
    a.to_string().cmp(&b.to_string())
}
