//! Correlation heatmap over every numeric column.

use super::{Chart, ChartData, ChartKind};
use crate::error::ChartError;
use crate::stats;
use crate::table::Table;
use serde::Serialize;

/// Pairwise Pearson correlations, row-major in column order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }

    /// Every cell as `(row, col, value)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Option<f64>)> + '_ {
        self.values
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, *v)))
    }
}

pub(super) fn validate(table: &Table) -> Result<(), ChartError> {
    let found = table.numeric_columns().len();
    if found < 2 {
        return Err(ChartError::InsufficientColumns { found });
    }
    Ok(())
}

pub(super) fn compute(table: &Table) -> Result<Chart, ChartError> {
    Ok(Chart {
        kind: ChartKind::Heatmap,
        title: "Correlation Heatmap".to_string(),
        x_label: String::new(),
        y_label: String::new(),
        data: ChartData::Heatmap(correlate(table)),
    })
}

/// Each pair is correlated over the rows where both columns have a value.
fn correlate(table: &Table) -> CorrelationMatrix {
    let columns = table.numeric_columns();
    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| c.values.iter().map(|v| v.as_f64()).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let pairs: Vec<(f64, f64)> = series[i]
                .iter()
                .zip(&series[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .collect();
            let r = stats::pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        values,
    }
}
