//! Pie chart of the most frequent values of one column.

use super::{Chart, ChartData, ChartKind};
use crate::error::ChartError;
use crate::summary::value_counts;
use crate::table::Table;
use serde::Serialize;

/// How many of the most frequent values get a slice.
pub const PIE_TOP_CATEGORIES: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
    /// Share of the kept slices, in percent.
    pub percent: f64,
}

pub(super) fn validate(table: &Table, x: &str) -> Result<(), ChartError> {
    table.column(x)?;
    Ok(())
}

pub(super) fn compute(table: &Table, x: &str) -> Result<Chart, ChartError> {
    let counts = value_counts(&table.column(x)?.values);
    let kept = &counts[..counts.len().min(PIE_TOP_CATEGORIES)];
    let total: usize = kept.iter().map(|(_, n)| n).sum();

    let slices = kept
        .iter()
        .map(|(value, count)| PieSlice {
            label: value.to_string(),
            count: *count,
            percent: *count as f64 * 100.0 / total as f64,
        })
        .collect();

    Ok(Chart {
        kind: ChartKind::Pie,
        title: format!("Pie Chart (Top {})", PIE_TOP_CATEGORIES),
        x_label: x.to_string(),
        y_label: String::new(),
        data: ChartData::Pie(slices),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellValue, ColumnType};
    use crate::table::Column;

    #[test]
    fn keeps_top_ten_and_shares_the_kept_total() {
        // value i appears i + 1 times
        let values: Vec<CellValue> = (0..12)
            .flat_map(|i| std::iter::repeat_n(CellValue::Int(i), i as usize + 1))
            .collect();
        let table = Table::new(vec![Column::new("n", ColumnType::Integer, values)]);

        let chart = compute(&table, "n").unwrap();
        assert_eq!(chart.title, "Pie Chart (Top 10)");
        let ChartData::Pie(slices) = chart.data else {
            panic!("expected pie data");
        };
        assert_eq!(slices.len(), PIE_TOP_CATEGORIES);
        assert_eq!(slices[0].label, "11");
        assert_eq!(slices[0].count, 12);
        assert_eq!(slices[9].label, "2");
        let sum: f64 = slices.iter().map(|s| s.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn all_null_column_has_no_slices() {
        let table = Table::new(vec![Column::new(
            "t",
            ColumnType::Text,
            vec![CellValue::Null, CellValue::Null],
        )]);
        let chart = compute(&table, "t").unwrap();
        assert_eq!(chart.data, ChartData::Pie(Vec::new()));
    }
}
