//! Summary computation over a loaded table.
//!
//! Everything here is a pure function of the table.

use crate::cell::{CellValue, ColumnType};
use crate::stats;
use crate::table::{Column, Table};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Dataset-level counts.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub missing: usize,
    pub duplicates: usize,
}

/// Per-column line of the column report.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ColumnInfo {
    pub index: usize,
    pub name: String,
    pub column_type: ColumnType,
    pub dtype: &'static str,
    pub non_null: usize,
}

/// Descriptive statistics of a numeric column.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NumericStats {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Descriptive statistics of a text column.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CategoricalStats {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: Option<usize>,
}

/// Everything shown after a successful upload.
#[derive(Clone, Debug, Serialize)]
pub struct SummaryReport {
    pub overview: Overview,
    pub columns: Vec<ColumnInfo>,
    pub numeric_columns: Vec<String>,
    pub info: String,
    pub numeric: Vec<NumericStats>,
    pub categorical: Vec<CategoricalStats>,
}

impl SummaryReport {
    /// Builds every section of the summary in one pass over the table.
    ///
    /// # Arguments
    /// * `table` - The loaded table
    ///
    /// # Returns
    /// * `SummaryReport` - Overview counts, column info and per-column statistics
    ///
    /// # Examples
    /// ```
    /// use analyzer::loader::load_table;
    /// use analyzer::summary::SummaryReport;
    ///
    /// let table = load_table("t.csv", b"n,name\n1,a\n2,\n").unwrap();
    /// let report = SummaryReport::from_table(&table);
    /// assert_eq!(report.overview.rows, 2);
    /// assert_eq!(report.overview.missing, 1);
    /// assert_eq!(report.numeric_columns, vec!["n"]);
    /// ```
    pub fn from_table(table: &Table) -> Self {
        SummaryReport {
            overview: overview(table),
            columns: column_info(table),
            numeric_columns: table
                .numeric_columns()
                .into_iter()
                .map(|c| c.name.clone())
                .collect(),
            info: info_text(table),
            numeric: numeric_stats(table),
            categorical: categorical_stats(table),
        }
    }
}

pub fn overview(table: &Table) -> Overview {
    Overview {
        rows: table.row_count(),
        columns: table.column_count(),
        missing: missing_count(table),
        duplicates: duplicate_count(table),
    }
}

pub fn missing_count(table: &Table) -> usize {
    table.columns().map(Column::null_count).sum()
}

/// Rows that exactly repeat an earlier row. Nulls compare equal.
pub fn duplicate_count(table: &Table) -> usize {
    let mut seen = HashSet::with_capacity(table.row_count());
    (0..table.row_count())
        .filter(|&r| !seen.insert(table.row(r)))
        .count()
}

pub fn column_info(table: &Table) -> Vec<ColumnInfo> {
    table
        .columns()
        .enumerate()
        .map(|(index, c)| ColumnInfo {
            index,
            name: c.name.clone(),
            column_type: c.column_type,
            dtype: c.column_type.dtype(),
            non_null: c.non_null_count(),
        })
        .collect()
}

/// Plain-text column report in a fixed-width layout.
pub fn info_text(table: &Table) -> String {
    let infos = column_info(table);
    let rows = table.row_count();
    let name_width = infos
        .iter()
        .map(|i| i.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Column".len());

    let mut lines = Vec::with_capacity(infos.len() + 5);
    lines.push(match rows {
        0 => "RangeIndex: 0 entries".to_string(),
        n => format!("RangeIndex: {} entries, 0 to {}", n, n - 1),
    });
    lines.push(format!("Data columns (total {} columns):", infos.len()));
    lines.push(format!(
        " #   {:<name_width$}  Non-Null Count  Dtype",
        "Column",
        name_width = name_width
    ));
    lines.push(format!(
        "---  {:<name_width$}  --------------  -----",
        "------",
        name_width = name_width
    ));
    for info in &infos {
        lines.push(format!(
            " {:<3} {:<name_width$}  {:<14}  {}",
            info.index,
            info.name,
            format!("{} non-null", info.non_null),
            info.dtype,
            name_width = name_width
        ));
    }

    let mut tally: Vec<(&'static str, usize)> = Vec::new();
    for info in &infos {
        match tally.iter_mut().find(|(d, _)| *d == info.dtype) {
            Some((_, n)) => *n += 1,
            None => tally.push((info.dtype, 1)),
        }
    }
    tally.sort();
    let dtypes: Vec<String> = tally.iter().map(|(d, n)| format!("{}({})", d, n)).collect();
    lines.push(format!("dtypes: {}", dtypes.join(", ")));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn numeric_stats(table: &Table) -> Vec<NumericStats> {
    table
        .numeric_columns()
        .into_iter()
        .map(|c| {
            let values = c.numeric_values();
            let sorted = stats::sorted(&values);
            NumericStats {
                column: c.name.clone(),
                count: values.len(),
                mean: stats::mean(&values),
                std: stats::std_dev(&values),
                min: sorted.first().copied(),
                q25: stats::quantile(&sorted, 0.25),
                q50: stats::quantile(&sorted, 0.5),
                q75: stats::quantile(&sorted, 0.75),
                max: sorted.last().copied(),
            }
        })
        .collect()
}

/// Statistics for text and boolean columns. The most frequent value wins;
/// among equally frequent values the one seen first wins.
pub fn categorical_stats(table: &Table) -> Vec<CategoricalStats> {
    table
        .columns()
        .filter(|c| matches!(c.column_type, ColumnType::Text | ColumnType::Boolean))
        .map(|c| {
            let counts = value_counts(&c.values);
            let top = counts.first();
            CategoricalStats {
                column: c.name.clone(),
                count: c.non_null_count(),
                unique: counts.len(),
                top: top.map(|(v, _)| v.to_string()),
                freq: top.map(|(_, n)| *n),
            }
        })
        .collect()
}

/// Frequency of each non-null value, most frequent first, ties in order of
/// first appearance.
pub fn value_counts(values: &[CellValue]) -> Vec<(&CellValue, usize)> {
    let mut index: HashMap<&CellValue, usize> = HashMap::new();
    let mut counts: Vec<(&CellValue, usize)> = Vec::new();
    for v in values.iter().filter(|v| !v.is_null()) {
        match index.get(v) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(v, counts.len());
                counts.push((v, 1));
            }
        }
    }
    // stable sort keeps first-appearance order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
