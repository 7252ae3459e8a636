//! Line and scatter charts.

use super::{AxisScale, Chart, ChartData, ChartKind, XySeries};
use crate::cell::{CellValue, ColumnType};
use crate::error::ChartError;
use crate::table::{Column, Table};

pub(super) fn validate(table: &Table, x: &str, y: &str) -> Result<(), ChartError> {
    table.column(x)?;
    table.column(y)?;
    Ok(())
}

/// Pairs the two columns row by row. Rows where either side is missing or
/// infinite are left out.
pub(super) fn compute(table: &Table, x: &str, y: &str, kind: ChartKind) -> Result<Chart, ChartError> {
    let x_column = table.column(x)?;
    let y_column = table.column(y)?;

    let (xs, x_scale) = encode(x_column);
    let (ys, y_scale) = encode(y_column);
    let points = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .filter(|(x, y): &(f64, f64)| x.is_finite() && y.is_finite())
        .collect();

    let series = XySeries {
        points,
        x_scale,
        y_scale,
    };
    let (title, data) = match kind {
        ChartKind::Line => (format!("Line Graph Of {} Vs {}", x, y), ChartData::Line(series)),
        _ => (
            format!("Scatter Graph Of {} Vs {}", x, y),
            ChartData::Scatter(series),
        ),
    };

    Ok(Chart {
        kind,
        title,
        x_label: x.to_string(),
        y_label: y.to_string(),
        data,
    })
}

/// Maps every cell of a column onto a plot coordinate.
fn encode(column: &Column) -> (Vec<Option<f64>>, AxisScale) {
    match column.column_type {
        ColumnType::Integer | ColumnType::Float => (
            column.values.iter().map(CellValue::as_f64).collect(),
            AxisScale::Numeric,
        ),
        ColumnType::DateTime => (
            column
                .values
                .iter()
                .map(|v| v.as_datetime().map(|d| d.and_utc().timestamp() as f64))
                .collect(),
            AxisScale::Temporal,
        ),
        ColumnType::Boolean | ColumnType::Text => {
            let mut labels: Vec<String> = Vec::new();
            let positions = column
                .values
                .iter()
                .map(|v| {
                    if v.is_null() {
                        return None;
                    }
                    let label = v.to_string();
                    let position = match labels.iter().position(|l| *l == label) {
                        Some(p) => p,
                        None => {
                            labels.push(label);
                            labels.len() - 1
                        }
                    };
                    Some(position as f64)
                })
                .collect();
            (positions, AxisScale::Categorical(labels))
        }
    }
}
