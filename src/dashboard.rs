//! Headline metrics for the dashboard view.

use crate::graph::{Chart, ChartData, ChartKind};
use crate::stats;
use crate::summary;
use crate::table::Table;
use serde::Serialize;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Metric {
    pub label: &'static str,
    pub value: usize,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Dashboard {
    pub metrics: Vec<Metric>,
    /// Mean of every numeric column that has at least one value and a
    /// finite mean.
    pub numeric_means: Vec<(String, f64)>,
}

impl Dashboard {
    pub fn from_table(table: &Table) -> Self {
        let metrics = vec![
            Metric {
                label: "Rows",
                value: table.row_count(),
            },
            Metric {
                label: "Columns",
                value: table.column_count(),
            },
            Metric {
                label: "Missing Values",
                value: summary::missing_count(table),
            },
        ];
        let numeric_means = table
            .numeric_columns()
            .into_iter()
            .filter_map(|c| {
                let mean = stats::mean(&c.numeric_values()).filter(|m| m.is_finite())?;
                Some((c.name.clone(), mean))
            })
            .collect();
        Dashboard {
            metrics,
            numeric_means,
        }
    }

    pub fn metric(&self, label: &str) -> Option<usize> {
        self.metrics.iter().find(|m| m.label == label).map(|m| m.value)
    }

    /// Bar chart of the column means, or `None` when there is nothing to plot.
    pub fn chart(&self) -> Option<Chart> {
        if self.numeric_means.is_empty() {
            return None;
        }
        let (labels, values) = self.numeric_means.iter().cloned().unzip();
        Some(Chart {
            kind: ChartKind::Bar,
            title: "Average of Numeric Columns".to_string(),
            x_label: "Column".to_string(),
            y_label: "Mean".to_string(),
            data: ChartData::Bars { labels, values },
        })
    }
}
