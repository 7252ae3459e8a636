use crate::cell::{CellValue, ColumnType};
use crate::error::TableError;
use serde::Serialize;
use std::sync::Arc;

/// A named, typed column of cell values.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            column_type,
            values,
        }
    }

    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_null()).count()
    }

    pub fn null_count(&self) -> usize {
        self.values.len() - self.non_null_count()
    }

    /// Non-null numeric values in row order. Empty for non-numeric columns.
    pub fn numeric_values(&self) -> Vec<f64> {
        if !self.column_type.is_numeric() {
            return Vec::new();
        }
        self.values.iter().filter_map(CellValue::as_f64).collect()
    }
}

/// An uploaded table.
///
/// Columns are shared behind `Arc` so that projections are narrowed views
/// over the same data. A table is never mutated once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<Arc<Column>>,
    rows: usize,
}

/// First rows of a table, ready to be shown as a grid.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Builds a table from columns of equal length.
    pub fn new(columns: Vec<Column>) -> Self {
        let rows = columns.first().map_or(0, |c| c.values.len());
        debug_assert!(columns.iter().all(|c| c.values.len() == rows));
        Table {
            columns: columns.into_iter().map(Arc::new).collect(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().map(|c| c.as_ref())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns()
            .filter(|c| c.column_type.is_numeric())
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.as_ref())
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    /// Cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Narrows the table to the selected columns.
    ///
    /// An empty selection returns the whole table. Otherwise the result holds
    /// exactly the selected columns in the table's own column order; every
    /// name must exist.
    pub fn project(&self, selected: &[String]) -> Result<Table, TableError> {
        if selected.is_empty() {
            return Ok(self.clone());
        }
        if let Some(missing) = selected
            .iter()
            .find(|name| !self.columns.iter().any(|c| &c.name == *name))
        {
            return Err(TableError::UnknownColumn(missing.clone()));
        }

        let columns = self
            .columns
            .iter()
            .filter(|c| selected.contains(&c.name))
            .cloned()
            .collect();
        Ok(Table {
            columns,
            rows: self.rows,
        })
    }

    /// Returns a table whose boolean columns have been rewritten as text.
    pub fn with_booleans_as_text(self) -> Table {
        let columns = self
            .columns
            .into_iter()
            .map(|column| {
                if column.column_type != ColumnType::Boolean {
                    return column;
                }
                let values = column
                    .values
                    .iter()
                    .map(|v| match v {
                        CellValue::Bool(_) => CellValue::Text(v.to_string()),
                        other => other.clone(),
                    })
                    .collect();
                Arc::new(Column::new(column.name.clone(), ColumnType::Text, values))
            })
            .collect();
        Table {
            columns,
            rows: self.rows,
        }
    }

    pub fn head(&self, n: usize) -> Preview {
        let take = n.min(self.rows);
        Preview {
            columns: self.column_names(),
            rows: (0..take)
                .map(|r| self.row(r).into_iter().cloned().collect())
                .collect(),
        }
    }
}
