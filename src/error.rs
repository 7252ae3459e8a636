//! Error types for each stage of the pipeline.

use crate::graph::ChartKind;
use crate::loader::FileFormat;
use thiserror::Error;

/// Failure to turn an upload into a table.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("unsupported file format `{extension}`, expected .csv or .xlsx")]
    UnsupportedFormat { extension: String },

    #[error("could not read `{filename}` as a {format} file: {source}")]
    Read {
        filename: String,
        format: FileFormat,
        #[source]
        source: ReadFailure,
    },
}

/// Underlying cause attached to [`IntakeError::Read`].
#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] calamine::XlsxError),

    #[error("no columns to parse from file")]
    NoColumns,

    #[error("workbook contains no worksheets")]
    NoSheets,

    #[error("expected {expected} fields in line {line}, saw {found}")]
    RaggedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("column `{0}` does not exist")]
    UnknownColumn(String),
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("column `{column}` must be numeric for a {kind} chart")]
    NotNumeric { column: String, kind: ChartKind },

    #[error("need at least 2 numeric columns for heatmap, found {found}")]
    InsufficientColumns { found: usize },

    #[error("failed to render chart: {0}")]
    Render(String),
}

impl ChartError {
    /// Warnings abort only the chart being drawn and are shown to the user
    /// as such rather than as failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, ChartError::InsufficientColumns { .. })
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for ChartError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ChartError::Render(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv output is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported export format `{0}`, expected csv or xlsx")]
    UnsupportedFormat(String),
}
