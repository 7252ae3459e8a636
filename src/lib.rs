/*!
# Data Analyzer

A browser-based tool for exploring an uploaded CSV or Excel file, built in Rust.

## Overview

A visitor uploads one file. The server parses it into an in-memory table,
infers a type for every column, and answers questions about that table:
descriptive statistics, a column projection, charts and a small dashboard.
Nothing is persisted; the table lives in the visitor's session until it is
replaced, reset or expires.

## Pipeline

upload → validate → summarize → project → visualize

- **Intake** (`loader`): extension dispatch, CSV and first-sheet XLSX parsing,
  per-column type inference
- **Summary** (`summary`, `stats`): overview counts, column report,
  numeric and categorical statistics
- **Projection** (`table`): narrowed views over a subset of columns
- **Charts** (`graph`): line, scatter, bar, histogram, pie and correlation
  heatmap, rendered to SVG
- **Dashboard** (`dashboard`): headline metrics and a chart of column means
- **Export** (`downloader`): CSV and XLSX download of a projection

## Modules

- **cell**: cell values and column types
- **table**: the immutable table and its projections
- **loader**: file intake
- **stats**: mean, deviation, quantiles, correlation
- **summary**: summary report
- **graph**: chart requests, computation and rendering
- **dashboard**: dashboard metrics
- **downloader**: export (CSV, XLSX)
- **error**: error types per stage
- **session**: per-visitor state (web feature)
- **config**: server configuration (web feature)
- **app**: routing and handlers (web feature)

## REST API Endpoints

- `POST /api/upload` - Parses the uploaded file and returns its summary
- `GET /api/summary` - Summary of the current table
- `POST /api/columns` - Preview of a column projection
- `POST /api/chart` - SVG chart for a chart request
- `GET /api/dashboard`, `GET /api/dashboard/chart` - Dashboard metrics and chart
- `POST /api/export?format=csv|xlsx` - Download a projection
- `POST /api/reset` - Forget the current table
*/

pub mod cell;
pub mod dashboard;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod stats;
pub mod summary;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod session;

pub use cell::{CellValue, ColumnType};
pub use error::{ChartError, ExportError, IntakeError, TableError};
pub use table::{Column, Table};
