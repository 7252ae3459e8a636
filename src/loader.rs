//! File intake: turns uploaded bytes into a [`Table`].

use crate::cell::{CellValue, ColumnType};
use crate::error::{IntakeError, ReadFailure};
use crate::table::{Column, Table};
use calamine::{Data, Reader, Xlsx};
use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Tabular formats accepted for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Picks the format from the filename extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self, IntakeError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(IntakeError::UnsupportedFormat { extension }),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => f.write_str("CSV"),
            FileFormat::Xlsx => f.write_str("Excel"),
        }
    }
}

/// Tokens read as missing values in CSV input.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_VALUES: &[&str] = &["True", "TRUE", "true"];
const FALSE_VALUES: &[&str] = &["False", "FALSE", "false"];

/// Detect file type and load the appropriate format.
///
/// Boolean columns are rewritten as text before the table is returned, so
/// they are summarized as categories rather than numbers. Nothing is
/// returned on failure; a bad upload never yields a partial table.
///
/// # Arguments
/// * `filename` - Name of the uploaded file, its extension picks the parser
/// * `bytes` - Raw file content
///
/// # Returns
/// * `Result<Table, IntakeError>` - The typed table, or why it could not be read
///
/// # Examples
/// ```
/// use analyzer::loader::load_table;
///
/// let table = load_table("people.csv", b"id,name\n1,ada\n2,alan\n").unwrap();
/// assert_eq!(table.row_count(), 2);
/// assert!(load_table("people.txt", b"").is_err());
/// ```
pub fn load_table(filename: &str, bytes: &[u8]) -> Result<Table, IntakeError> {
    let format = FileFormat::from_filename(filename)?;

    let parsed = match format {
        FileFormat::Csv => from_csv(bytes),
        FileFormat::Xlsx => from_excel(bytes),
    };

    match parsed {
        Ok(table) => {
            log::info!(
                "loaded `{}` ({}): {} rows x {} columns",
                filename,
                format,
                table.row_count(),
                table.column_count()
            );
            Ok(table.with_booleans_as_text())
        }
        Err(source) => {
            log::warn!("could not read `{}` as {}: {}", filename, format, source);
            Err(IntakeError::Read {
                filename: filename.to_string(),
                format,
                source,
            })
        }
    }
}

/// Parse CSV bytes. The first record is the header.
pub fn from_csv(bytes: &[u8]) -> Result<Table, ReadFailure> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(ReadFailure::NoColumns);
    }
    let names = header_names(headers.into_iter().map(Some));

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for result in reader.records() {
        let record = result?;
        if record.len() > names.len() {
            return Err(ReadFailure::RaggedRecord {
                line: record.position().map_or(0, |p| p.line()),
                expected: names.len(),
                found: record.len(),
            });
        }
        for (c, column) in raw.iter_mut().enumerate() {
            let field = record.get(c).filter(|f| !NA_VALUES.contains(f));
            column.push(field.map(str::to_string));
        }
    }

    let columns = names
        .into_iter()
        .zip(raw)
        .map(|(name, values)| infer_csv_column(name, values))
        .collect();
    Ok(Table::new(columns))
}

fn infer_csv_column(name: String, raw: Vec<Option<String>>) -> Column {
    let present = || raw.iter().flatten().map(|s| s.as_str());

    if present().next().is_none() {
        let values = raw.iter().map(|_| CellValue::Null).collect();
        return Column::new(name, ColumnType::Float, values);
    }

    if present().all(|s| s.trim().parse::<i64>().is_ok()) {
        let values = convert(&raw, |s| s.trim().parse().ok().map(CellValue::Int));
        return Column::new(name, ColumnType::Integer, values);
    }

    if present().all(|s| s.trim().parse::<f64>().is_ok()) {
        // any spelling of NaN that f64 accepts is a missing value
        let values = convert(&raw, |s| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| !f.is_nan())
                .map(CellValue::Float)
        });
        return Column::new(name, ColumnType::Float, values);
    }

    if present().all(|s| TRUE_VALUES.contains(&s) || FALSE_VALUES.contains(&s)) {
        let values = convert(&raw, |s| Some(CellValue::Bool(TRUE_VALUES.contains(&s))));
        return Column::new(name, ColumnType::Boolean, values);
    }

    let values = convert(&raw, |s| Some(CellValue::Text(s.to_string())));
    Column::new(name, ColumnType::Text, values)
}

fn convert(raw: &[Option<String>], parse: impl Fn(&str) -> Option<CellValue>) -> Vec<CellValue> {
    raw.iter()
        .map(|v| v.as_deref().and_then(&parse).unwrap_or(CellValue::Null))
        .collect()
}

/// Parse an Excel workbook. Only the first worksheet is read and its first
/// row is the header.
pub fn from_excel(bytes: &[u8]) -> Result<Table, ReadFailure> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ReadFailure::NoSheets)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(ReadFailure::NoColumns)?;
    let names = header_names(header.iter().map(header_text));
    if names.is_empty() {
        return Err(ReadFailure::NoColumns);
    }

    let mut raw: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (c, column) in raw.iter_mut().enumerate() {
            column.push(row.get(c).map_or(CellValue::Null, excel_value));
        }
    }

    let columns = names
        .into_iter()
        .zip(raw)
        .map(|(name, values)| infer_excel_column(name, values))
        .collect();
    Ok(Table::new(columns))
}

fn header_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        other => Some(excel_value(other).to_string()),
    }
}

fn excel_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) if f.is_nan() => CellValue::Null,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => CellValue::Int(*f as i64),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map_or(CellValue::Float(dt.as_f64()), CellValue::DateTime),
        Data::DateTimeIso(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map_or_else(|_| CellValue::Text(s.clone()), CellValue::DateTime),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

fn infer_excel_column(name: String, values: Vec<CellValue>) -> Column {
    let present = || values.iter().filter(|v| !v.is_null());

    let column_type = if present().next().is_none() {
        ColumnType::Float
    } else if present().all(|v| matches!(v, CellValue::Int(_))) {
        ColumnType::Integer
    } else if present().all(|v| v.as_f64().is_some()) {
        ColumnType::Float
    } else if present().all(|v| matches!(v, CellValue::Bool(_))) {
        ColumnType::Boolean
    } else if present().all(|v| matches!(v, CellValue::DateTime(_))) {
        ColumnType::DateTime
    } else {
        ColumnType::Text
    };

    let values = match column_type {
        ColumnType::Float => values
            .into_iter()
            .map(|v| v.as_f64().map_or(CellValue::Null, CellValue::Float))
            .collect(),
        ColumnType::Text => values
            .into_iter()
            .map(|v| match v {
                CellValue::Null | CellValue::Text(_) => v,
                other => CellValue::Text(other.to_string()),
            })
            .collect(),
        _ => values,
    };
    Column::new(name, column_type, values)
}

/// Fills blank header names and disambiguates repeated ones
/// (`a`, `a.1`, `a.2`, ...).
fn header_names(raw: impl Iterator<Item = Option<String>>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::new();

    for (i, name) in raw.enumerate() {
        let base = match name {
            Some(n) if !n.is_empty() => n,
            _ => format!("Unnamed: {}", i),
        };
        let mut candidate = base.clone();
        let mut suffix = 0;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}.{}", base, suffix);
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }

    names
}
