//! Re-serialization of a table (usually a projection) for download.

use crate::cell::CellValue;
use crate::error::ExportError;
use crate::table::Table;
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use std::str::FromStr;

/// File formats a table can be downloaded as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Serializes the table in the requested format.
pub fn export(table: &Table, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => Ok(to_csv(table)?.into_bytes()),
        ExportFormat::Xlsx => to_xlsx(table),
    }
}

/// Convert a table to CSV
///
/// The first record holds the column names. Missing values are written as
/// empty fields.
///
/// # Examples
/// ```
/// use analyzer::downloader::to_csv;
/// use analyzer::loader::load_table;
///
/// let table = load_table("t.csv", b"a,b\n1,x\n").unwrap();
/// assert_eq!(to_csv(&table).unwrap(), "a,b\n1,x\n");
/// ```
pub fn to_csv(table: &Table) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns().map(|c| c.name.as_str()))?;
    for r in 0..table.row_count() {
        writer.write_record(table.row(r).iter().map(|v| v.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Convert a table to a single-sheet XLSX workbook
///
/// Numbers are written as numbers and date-times as formatted date serials,
/// so reading the workbook back gives the same column types.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (c, column) in table.columns().enumerate() {
        let col = c as u16;
        worksheet.write_string(0, col, column.name.as_str())?;
        for (r, value) in column.values.iter().enumerate() {
            let row = r as u32 + 1;
            match value {
                CellValue::Null => {}
                CellValue::Int(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                CellValue::DateTime(dt) => {
                    worksheet.write_number_with_format(row, col, excel_serial(dt), &date_format)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Days since the 1900 date system epoch, with the time as a fraction.
fn excel_serial(dt: &chrono::NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .unwrap_or_default()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default();
    (*dt - epoch).num_milliseconds() as f64 / 86_400_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ColumnType;
    use crate::table::Column;

    #[test]
    fn csv_quotes_and_blanks() {
        let table = Table::new(vec![
            Column::new(
                "name",
                ColumnType::Text,
                vec![CellValue::Text("Smith, J".into()), CellValue::Null],
            ),
            Column::new("n", ColumnType::Integer, vec![CellValue::Int(3), CellValue::Int(-1)]),
        ]);
        assert_eq!(to_csv(&table).unwrap(), "name,n\n\"Smith, J\",3\n,-1\n");
    }

    #[test]
    fn format_names() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn serial_dates() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(excel_serial(&dt), 45292.5);
    }
}
