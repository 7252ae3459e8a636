use analyzer::downloader::{to_csv, to_xlsx};
use analyzer::error::{IntakeError, ReadFailure};
use analyzer::loader::{FileFormat, load_table};
use analyzer::{CellValue, ColumnType};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

fn workbook_bytes() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (c, name) in ["id", "price", "when", "label", "mixed", "flag"].iter().enumerate() {
        sheet.write_string(0, c as u16, *name).unwrap();
    }
    for r in 1..=3u32 {
        sheet.write_number(r, 0, r as f64).unwrap();
        sheet.write_number(r, 1, r as f64 * 1.5).unwrap();
        // 2024-01-01 is serial 45292
        sheet
            .write_number_with_format(r, 2, 45291.0 + r as f64, &date_format)
            .unwrap();
        sheet.write_string(r, 3, &format!("item {}", r)).unwrap();
        sheet.write_boolean(r, 5, r % 2 == 1).unwrap();
    }
    sheet.write_number(1, 4, 7.0).unwrap();
    sheet.write_string(2, 4, "seven").unwrap();

    // second sheet is never read
    let other = workbook.add_worksheet();
    other.write_string(0, 0, "ignored").unwrap();

    workbook.save_to_buffer().unwrap()
}

#[test]
fn csv_columns_get_their_types() {
    let csv = b"id,score,name,active,empty\n1,2.5,ann,true,\n2,NA,,False,\n3,4,bob,TRUE,\n";
    let table = load_table("scores.CSV", csv).unwrap();

    let types: Vec<ColumnType> = table.columns().map(|c| c.column_type).collect();
    assert_eq!(
        types,
        vec![
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Text,
            // booleans are summarized as text
            ColumnType::Text,
            ColumnType::Float,
        ]
    );
    assert_eq!(table.column("score").unwrap().values[1], CellValue::Null);
    assert_eq!(
        table.column("active").unwrap().values[1],
        CellValue::Text("False".into())
    );
    assert_eq!(table.column("empty").unwrap().null_count(), 3);
}

#[test]
fn excel_reads_first_sheet_with_dates_and_mixed_columns() {
    let table = load_table("book.xlsx", &workbook_bytes()).unwrap();
    assert_eq!(
        table.column_names(),
        vec!["id", "price", "when", "label", "mixed", "flag"]
    );
    assert_eq!(table.row_count(), 3);

    assert_eq!(table.column("id").unwrap().column_type, ColumnType::Integer);
    assert_eq!(table.column("price").unwrap().column_type, ColumnType::Float);
    assert_eq!(table.column("label").unwrap().column_type, ColumnType::Text);

    let when = table.column("when").unwrap();
    assert_eq!(when.column_type, ColumnType::DateTime);
    let first = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(when.values[0], CellValue::DateTime(first));

    let mixed = table.column("mixed").unwrap();
    assert_eq!(mixed.column_type, ColumnType::Text);
    assert_eq!(
        mixed.values,
        vec![
            CellValue::Text("7".into()),
            CellValue::Text("seven".into()),
            CellValue::Null
        ]
    );

    assert_eq!(table.column("flag").unwrap().column_type, ColumnType::Text);
}

#[test]
fn unsupported_and_unreadable_files() {
    match load_table("notes.txt", b"hello") {
        Err(IntakeError::UnsupportedFormat { extension }) => assert_eq!(extension, "txt"),
        other => panic!("unexpected result {:?}", other.map(|t| t.row_count())),
    }
    assert!(matches!(
        load_table("README", b""),
        Err(IntakeError::UnsupportedFormat { .. })
    ));

    match load_table("broken.xlsx", b"not a zip archive") {
        Err(IntakeError::Read { format, source, .. }) => {
            assert_eq!(format, FileFormat::Xlsx);
            assert!(matches!(source, ReadFailure::Xlsx(_)));
        }
        other => panic!("unexpected result {:?}", other.map(|t| t.row_count())),
    }

    assert!(matches!(
        load_table("ragged.csv", b"a,b\n1,2,3\n"),
        Err(IntakeError::Read {
            source: ReadFailure::RaggedRecord { .. },
            ..
        })
    ));
}

#[test]
fn csv_export_reads_back_identically() {
    let csv = "id,name,active,note\n1,ann,True,\"a, b\"\n2,,False,x\n3,cy,True,\n";
    let table = load_table("people.csv", csv.as_bytes()).unwrap();
    let exported = to_csv(&table).unwrap();
    assert_eq!(exported, csv);
    assert_eq!(load_table("again.csv", exported.as_bytes()).unwrap(), table);
}

#[test]
fn xlsx_export_reads_back_identically() {
    let table = load_table("book.xlsx", &workbook_bytes()).unwrap();
    let selected = table
        .project(&["id".to_string(), "when".to_string(), "label".to_string(), "flag".to_string()])
        .unwrap();
    let bytes = to_xlsx(&selected).unwrap();
    let reread = load_table("export.xlsx", &bytes).unwrap();
    assert_eq!(reread, selected);
}
