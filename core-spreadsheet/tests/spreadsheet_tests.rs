//! Integration tests for the xlsx worklist reader and writers

use calamine::{open_workbook_auto, Data, Reader};
use core_batch::{BatchError, FailureRecord, ResultReporter, WorkItem, WorklistSource};
use core_inventory::{InventoryRow, InventorySink};
use core_runtime::config::ColumnMapping;
use core_spreadsheet::{
    ExcelWorklistSource, SpreadsheetError, XlsxFailureReporter, XlsxInventoryWriter,
};
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Write a sheet from string rows; `None` leaves the cell blank.
fn write_fixture(path: &Path, sheet: &str, rows: &[Vec<Option<&str>>]) {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(sheet).unwrap();
    for (r, cells) in rows.iter().enumerate() {
        for (c, cell) in cells.iter().enumerate() {
            if let Some(text) = cell {
                ws.write_string(r as u32, c as u16, *text).unwrap();
            }
        }
    }
    workbook.save(path).unwrap();
}

fn read_back(path: &Path, sheet: &str) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn test_reads_worklist_by_header_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worklist.xlsx");
    write_fixture(
        &path,
        "Sheet1",
        &[
            vec![Some("Folder ID"), Some("Notes"), Some("File ID"), Some("File Name")],
            vec![Some("X"), Some("first"), Some("A"), Some("a.txt")],
            vec![Some("Y"), None, None, None],
            vec![None, None, None, None],
            vec![Some("X"), None, Some("B"), Some("  ")],
        ],
    );

    let source = ExcelWorklistSource::new(&path, "Sheet1", ColumnMapping::default());
    let items = source.read_all().await.unwrap();

    assert_eq!(
        items,
        vec![
            WorkItem::new(2, "A", "X").with_display_name("a.txt"),
            WorkItem::new(3, "", "Y"),
            WorkItem::new(5, "B", "X"),
        ]
    );
}

#[tokio::test]
async fn test_name_column_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worklist.xlsx");
    write_fixture(
        &path,
        "Data",
        &[
            vec![Some("id"), Some("dest")],
            vec![Some("A"), Some("X")],
        ],
    );

    let columns = ColumnMapping {
        file_id: "id".into(),
        folder_id: "dest".into(),
        file_name: None,
    };
    let items = ExcelWorklistSource::new(&path, "Data", columns)
        .read_items()
        .unwrap();

    assert_eq!(items, vec![WorkItem::new(2, "A", "X")]);
}

#[tokio::test]
async fn test_missing_sheet_and_column_are_source_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("worklist.xlsx");
    write_fixture(&path, "Sheet1", &[vec![Some("File ID"), Some("Other")]]);

    let err = ExcelWorklistSource::new(&path, "Missing", ColumnMapping::default())
        .read_items()
        .unwrap_err();
    assert!(matches!(err, SpreadsheetError::SheetNotFound { ref available, .. } if available == &["Sheet1"]));

    let err = ExcelWorklistSource::new(&path, "Sheet1", ColumnMapping::default())
        .read_all()
        .await
        .unwrap_err();
    match err {
        BatchError::Source(message) => assert!(message.contains("Folder ID"), "{}", message),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExcelWorklistSource::new(dir.path().join("nope.xlsx"), "Sheet1", ColumnMapping::default())
        .read_all()
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::Source(_)));
}

#[tokio::test]
async fn test_failure_report_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failed.xlsx");
    let reporter = XlsxFailureReporter::new(&path, "Failed");

    reporter
        .write_failures(&[
            FailureRecord {
                row_index: 7,
                source_id: "A".into(),
                display_name: "a.txt".into(),
                error: "create failed after 5 attempt(s): 503".into(),
            },
            FailureRecord {
                row_index: 12,
                source_id: "B".into(),
                display_name: "<unresolved>".into(),
                error: "name lookup failed: 404".into(),
            },
        ])
        .await
        .unwrap();

    let rows = read_back(&path, "Failed");
    assert_eq!(rows[0], vec!["Row", "File ID", "File Name", "Error"]);
    assert_eq!(rows[1], vec!["7", "A", "a.txt", "create failed after 5 attempt(s): 503"]);
    assert_eq!(rows[2][0], "12");
    assert_eq!(rows.len(), 3);
}

fn inventory_rows() -> Vec<InventoryRow> {
    vec![
        InventoryRow {
            parent_path: String::new(),
            name: "Birds".into(),
            id: "f-birds".into(),
            size: None,
            mime_type: None,
            is_folder: true,
        },
        InventoryRow {
            parent_path: "Birds".into(),
            name: "owl.jpg".into(),
            id: "f-owl".into(),
            size: Some(2048),
            mime_type: Some("image/jpeg".into()),
            is_folder: false,
        },
    ]
}

#[tokio::test]
async fn test_inventory_folder_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("FolderList.xlsx");

    XlsxInventoryWriter::new(&path, "FileList", false)
        .write_rows(&inventory_rows())
        .await
        .unwrap();

    let rows = read_back(&path, "FileList");
    assert_eq!(rows, vec![vec!["Folder", "ID"], vec!["Birds", "f-birds"]]);
}

#[tokio::test]
async fn test_inventory_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("FolderList.xlsx");

    XlsxInventoryWriter::new(&path, "FileList", true)
        .write_rows(&inventory_rows())
        .await
        .unwrap();

    let rows = read_back(&path, "FileList");
    assert_eq!(rows[0], vec!["Path", "Name", "Size", "ID"]);
    assert_eq!(rows[1], vec!["/", "Birds", "", "f-birds"]);
    assert_eq!(rows[2], vec!["Birds", "owl.jpg", "2048", "f-owl"]);
}
