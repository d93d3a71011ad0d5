//! Shared xlsx writing helpers.

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::path::Path;

use crate::error::{Result, SpreadsheetError};

/// A header cell and its column width.
pub(crate) type Column<'a> = (&'a str, f64);

/// Add a named sheet with a bold header row. Data starts at row 1.
pub(crate) fn sheet_with_header<'a>(
    workbook: &'a mut Workbook,
    name: &str,
    columns: &[Column<'_>],
) -> std::result::Result<&'a mut Worksheet, XlsxError> {
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;

    for (col, (header, width)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &bold)?;
        sheet.set_column_width(col, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    Ok(sheet)
}

pub(crate) fn save(workbook: &mut Workbook, path: &Path) -> Result<()> {
    workbook.save(path).map_err(|source| SpreadsheetError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_error(path: &Path) -> impl FnOnce(XlsxError) -> SpreadsheetError + '_ {
    move |source| SpreadsheetError::Write {
        path: path.to_path_buf(),
        source,
    }
}
