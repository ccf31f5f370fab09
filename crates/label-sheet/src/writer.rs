//! Filtered export to `.xlsx`, keeping every column in its original order

use label_core::{CellValue, Table};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

use crate::error::SheetError;

fn xlsx_error(err: XlsxError) -> SheetError {
    SheetError::Write(err.to_string())
}

fn build_workbook(table: &Table) -> Result<Workbook, SheetError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns.iter().enumerate() {
        let col = column_index(col)?;
        worksheet
            .write_string_with_format(0, col, name, &header_format)
            .map_err(xlsx_error)?;
    }

    for (row_idx, record) in table.rows.iter().enumerate() {
        let row = u32::try_from(row_idx + 1)
            .map_err(|_| SheetError::Write(format!("row index overflow: {}", row_idx)))?;
        for (col, name) in table.columns.iter().enumerate() {
            let col = column_index(col)?;
            match record.get(name) {
                CellValue::Number(n) if n.is_finite() => {
                    worksheet.write_number(row, col, *n).map_err(xlsx_error)?;
                }
                CellValue::Text(s) if !s.is_empty() => {
                    worksheet.write_string(row, col, s).map_err(xlsx_error)?;
                }
                _ => {}
            }
        }
    }
    Ok(workbook)
}

fn column_index(col: usize) -> Result<u16, SheetError> {
    u16::try_from(col).map_err(|_| SheetError::Write(format!("column index overflow: {}", col)))
}

/// Write `table` to an `.xlsx` file at `path`
pub fn write_table(table: &Table, path: &Path) -> Result<(), SheetError> {
    let mut workbook = build_workbook(table)?;
    workbook.save(path).map_err(xlsx_error)?;
    tracing::info!("Exported {} records to {}", table.len(), path.display());
    Ok(())
}

/// Serialize `table` as an `.xlsx` workbook in memory
pub fn table_to_xlsx_bytes(table: &Table) -> Result<Vec<u8>, SheetError> {
    let mut workbook = build_workbook(table)?;
    workbook.save_to_buffer().map_err(xlsx_error)
}
