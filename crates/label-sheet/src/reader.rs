//! Spreadsheet input
//!
//! The first worksheet is read; its first row names the columns and fully
//! empty rows are dropped.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use label_core::{CellValue, Record, Table};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::error::SheetError;

/// Read the first worksheet of an `.xlsx`/`.xls` file
pub fn read_table(path: &Path) -> Result<Table, SheetError> {
    if !path.exists() {
        return Err(SheetError::NotFound(path.display().to_string()));
    }
    let mut workbook =
        open_workbook_auto(path).map_err(|e| SheetError::Read(format!("{}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|e| SheetError::Read(e.to_string()))?;

    let table = range_to_table(&range);
    tracing::info!(
        "Loaded {} records with {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Read the first worksheet of an in-memory workbook
pub fn read_table_from_bytes(bytes: Vec<u8>) -> Result<Table, SheetError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| SheetError::Read(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|e| SheetError::Read(e.to_string()))?;
    Ok(range_to_table(&range))
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::default();
    };
    let columns = column_names(header);

    let mut table = Table::new(columns.clone());
    for row in rows {
        let record: Record = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), row.get(i).map(to_cell).unwrap_or_default()))
            .collect();
        if !record.is_blank() {
            table.push(record);
        }
    }
    table
}

/// Header names; blanks become `Unnamed: {i}` and repeats get a `.n` suffix
fn column_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = to_cell(cell).as_text().trim().to_string();
            let name = if name.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}
