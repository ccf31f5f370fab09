//! Spreadsheet I/O for recipient tables
//!
//! Reading goes through calamine (`.xlsx`, `.xls`); filtered exports are
//! written with rust_xlsxwriter.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::SheetError;
pub use reader::{read_table, read_table_from_bytes};
pub use writer::{table_to_xlsx_bytes, write_table};

/// File extensions accepted as recipient spreadsheets
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// True when `filename` has a supported spreadsheet extension
pub fn is_supported_file(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}
