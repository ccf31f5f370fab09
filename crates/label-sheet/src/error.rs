use label_core::LabelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Spreadsheet not found: {0}")]
    NotFound(String),

    #[error("Failed to read spreadsheet: {0}")]
    Read(String),

    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("Failed to write spreadsheet: {0}")]
    Write(String),
}

impl From<SheetError> for LabelError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::NotFound(path) => LabelError::SourceNotFound(path),
            SheetError::Write(msg) => LabelError::OutputWrite(msg),
            other => LabelError::SourceLoad(other.to_string()),
        }
    }
}
