use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    #[error("Failed to load source data: {0}")]
    SourceLoad(String),

    #[error("No data found after applying filters")]
    NoData,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid label layout: {0}")]
    InvalidLayout(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Failed to write output: {0}")]
    OutputWrite(String),
}

impl LabelError {
    /// Stable machine-readable code for front ends
    pub fn code(&self) -> &'static str {
        match self {
            LabelError::SourceNotFound(_) => "FILE_NOT_FOUND",
            LabelError::SourceLoad(_) => "INVALID_SOURCE",
            LabelError::NoData => "NO_DATA",
            LabelError::InvalidFilter(_) => "INVALID_FILTER",
            LabelError::MissingColumn(_) => "MISSING_COLUMN",
            LabelError::InvalidLayout(_) => "INVALID_LAYOUT",
            LabelError::Render(_) => "RENDER_ERROR",
            LabelError::OutputWrite(_) => "OUTPUT_WRITE_ERROR",
        }
    }
}
