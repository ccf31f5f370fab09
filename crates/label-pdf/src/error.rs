use label_core::LabelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to load font: {0}")]
    FontLoad(String),

    #[error("Failed to encode page content: {0}")]
    Content(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

impl From<PdfError> for LabelError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Write(msg) => LabelError::OutputWrite(msg),
            other => LabelError::Render(other.to_string()),
        }
    }
}
