//! Typed errors for the PDF text pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("failed to parse pdf: {0}")]
    Parse(String),

    #[error("cache io error: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("cache metadata corrupt: {0}")]
    CacheMetadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;
