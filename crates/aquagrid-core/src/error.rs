use thiserror::Error;

/// Failure to read a record collection. Individual malformed records are
/// sanitized, never reported; only unreadable input surfaces here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("record JSON is not parseable: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document is missing its unique code")]
    MissingCode,

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialisation failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store backend error: {message}")]
    Backend { message: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export buffer was not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("surface of {width}×{height} px cannot be allocated")]
    InvalidSize { width: u32, height: u32 },
}
