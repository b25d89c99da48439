use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error(transparent)]
    Core(#[from] tabula_core::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Unsupported value for export: {0}")]
    UnsupportedValue(&'static str),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T, E = IoError> = std::result::Result<T, E>;
