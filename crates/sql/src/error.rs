use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error(transparent)]
    Core(#[from] tabula_core::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Unsupported value for sqlite: {0}")]
    UnsupportedValue(&'static str),

    #[error("Malformed stored row: {0}")]
    MalformedRow(String),

    #[error("Cannot stage a table without columns")]
    NoColumns,
}

pub type Result<T, E = SqlError> = std::result::Result<T, E>;

impl From<SqlError> for tabula_core::Error {
    fn from(e: SqlError) -> Self {
        match e {
            SqlError::Core(inner) => inner,
            other => tabula_core::Error::external(other.to_string()),
        }
    }
}
