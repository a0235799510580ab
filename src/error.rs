use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Fetch failure: {0}")]
    FetchFailure(#[from] reqwest::Error),

    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse failure class used by the batch driver and the store retry helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fetch,
    Parse,
    Storage,
    Other,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::FetchFailure(_) => ErrorKind::Fetch,
            AppError::ParseFailure(_) | AppError::Json(_) => ErrorKind::Parse,
            AppError::StorageUnavailable(_) => ErrorKind::Storage,
            AppError::Migration(_) | AppError::Config(_) => ErrorKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
