use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("store not ready")]
    NotReady,
    #[error("record {0} not found")]
    NotFound(u64),
    #[error("failed to open store: {0}")]
    StoreOpen(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
