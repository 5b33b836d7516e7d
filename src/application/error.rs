use thiserror::Error;

use crate::gledger::GLedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MissingParameters(String),

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to create gLedger record (status {status})")]
    LedgerRejected {
        status: u16,
        details: serde_json::Value,
    },

    #[error("Failed to delete gLedger record (status {status})")]
    LedgerDeleteRejected {
        status: u16,
        details: serde_json::Value,
    },

    #[error("gLedger unavailable: {0}")]
    LedgerUnavailable(#[from] GLedgerError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn missing(message: impl Into<String>) -> Self {
        AppError::MissingParameters(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.into())
    }
}
