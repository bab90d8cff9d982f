use thiserror::Error;

pub mod load_history;

pub use load_history::{HistoricalLoad, SqlLoadHistoryRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}
