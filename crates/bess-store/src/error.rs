use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connecting to store backend: {0}")]
    Connect(String),

    #[error("running migrations: {0}")]
    Migration(String),

    #[cfg(feature = "postgres")]
    #[error("database query failed")]
    Sqlx(#[from] sqlx::Error),

    #[error("serializing row payload: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
