use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("GeRot API error: {0}")]
    Api(String),

    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("Query timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Query(#[from] gerot_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
