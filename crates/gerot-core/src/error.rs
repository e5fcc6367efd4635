use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Query rejected: {0}")]
    QueryRejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
