use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Domain(#[from] gerot_core::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Maps unique-constraint violations onto `Conflict`, leaving other errors untouched.
    pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Error::Conflict(format!("{} already exists", what));
            }
        }
        Error::Sqlx(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
