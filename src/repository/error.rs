#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] diesel::result::Error),

    #[error("Failed to get a database connection: {message}")]
    PoolError { message: String },

    #[error("Internal database error: {message}")]
    InternalError { message: String },
}
