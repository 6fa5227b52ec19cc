use thiserror::Error;

/// Failures surfaced by the storage layer.
///
/// Every operation that addresses a missing user or task reports it as a
/// typed variant instead of silently no-op-ing, so handlers can pick the
/// right user-facing message and status.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already registered")]
    AlreadyExists,

    /// Unknown user and wrong password are deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("no such user")]
    UserNotFound,

    #[error("no such task")]
    TaskNotFound,

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}
