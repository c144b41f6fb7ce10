//! Review access error types.

use thiserror::Error;

use crate::db::StoreError;

/// Errors that can occur while accessing reviews.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Missing, malformed, forged or expired token, or a token for an unknown user.
    #[error("authentication required")]
    Unauthenticated,

    /// The requester does not own the review.
    #[error("{0}")]
    Forbidden(String),

    /// No review with the requested id.
    #[error("{0}")]
    NotFound(String),

    /// A request parameter could not be interpreted.
    #[error("{0}")]
    InvalidArgument(String),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
