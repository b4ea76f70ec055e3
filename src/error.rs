use thiserror::Error;

/// Domain error taxonomy shared by the service layer. Conflicts and rate
/// limits are distinct from upstream faults so the API layer can pick a
/// deliberate status code for each.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("you are already following this user")]
    AlreadyFollowing,
    #[error("you are already connected with this user")]
    AlreadyConnected,
    #[error("a connection request between you is already pending")]
    RequestPending,
    #[error("connection request limit reached, try again later")]
    RateLimited,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        DomainError::InvalidInput(message.into())
    }
}
