#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Well-formed request for an operation that is never allowed,
    /// e.g. deleting a sandbox root.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The human-readable message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            CoreError::BadRequest(msg)
            | CoreError::Unauthorized(msg)
            | CoreError::Forbidden(msg)
            | CoreError::NotFound(msg)
            | CoreError::Conflict(msg)
            | CoreError::InvalidRequest(msg)
            | CoreError::Internal(msg) => msg,
        }
    }

    /// Remove every occurrence of `prefix` from the message.
    ///
    /// Storage errors are raised with absolute paths; callers strip the
    /// sandbox and storage roots before the message leaves the process.
    pub fn redact(self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self;
        }
        let strip = |msg: String| msg.replace(prefix, "");
        match self {
            CoreError::BadRequest(msg) => CoreError::BadRequest(strip(msg)),
            CoreError::Unauthorized(msg) => CoreError::Unauthorized(strip(msg)),
            CoreError::Forbidden(msg) => CoreError::Forbidden(strip(msg)),
            CoreError::NotFound(msg) => CoreError::NotFound(strip(msg)),
            CoreError::Conflict(msg) => CoreError::Conflict(strip(msg)),
            CoreError::InvalidRequest(msg) => CoreError::InvalidRequest(strip(msg)),
            CoreError::Internal(msg) => CoreError::Internal(strip(msg)),
        }
    }
}
