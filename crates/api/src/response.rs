//! Shared response envelope types for API handlers.
//!
//! Successful storage and session responses use a `{ "result": ... }`
//! envelope; errors are rendered by [`crate::error::AppError`].

use serde::Serialize;

/// Standard `{ "result": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct ResultResponse<T: Serialize> {
    pub result: T,
}

impl ResultResponse<&'static str> {
    /// The `{ "result": "ok" }` body returned by mutating endpoints.
    pub fn ok() -> Self {
        Self { result: "ok" }
    }
}
