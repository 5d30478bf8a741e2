//! Operation error taxonomy.
//!
//! Hard failures (validation, access denied, dangling identifier pairs,
//! backend faults) surface as `ChartError`. Soft failures, such as a
//! referenced chart simply not existing, surface as `Ok(None)` or
//! `Ok(false)` from
//! the individual operations, so callers must check the payload as well as
//! the `Result`.

use crate::validate::ValidationErrors;

/// Result alias used across the crate's operations.
pub type Result<T> = std::result::Result<T, ChartError>;

/// Error type for chart and graph operations.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// The acting identity is missing or lacks the required permission.
    #[error("access denied: {0}")]
    AccessDenied(&'static str),
    /// A supplied chart or graph identifier did not resolve.
    #[error("bad identifiers: {0}")]
    BadIdentifiers(&'static str),
    /// Input was rejected by the validation pipeline.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// The storage backend failed.
    #[error("store error: {0}")]
    Store(String),
}

impl ChartError {
    /// Wrap a storage backend error.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }
}
