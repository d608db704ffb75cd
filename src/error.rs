//! Service error taxonomy
//!
//! Only [`ServiceError::Configuration`] may abort startup. The other variants
//! are caught where they occur and turned into diagnostics.

use thiserror::Error;

use crate::http::RouteError;
use crate::storage::InitError;

/// Errors raised while bringing the service up
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A single optional capability failed to resolve
    #[error("capability '{name}' unavailable: {reason}")]
    CapabilityUnavailable { name: String, reason: String },

    /// Deferred heavy initialization failed; the service continues degraded
    #[error("deferred initialization failed: {0}")]
    InitializationFailure(#[from] InitError),

    /// The required route set (or the configuration itself) is unusable
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Whether this error must stop the service from reaching Ready
    pub fn is_fatal(&self) -> bool {
        matches!(self, ServiceError::Configuration(_))
    }
}

impl From<RouteError> for ServiceError {
    fn from(e: RouteError) -> Self {
        ServiceError::Configuration(e.to_string())
    }
}
