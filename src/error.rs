//! Error taxonomy.
//!
//! None of these errors is fatal: a failed load degrades to an empty catalog,
//! a missing identifier turns the click into a no-op, and a failed submission
//! leaves the selection untouched so the user may retry.

use crate::RenderId;
use thiserror::Error;

/// Failure reported by a [`DataService`](crate::DataService) implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}")]
    Status { status: u16 },
    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The service answered with an `{error: ...}` body.
    #[error("service error: {0}")]
    Backend(String),
    /// The request was refused locally and never sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Catalog unavailable or malformed.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("catalog load failed: {reason}")]
pub struct LoadFailure {
    pub reason: String,
}

impl LoadFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<ServiceError> for LoadFailure {
    fn from(e: ServiceError) -> Self {
        LoadFailure::new(e.to_string())
    }
}

/// Errors raised by the selection coordinator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectionError {
    /// The struck feature carries no stable identifier and cannot be selected.
    #[error("feature {render_id} has no identifier attribute")]
    MissingIdentifier { render_id: RenderId },
}

/// Errors raised by the submission gateway.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    /// Nothing is selected; no request was sent.
    #[error("no segments selected")]
    EmptySelection,
    /// The backend or the transport failed; the selection is unchanged.
    #[error("submission failed: {cause}")]
    SubmissionFailure { cause: String },
}

impl From<ServiceError> for SubmitError {
    fn from(e: ServiceError) -> Self {
        SubmitError::SubmissionFailure { cause: e.to_string() }
    }
}
