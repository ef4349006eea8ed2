//! Error types for forecast-wizard
//!
//! Client errors come from talking to the backend; wizard errors come from
//! driving the wizard itself. Neither is fatal to a session: callers turn
//! them into user-visible state.

use crate::models::FieldErrors;
use thiserror::Error;

/// Forecast backend client errors
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connection refused, timeout, TLS...
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Backend answered 404 for the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    /// HTTP status for API-level errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(status, _) => Some(*status),
            ClientError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

/// Wizard driving errors
#[derive(Debug, Error)]
pub enum WizardError {
    /// Step completion check failed
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Operation not available on the current step
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    /// Request body could not be built from the frozen parameters
    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    /// Job creation request failed
    #[error("Submission failed: {0}")]
    Submission(#[source] ClientError),

    /// Operation needs a submitted job
    #[error("No forecast job has been submitted")]
    NotSubmitted,

    /// Results requested for a job that has not completed
    #[error("Results unavailable: {0}")]
    ResultsUnavailable(String),

    /// Backend error outside submission (dataset lookup, results...)
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Result type for wizard operations
pub type WizardResult<T> = Result<T, WizardError>;
