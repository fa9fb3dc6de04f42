//! Error taxonomy for invoicing operations.

use service_core::error::AppError;
use thiserror::Error;

/// Failure of an invoicing operation.
///
/// Every variant names the precondition that failed; HTTP handlers convert
/// these into [`AppError`] for the response.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Wrong id, wrong account, or soft-deleted record.
    #[error("{0}")]
    NotFound(String),

    #[error("monthly invoice limit of {limit} reached for the free plan")]
    QuotaExceeded { limit: i32 },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    InvalidOperation(String),

    /// A unique value (e.g. an account email) is already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("failed to render invoice document: {0}")]
    Render(anyhow::Error),

    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}

impl InvoiceError {
    pub fn not_found(what: &str) -> Self {
        InvoiceError::NotFound(format!("{} not found", what))
    }

    /// Label used for the `invoicing_errors_total` metric.
    pub fn error_type(&self) -> &'static str {
        match self {
            InvoiceError::NotFound(_) => "not_found",
            InvoiceError::QuotaExceeded { .. } => "quota_exceeded",
            InvoiceError::InvalidInput(_) => "invalid_input",
            InvoiceError::InvalidTransition(_) => "invalid_transition",
            InvoiceError::InvalidOperation(_) => "invalid_operation",
            InvoiceError::Conflict(_) => "conflict",
            InvoiceError::Render(_) => "render",
            InvoiceError::Storage(_) => "storage",
        }
    }
}

impl From<validator::ValidationErrors> for InvoiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        InvoiceError::InvalidInput(err.to_string())
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            e @ InvoiceError::QuotaExceeded { .. } => AppError::Forbidden(anyhow::anyhow!(e.to_string())),
            InvoiceError::InvalidInput(msg)
            | InvoiceError::InvalidTransition(msg)
            | InvoiceError::InvalidOperation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            InvoiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            InvoiceError::Render(e) => AppError::InternalError(e),
            InvoiceError::Storage(e) => AppError::DatabaseError(e),
        }
    }
}
