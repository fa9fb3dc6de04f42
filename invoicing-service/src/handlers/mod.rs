pub mod accounts;
pub mod clients;
pub mod health;
pub mod invoices;

use crate::services::metrics::ERRORS_TOTAL;
use crate::services::InvoiceError;
use service_core::error::AppError;

pub use health::{health_check, metrics_handler, readiness_check};

/// Count the failure and convert it for the response.
pub(crate) fn app_error(err: InvoiceError) -> AppError {
    ERRORS_TOTAL.with_label_values(&[err.error_type()]).inc();
    AppError::from(err)
}
