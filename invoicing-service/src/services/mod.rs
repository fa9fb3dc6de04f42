//! Services module for invoicing-service.

pub mod accounts;
pub mod clients;
pub mod database;
pub mod error;
pub mod invoices;
pub mod lifecycle;
pub mod metrics;
pub mod numbering;
pub mod pagination;
pub mod pdf;
pub mod plan;
pub mod pricing;

pub use accounts::AccountService;
pub use clients::ClientService;
pub use database::Database;
pub use error::InvoiceError;
pub use invoices::InvoiceService;
pub use metrics::{get_metrics, init_metrics};
