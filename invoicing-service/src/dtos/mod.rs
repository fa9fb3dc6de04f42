//! Request payloads accepted by the invoicing operations.

mod accounts;
mod clients;
mod invoices;

pub use accounts::CreateAccountRequest;
pub use clients::{ClientRequest, ListClientsParams};
pub use invoices::{
    CreateInvoiceRequest, InvoiceItemRequest, ListInvoicesParams, UpdateInvoiceRequest,
    UpdateInvoiceStatusRequest,
};
