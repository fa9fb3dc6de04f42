//! Domain models for invoicing-service.

mod account;
mod client;
mod invoice;
mod invoice_item;

pub use account::{Account, CreateAccount, FREE_TIER};
pub use client::{Client, ClientPage};
pub use invoice::{
    Invoice, InvoiceDetails, InvoiceDocument, InvoicePage, InvoiceStats, InvoiceStatus,
    InvoiceTemplate, NewInvoice, StatusChange, UnknownStatus,
};
pub use invoice_item::{InvoiceItem, NewInvoiceItem};
