//! Invoice model for invoicing-service.

use crate::models::{Client, InvoiceItem};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Canceled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 5] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Canceled => "canceled",
        }
    }

    /// Paid and canceled invoices accept no further status changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Canceled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown invoice status '{0}', expected one of draft, sent, paid, overdue, canceled")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Rendering template for generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceTemplate {
    Default,
    Modern,
    Minimal,
    Professional,
}

impl InvoiceTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceTemplate::Default => "default",
            InvoiceTemplate::Modern => "modern",
            InvoiceTemplate::Minimal => "minimal",
            InvoiceTemplate::Professional => "professional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(InvoiceTemplate::Default),
            "modern" => Some(InvoiceTemplate::Modern),
            "minimal" => Some(InvoiceTemplate::Minimal),
            "professional" => Some(InvoiceTemplate::Professional),
            _ => None,
        }
    }
}

/// Invoice header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub account_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub status: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_utc: Option<DateTime<Utc>>,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub template_id: String,
    pub notes: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_generated_utc: Option<DateTime<Utc>>,
    pub email_sent: bool,
    pub email_sent_utc: Option<DateTime<Utc>>,
    pub email_opened: bool,
    pub email_opened_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> Result<InvoiceStatus, UnknownStatus> {
        self.status.parse()
    }
}

/// Invoice header together with its ordered items and billed client.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub client: Option<Client>,
}

/// One page of invoices, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Per-status counts and revenue for one account.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct InvoiceStats {
    pub total_invoices: i64,
    pub draft_invoices: i64,
    pub sent_invoices: i64,
    pub paid_invoices: i64,
    pub overdue_invoices: i64,
    pub canceled_invoices: i64,
    pub total_revenue: Decimal,
    pub pending_revenue: Decimal,
    pub overdue_revenue: Decimal,
}

/// Fully priced invoice header ready for insertion.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub account_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub template_id: String,
    pub notes: Option<String>,
    pub terms_and_conditions: Option<String>,
}

/// Rendered invoice document ready to be served.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a permitted status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: InvoiceStatus,
    /// Set only when moving into `paid`.
    pub paid_utc: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "void".parse::<InvoiceStatus>().unwrap_err();
        assert!(err.to_string().contains("void"));
    }

    #[test]
    fn only_paid_and_canceled_are_terminal() {
        let terminal: Vec<_> = InvoiceStatus::ALL
            .into_iter()
            .filter(InvoiceStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![InvoiceStatus::Paid, InvoiceStatus::Canceled]);
    }

    #[test]
    fn template_parse_rejects_unknown() {
        assert_eq!(InvoiceTemplate::parse("modern"), Some(InvoiceTemplate::Modern));
        assert_eq!(InvoiceTemplate::parse("fancy"), None);
    }
}
