//! Invoice status rules.
//!
//! Transitions are permissive: any status may move to any other until the
//! invoice reaches `paid` or `canceled`, after which nothing changes.

use crate::models::{InvoiceStatus, StatusChange};
use crate::services::error::InvoiceError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO calendar date, naming the offending field on failure.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, InvoiceError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        InvoiceError::InvalidInput(format!(
            "invalid {} '{}', expected YYYY-MM-DD",
            field, value
        ))
    })
}

/// Decide the outcome of moving an invoice from `current` to `target`.
///
/// Moving into `paid` stamps `paid_date` (midnight UTC) when one is given,
/// otherwise `now`. The paid timestamp is left untouched for every other
/// target.
pub fn plan_status_change(
    current: InvoiceStatus,
    target: InvoiceStatus,
    paid_date: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StatusChange, InvoiceError> {
    if current.is_terminal() {
        return Err(InvoiceError::InvalidTransition(format!(
            "cannot update status of {} invoice",
            current
        )));
    }

    let paid_utc = match target {
        InvoiceStatus::Paid => match paid_date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(date) => Some(parse_date("paid_date", date)?.and_time(NaiveTime::MIN).and_utc()),
            None => Some(now),
        },
        _ => None,
    };

    Ok(StatusChange {
        status: target,
        paid_utc,
    })
}

pub fn ensure_deletable(status: InvoiceStatus) -> Result<(), InvoiceError> {
    if status != InvoiceStatus::Draft {
        return Err(InvoiceError::InvalidOperation(format!(
            "only draft invoices can be deleted, invoice is {}",
            status
        )));
    }
    Ok(())
}

pub fn ensure_editable(status: InvoiceStatus) -> Result<(), InvoiceError> {
    if status != InvoiceStatus::Draft {
        return Err(InvoiceError::InvalidOperation(format!(
            "only draft invoices can be edited, invoice is {}",
            status
        )));
    }
    Ok(())
}
