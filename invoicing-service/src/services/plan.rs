//! Plan-limit gate for invoice creation.

use crate::models::Account;
use crate::services::error::InvoiceError;

/// Reject creation when a free-tier account has used its monthly quota.
///
/// Paid tiers are never limited here.
pub fn check_invoice_quota(account: &Account) -> Result<(), InvoiceError> {
    if account.is_free_tier() && account.monthly_invoice_count >= account.monthly_invoice_limit {
        return Err(InvoiceError::QuotaExceeded {
            limit: account.monthly_invoice_limit,
        });
    }
    Ok(())
}
