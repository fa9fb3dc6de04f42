//! Account model for invoicing-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription tier that is subject to the monthly invoice quota.
pub const FREE_TIER: &str = "free";

/// Invoicing tenant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub subscription_tier: String,
    pub subscription_status: String,
    pub monthly_invoice_count: i32,
    pub monthly_invoice_limit: i32,
    pub default_currency: String,
    pub default_payment_terms: i32,
    pub invoice_number_prefix: String,
    pub next_invoice_number: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Account {
    pub fn is_free_tier(&self) -> bool {
        self.subscription_tier == FREE_TIER
    }
}

/// Input for provisioning an account.
///
/// Registration itself (credentials, tokens) lives outside this service; this
/// only seeds the invoicing profile with plan defaults.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    pub full_name: String,
    pub subscription_tier: String,
    pub monthly_invoice_limit: i32,
    pub default_currency: String,
    pub default_payment_terms: i32,
    pub invoice_number_prefix: String,
}

impl CreateAccount {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            full_name: full_name.into(),
            subscription_tier: FREE_TIER.to_string(),
            monthly_invoice_limit: 5,
            default_currency: "INR".to_string(),
            default_payment_terms: 30,
            invoice_number_prefix: "INV".to_string(),
        }
    }
}
