use serde::{Deserialize, Serialize};
use validator::Validate;

/// Profile seeded for a newly registered account.
///
/// Omitted settings fall back to the free-plan defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 2, max = 255, message = "full_name must be at least 2 characters"))]
    pub full_name: String,

    #[serde(default)]
    #[validate(length(equal = 3, message = "default_currency must be a 3-letter code"))]
    pub default_currency: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, max = 365, message = "default_payment_terms must be between 0 and 365 days"))]
    pub default_payment_terms: Option<i32>,

    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "invoice_number_prefix must be 1 to 20 characters"))]
    pub invoice_number_prefix: Option<String>,
}
