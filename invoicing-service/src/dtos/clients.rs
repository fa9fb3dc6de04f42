use serde::{Deserialize, Serialize};
use validator::Validate;

/// Client fields accepted on create and on full update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ClientRequest {
    #[validate(length(min = 2, max = 255, message = "name must be at least 2 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub company_name: Option<String>,

    #[serde(default)]
    pub address_line1: Option<String>,

    #[serde(default)]
    pub address_line2: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub postal_code: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub tax_id: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Query parameters for listing clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListClientsParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_is_rejected() {
        let req = ClientRequest {
            name: "A".to_string(),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn malformed_email_is_rejected() {
        let req = ClientRequest {
            name: "Acme Corp".to_string(),
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("email"));
    }

    #[test]
    fn missing_email_is_allowed() {
        let req = ClientRequest {
            name: "Acme Corp".to_string(),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }
}
