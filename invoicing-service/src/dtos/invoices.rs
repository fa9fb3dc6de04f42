use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Payload for creating a draft invoice.
///
/// Dates are ISO calendar dates (`YYYY-MM-DD`). `currency` falls back to the
/// account default and `template_id` to `default` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,

    #[validate(length(min = 1, message = "issue_date is required"))]
    pub issue_date: String,

    #[validate(length(min = 1, message = "due_date is required"))]
    pub due_date: String,

    #[serde(default)]
    #[validate(length(equal = 3, message = "currency must be a 3-letter ISO 4217 code"))]
    pub currency: Option<String>,

    #[serde(default)]
    pub tax_rate: Decimal,

    #[serde(default)]
    pub discount_amount: Decimal,

    #[serde(default)]
    pub template_id: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub terms_and_conditions: Option<String>,

    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Vec<InvoiceItemRequest>,
}

/// Line item as submitted by the caller; the amount is always derived.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(length(min = 1, max = 1000, message = "item description is required"))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Partial update of a draft invoice. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[serde(default)]
    pub client_id: Option<Uuid>,

    #[serde(default)]
    pub issue_date: Option<String>,

    #[serde(default)]
    pub due_date: Option<String>,

    #[serde(default)]
    #[validate(length(equal = 3, message = "currency must be a 3-letter ISO 4217 code"))]
    pub currency: Option<String>,

    #[serde(default)]
    pub tax_rate: Option<Decimal>,

    #[serde(default)]
    pub discount_amount: Option<Decimal>,

    #[serde(default)]
    pub template_id: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub terms_and_conditions: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "at least one item is required"))]
    pub items: Option<Vec<InvoiceItemRequest>>,
}

/// Payload for a status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInvoiceStatusRequest {
    pub status: String,
    #[serde(default)]
    pub paid_date: Option<String>,
}

/// Query parameters for listing invoices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListInvoicesParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_json(items: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "client_id": Uuid::new_v4(),
            "issue_date": "2026-03-01",
            "due_date": "2026-03-31",
            "items": items,
        })
    }

    #[test]
    fn optional_financials_default_to_zero() {
        let req: CreateInvoiceRequest = serde_json::from_value(request_json(serde_json::json!([
            { "description": "Consulting", "quantity": "2", "unit_price": "150.00" }
        ])))
        .unwrap();

        assert_eq!(req.tax_rate, Decimal::ZERO);
        assert_eq!(req.discount_amount, Decimal::ZERO);
        assert!(req.currency.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_item_list_fails_validation() {
        let req: CreateInvoiceRequest =
            serde_json::from_value(request_json(serde_json::json!([]))).unwrap();

        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("items"));
    }

    #[test]
    fn currency_must_have_three_letters() {
        let mut req: CreateInvoiceRequest = serde_json::from_value(request_json(serde_json::json!([
            { "description": "Hosting", "quantity": "1", "unit_price": "10" }
        ])))
        .unwrap();
        req.currency = Some("EURO".to_string());

        assert!(req.validate().is_err());
    }

    #[test]
    fn blank_item_description_fails_validation() {
        let item = InvoiceItemRequest {
            description: String::new(),
            quantity: Decimal::ONE,
            unit_price: Decimal::ONE,
        };
        assert!(item.validate().is_err());
    }
}
