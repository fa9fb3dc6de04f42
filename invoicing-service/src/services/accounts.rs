//! Account provisioning and profile lookup.

use crate::dtos::CreateAccountRequest;
use crate::models::{Account, CreateAccount};
use crate::services::database::Database;
use crate::services::error::InvoiceError;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct AccountService {
    db: Database,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Seed the invoicing profile of a newly registered account on the free
    /// plan. A taken email fails with `Conflict`.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn provision_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<Account, InvoiceError> {
        request.validate()?;

        let mut input = CreateAccount::new(request.email.trim(), request.full_name.trim());
        if let Some(currency) = request.default_currency {
            input.default_currency = currency.trim().to_uppercase();
        }
        if let Some(terms) = request.default_payment_terms {
            input.default_payment_terms = terms;
        }
        if let Some(prefix) = request.invoice_number_prefix {
            input.invoice_number_prefix = prefix.trim().to_string();
        }

        let account = self.db.create_account(&input).await?;
        info!(account_id = %account.account_id, "Account provisioned");
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_account(&self, account_id: Uuid) -> Result<Account, InvoiceError> {
        self.db
            .get_account(account_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("account"))
    }
}
