//! Common test utilities for invoicing-service integration tests.
//!
//! Tests run against the PostgreSQL database in `TEST_DATABASE_URL` and are
//! skipped when it is not set. Every test provisions its own account, so
//! tests never observe each other's rows.

#![allow(dead_code)]

use invoicing_service::dtos::{ClientRequest, CreateInvoiceRequest, InvoiceItemRequest};
use invoicing_service::models::{Account, Client, CreateAccount};
use invoicing_service::services::{ClientService, Database, InvoiceService};
use invoicing_service::startup::{router, AppState};
use rust_decimal::Decimal;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,invoicing_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(value: &str) -> Decimal {
    value.parse().expect("valid decimal literal")
}

pub fn item(description: &str, quantity: &str, unit_price: &str) -> InvoiceItemRequest {
    InvoiceItemRequest {
        description: description.to_string(),
        quantity: dec(quantity),
        unit_price: dec(unit_price),
    }
}

/// Draft request dated March 2026 with the given items and no tax or discount.
pub fn invoice_request(client_id: Uuid, items: Vec<InvoiceItemRequest>) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        client_id,
        issue_date: "2026-03-01".to_string(),
        due_date: "2026-03-31".to_string(),
        currency: None,
        tax_rate: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        template_id: None,
        notes: None,
        terms_and_conditions: None,
        items,
    }
}

/// Test harness bound to a freshly provisioned account.
pub struct TestApp {
    pub db: Database,
    pub invoices: InvoiceService,
    pub clients: ClientService,
    pub account: Account,
}

impl TestApp {
    /// Connect, migrate and provision a free-tier account. Returns `None`
    /// when `TEST_DATABASE_URL` is unset.
    pub async fn spawn() -> Option<TestApp> {
        init_tracing();

        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let db = Database::new(&database_url, 5, 1)
            .await
            .expect("Failed to connect to test database");
        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let account = db
            .create_account(&CreateAccount::new(
                format!("owner-{}@example.com", Uuid::new_v4()),
                "Test Owner",
            ))
            .await
            .expect("Failed to create account");

        Some(TestApp {
            invoices: InvoiceService::new(db.clone()),
            clients: ClientService::new(db.clone()),
            db,
            account,
        })
    }

    pub fn account_id(&self) -> Uuid {
        self.account.account_id
    }

    /// Axum router over the same database.
    pub fn router(&self) -> axum::Router {
        router(AppState::new(self.db.clone()))
    }

    /// Provision a second, unrelated account.
    pub async fn other_account(&self) -> Account {
        self.db
            .create_account(&CreateAccount::new(
                format!("other-{}@example.com", Uuid::new_v4()),
                "Other Owner",
            ))
            .await
            .expect("Failed to create account")
    }

    pub async fn create_client(&self, name: &str) -> Client {
        self.create_client_for(self.account_id(), name).await
    }

    pub async fn create_client_for(&self, account_id: Uuid, name: &str) -> Client {
        self.clients
            .create_client(
                account_id,
                ClientRequest {
                    name: name.to_string(),
                    email: Some("billing@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to create client")
    }

    /// Overwrite plan fields directly.
    pub async fn set_plan(&self, tier: &str, monthly_invoice_count: i32, monthly_invoice_limit: i32) {
        sqlx::query(
            r#"
            UPDATE accounts
            SET subscription_tier = $2, monthly_invoice_count = $3, monthly_invoice_limit = $4
            WHERE account_id = $1
            "#,
        )
        .bind(self.account_id())
        .bind(tier)
        .bind(monthly_invoice_count)
        .bind(monthly_invoice_limit)
        .execute(self.db.pool())
        .await
        .expect("Failed to update plan");
    }

    pub async fn reload_account(&self) -> Account {
        self.db
            .get_account(self.account_id())
            .await
            .expect("Failed to load account")
            .expect("Account missing")
    }
}
