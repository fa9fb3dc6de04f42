//! Database service for invoicing-service.
//!
//! Every query is scoped by `account_id`. Methods taking a `PgConnection`
//! run inside a caller-owned transaction; the rest use the pool directly.

use crate::dtos::ClientRequest;
use crate::models::{
    Account, Client, CreateAccount, Invoice, InvoiceItem, InvoiceStats, InvoiceStatus, NewInvoice,
    NewInvoiceItem, StatusChange,
};
use crate::services::error::InvoiceError;
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres, Transaction};
use std::time::Duration;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Start a transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, InvoiceError> {
        self.pool.begin().await.map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })
    }

    // -------------------------------------------------------------------------
    // Account Operations
    // -------------------------------------------------------------------------

    /// Provision an invoicing account.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_account(&self, input: &CreateAccount) -> Result<Account, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (
                account_id, email, full_name, subscription_tier, subscription_status,
                monthly_invoice_count, monthly_invoice_limit, default_currency,
                default_payment_terms, invoice_number_prefix, next_invoice_number
            )
            VALUES ($1, $2, $3, $4, 'active', 0, $5, $6, $7, $8, 1)
            RETURNING account_id, email, full_name, subscription_tier, subscription_status,
                monthly_invoice_count, monthly_invoice_limit, default_currency,
                default_payment_terms, invoice_number_prefix, next_invoice_number,
                created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.email)
        .bind(&input.full_name)
        .bind(&input.subscription_tier)
        .bind(input.monthly_invoice_limit)
        .bind(&input.default_currency)
        .bind(input.default_payment_terms)
        .bind(&input.invoice_number_prefix)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                InvoiceError::Conflict(format!(
                    "account with email '{}' already exists",
                    input.email
                ))
            }
            _ => InvoiceError::Storage(anyhow::anyhow!("Failed to create account: {}", e)),
        })?;

        timer.observe_duration();

        info!(account_id = %account.account_id, "Account created");

        Ok(account)
    }

    /// Get an account by ID.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, email, full_name, subscription_tier, subscription_status,
                monthly_invoice_count, monthly_invoice_limit, default_currency,
                default_payment_terms, invoice_number_prefix, next_invoice_number,
                created_utc, updated_utc
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to get account: {}", e)))?;

        timer.observe_duration();

        Ok(account)
    }

    /// Lock an account row for the rest of the transaction.
    ///
    /// Serializes invoice creation per account: the counter read here is the
    /// one the caller assigns.
    #[instrument(skip(self, conn), fields(account_id = %account_id))]
    pub async fn lock_account(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
    ) -> Result<Option<Account>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, email, full_name, subscription_tier, subscription_status,
                monthly_invoice_count, monthly_invoice_limit, default_currency,
                default_payment_terms, invoice_number_prefix, next_invoice_number,
                created_utc, updated_utc
            FROM accounts
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to lock account: {}", e)))?;

        timer.observe_duration();

        Ok(account)
    }

    /// Advance the numbering counter and monthly usage by one invoice.
    #[instrument(skip(self, conn), fields(account_id = %account_id))]
    pub async fn advance_invoice_counter(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
    ) -> Result<(), InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["advance_invoice_counter"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE accounts
            SET next_invoice_number = next_invoice_number + 1,
                monthly_invoice_count = monthly_invoice_count + 1,
                updated_utc = NOW()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to advance invoice counter: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    /// Create a client.
    #[instrument(skip(self, input), fields(account_id = %account_id))]
    pub async fn create_client(
        &self,
        account_id: Uuid,
        input: &ClientRequest,
    ) -> Result<Client, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (
                client_id, account_id, name, email, phone, company_name, address_line1,
                address_line2, city, state, postal_code, country, tax_id, notes, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, TRUE)
            RETURNING client_id, account_id, name, email, phone, company_name, address_line1,
                address_line2, city, state, postal_code, country, tax_id, notes, is_active,
                created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.company_name)
        .bind(&input.address_line1)
        .bind(&input.address_line2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.tax_id)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to create client: {}", e)))?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    /// Get an active client.
    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn get_client(
        &self,
        account_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, account_id, name, email, phone, company_name, address_line1,
                address_line2, city, state, postal_code, country, tax_id, notes, is_active,
                created_utc, updated_utc
            FROM clients
            WHERE account_id = $1 AND client_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(account_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Get the client billed on an invoice, including deactivated ones.
    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn get_billed_client(
        &self,
        account_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_billed_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, account_id, name, email, phone, company_name, address_line1,
                address_line2, city, state, postal_code, country, tax_id, notes, is_active,
                created_utc, updated_utc
            FROM clients
            WHERE account_id = $1 AND client_id = $2
            "#,
        )
        .bind(account_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    /// Count active clients.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn count_clients(&self, account_id: Uuid) -> Result<i64, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_clients"])
            .start_timer();

        let total: i64 = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM clients
            WHERE account_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to count clients: {}", e)))?;

        timer.observe_duration();

        Ok(total)
    }

    /// List active clients, newest first.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn list_clients(
        &self,
        account_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Client>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT client_id, account_id, name, email, phone, company_name, address_line1,
                address_line2, city, state, postal_code, country, tax_id, notes, is_active,
                created_utc, updated_utc
            FROM clients
            WHERE account_id = $1 AND is_active = TRUE
            ORDER BY created_utc DESC, client_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    /// Replace the editable fields of an active client.
    #[instrument(skip(self, input), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn update_client(
        &self,
        account_id: Uuid,
        client_id: Uuid,
        input: &ClientRequest,
    ) -> Result<Option<Client>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = $3, email = $4, phone = $5, company_name = $6, address_line1 = $7,
                address_line2 = $8, city = $9, state = $10, postal_code = $11, country = $12,
                tax_id = $13, notes = $14, updated_utc = NOW()
            WHERE account_id = $1 AND client_id = $2 AND is_active = TRUE
            RETURNING client_id, account_id, name, email, phone, company_name, address_line1,
                address_line2, city, state, postal_code, country, tax_id, notes, is_active,
                created_utc, updated_utc
            "#,
        )
        .bind(account_id)
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.company_name)
        .bind(&input.address_line1)
        .bind(&input.address_line2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.tax_id)
        .bind(&input.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        if client.is_some() {
            info!("Client updated");
        }

        Ok(client)
    }

    /// Soft-delete a client. Returns false when no active client matched.
    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn deactivate_client(
        &self,
        account_id: Uuid,
        client_id: Uuid,
    ) -> Result<bool, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["deactivate_client"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET is_active = FALSE, updated_utc = NOW()
            WHERE account_id = $1 AND client_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(account_id)
        .bind(client_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to deactivate client: {}", e))
        })?;

        timer.observe_duration();

        let deactivated = result.rows_affected() > 0;
        if deactivated {
            info!("Client deactivated");
        }

        Ok(deactivated)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Insert an invoice header in `draft`.
    #[instrument(skip(self, conn, input), fields(account_id = %input.account_id, invoice_number = %input.invoice_number))]
    pub async fn insert_invoice(
        &self,
        conn: &mut PgConnection,
        input: &NewInvoice,
    ) -> Result<Invoice, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                invoice_id, account_id, client_id, invoice_number, status, issue_date, due_date,
                currency, subtotal, tax_rate, tax_amount, discount_amount, total_amount,
                template_id, notes, terms_and_conditions
            )
            VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING invoice_id, account_id, client_id, invoice_number, status, issue_date,
                due_date, paid_utc, currency, subtotal, tax_rate, tax_amount, discount_amount,
                total_amount, template_id, notes, terms_and_conditions, pdf_url, pdf_generated_utc,
                email_sent, email_sent_utc, email_opened, email_opened_utc, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.account_id)
        .bind(input.client_id)
        .bind(&input.invoice_number)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(&input.currency)
        .bind(input.subtotal)
        .bind(input.tax_rate)
        .bind(input.tax_amount)
        .bind(input.discount_amount)
        .bind(input.total_amount)
        .bind(&input.template_id)
        .bind(&input.notes)
        .bind(&input.terms_and_conditions)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            // Numbers are assigned under the account row lock; a collision
            // means the counter and the stored invoices disagree.
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                error!(
                    account_id = %input.account_id,
                    invoice_number = %input.invoice_number,
                    "Invoice number already taken despite account lock"
                );
                InvoiceError::Storage(anyhow::anyhow!(
                    "Invoice number '{}' already exists",
                    input.invoice_number
                ))
            }
            _ => InvoiceError::Storage(anyhow::anyhow!("Failed to insert invoice: {}", e)),
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, "Invoice inserted");

        Ok(invoice)
    }

    /// Insert priced items for an invoice.
    #[instrument(skip(self, conn, items), fields(account_id = %account_id, invoice_id = %invoice_id, count = items.len()))]
    pub async fn insert_invoice_items(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        invoice_id: Uuid,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice_items"])
            .start_timer();

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, InvoiceItem>(
                r#"
                INSERT INTO invoice_items (
                    item_id, invoice_id, account_id, description, quantity, unit_price, amount,
                    sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING item_id, invoice_id, account_id, description, quantity, unit_price,
                    amount, sort_order, created_utc, updated_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(account_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.amount)
            .bind(item.sort_order)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                InvoiceError::Storage(anyhow::anyhow!("Failed to insert invoice item: {}", e))
            })?;
            inserted.push(row);
        }

        timer.observe_duration();

        Ok(inserted)
    }

    /// Drop all items of an invoice and insert the given ones.
    #[instrument(skip(self, conn, items), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn replace_invoice_items(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        invoice_id: Uuid,
        items: &[NewInvoiceItem],
    ) -> Result<Vec<InvoiceItem>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice_items"])
            .start_timer();

        sqlx::query("DELETE FROM invoice_items WHERE account_id = $1 AND invoice_id = $2")
            .bind(account_id)
            .bind(invoice_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                InvoiceError::Storage(anyhow::anyhow!("Failed to delete invoice items: {}", e))
            })?;

        timer.observe_duration();

        self.insert_invoice_items(conn, account_id, invoice_id, items)
            .await
    }

    /// Get an invoice header by ID.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn get_invoice(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, account_id, client_id, invoice_number, status, issue_date,
                due_date, paid_utc, currency, subtotal, tax_rate, tax_amount, discount_amount,
                total_amount, template_id, notes, terms_and_conditions, pdf_url, pdf_generated_utc,
                email_sent, email_sent_utc, email_opened, email_opened_utc, created_utc, updated_utc
            FROM invoices
            WHERE account_id = $1 AND invoice_id = $2
            "#,
        )
        .bind(account_id)
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Lock an invoice row for the rest of the transaction.
    #[instrument(skip(self, conn), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn lock_invoice(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, account_id, client_id, invoice_number, status, issue_date,
                due_date, paid_utc, currency, subtotal, tax_rate, tax_amount, discount_amount,
                total_amount, template_id, notes, terms_and_conditions, pdf_url, pdf_generated_utc,
                email_sent, email_sent_utc, email_opened, email_opened_utc, created_utc, updated_utc
            FROM invoices
            WHERE account_id = $1 AND invoice_id = $2
            FOR UPDATE
            "#,
        )
        .bind(account_id)
        .bind(invoice_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to lock invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Get the items of an invoice in sort order.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn get_invoice_items(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceItem>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_items"])
            .start_timer();

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT item_id, invoice_id, account_id, description, quantity, unit_price, amount,
                sort_order, created_utc, updated_utc
            FROM invoice_items
            WHERE account_id = $1 AND invoice_id = $2
            ORDER BY sort_order
            "#,
        )
        .bind(account_id)
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to get invoice items: {}", e))
        })?;

        timer.observe_duration();

        Ok(items)
    }

    /// Count invoices, optionally restricted to one status.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn count_invoices(
        &self,
        account_id: Uuid,
        status: Option<InvoiceStatus>,
    ) -> Result<i64, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_invoices"])
            .start_timer();

        let total: i64 = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM invoices
                    WHERE account_id = $1 AND status = $2
                    "#,
                )
                .bind(account_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices WHERE account_id = $1")
                    .bind(account_id)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to count invoices: {}", e)))?;

        timer.observe_duration();

        Ok(total)
    }

    /// List invoices newest first, optionally restricted to one status.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn list_invoices(
        &self,
        account_id: Uuid,
        status: Option<InvoiceStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = match status {
            Some(status) => {
                sqlx::query_as::<_, Invoice>(
                    r#"
                    SELECT invoice_id, account_id, client_id, invoice_number, status, issue_date,
                        due_date, paid_utc, currency, subtotal, tax_rate, tax_amount,
                        discount_amount, total_amount, template_id, notes, terms_and_conditions,
                        pdf_url, pdf_generated_utc, email_sent, email_sent_utc, email_opened,
                        email_opened_utc, created_utc, updated_utc
                    FROM invoices
                    WHERE account_id = $1 AND status = $2
                    ORDER BY created_utc DESC, invoice_id
                    LIMIT $3 OFFSET $4
                    "#,
                )
                .bind(account_id)
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Invoice>(
                    r#"
                    SELECT invoice_id, account_id, client_id, invoice_number, status, issue_date,
                        due_date, paid_utc, currency, subtotal, tax_rate, tax_amount,
                        discount_amount, total_amount, template_id, notes, terms_and_conditions,
                        pdf_url, pdf_generated_utc, email_sent, email_sent_utc, email_opened,
                        email_opened_utc, created_utc, updated_utc
                    FROM invoices
                    WHERE account_id = $1
                    ORDER BY created_utc DESC, invoice_id
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(account_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Persist a status change. `paid_utc` is only overwritten when set.
    #[instrument(skip(self, conn, change), fields(invoice_id = %invoice_id, status = %change.status))]
    pub async fn update_invoice_status(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        invoice_id: Uuid,
        change: &StatusChange,
    ) -> Result<Invoice, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_status"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $3,
                paid_utc = COALESCE($4, paid_utc),
                updated_utc = NOW()
            WHERE account_id = $1 AND invoice_id = $2
            RETURNING invoice_id, account_id, client_id, invoice_number, status, issue_date,
                due_date, paid_utc, currency, subtotal, tax_rate, tax_amount, discount_amount,
                total_amount, template_id, notes, terms_and_conditions, pdf_url, pdf_generated_utc,
                email_sent, email_sent_utc, email_opened, email_opened_utc, created_utc, updated_utc
            "#,
        )
        .bind(account_id)
        .bind(invoice_id)
        .bind(change.status.as_str())
        .bind(change.paid_utc)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to update invoice status: {}", e))
        })?;

        timer.observe_duration();

        info!("Invoice status updated");

        Ok(invoice)
    }

    /// Overwrite the editable header fields and totals of a draft.
    ///
    /// `account_id` and `invoice_number` in `input` identify nothing here;
    /// the number of an existing invoice never changes.
    #[instrument(skip(self, conn, input), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn update_invoice_header(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        invoice_id: Uuid,
        input: &NewInvoice,
    ) -> Result<Invoice, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_header"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET client_id = $3, issue_date = $4, due_date = $5, currency = $6, subtotal = $7,
                tax_rate = $8, tax_amount = $9, discount_amount = $10, total_amount = $11,
                template_id = $12, notes = $13, terms_and_conditions = $14, updated_utc = NOW()
            WHERE account_id = $1 AND invoice_id = $2
            RETURNING invoice_id, account_id, client_id, invoice_number, status, issue_date,
                due_date, paid_utc, currency, subtotal, tax_rate, tax_amount, discount_amount,
                total_amount, template_id, notes, terms_and_conditions, pdf_url, pdf_generated_utc,
                email_sent, email_sent_utc, email_opened, email_opened_utc, created_utc, updated_utc
            "#,
        )
        .bind(account_id)
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(&input.currency)
        .bind(input.subtotal)
        .bind(input.tax_rate)
        .bind(input.tax_amount)
        .bind(input.discount_amount)
        .bind(input.total_amount)
        .bind(&input.template_id)
        .bind(&input.notes)
        .bind(&input.terms_and_conditions)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| InvoiceError::Storage(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        timer.observe_duration();

        info!("Invoice updated");

        Ok(invoice)
    }

    /// Record that a document was rendered for the invoice.
    #[instrument(skip(self), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn mark_pdf_generated(
        &self,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<(), InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_pdf_generated"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE invoices
            SET pdf_generated_utc = NOW()
            WHERE account_id = $1 AND invoice_id = $2
            "#,
        )
        .bind(account_id)
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to stamp PDF generation: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    /// Hard-delete an invoice; its items cascade.
    #[instrument(skip(self, conn), fields(account_id = %account_id, invoice_id = %invoice_id))]
    pub async fn delete_invoice(
        &self,
        conn: &mut PgConnection,
        account_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<bool, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let result = sqlx::query("DELETE FROM invoices WHERE account_id = $1 AND invoice_id = $2")
            .bind(account_id)
            .bind(invoice_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                InvoiceError::Storage(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Invoice deleted");
        }

        Ok(deleted)
    }

    /// Per-status counts and revenue in one aggregate query.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn invoice_stats(&self, account_id: Uuid) -> Result<InvoiceStats, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["invoice_stats"])
            .start_timer();

        let stats = sqlx::query_as::<_, InvoiceStats>(
            r#"
            SELECT
                COUNT(*) AS total_invoices,
                COUNT(*) FILTER (WHERE status = 'draft') AS draft_invoices,
                COUNT(*) FILTER (WHERE status = 'sent') AS sent_invoices,
                COUNT(*) FILTER (WHERE status = 'paid') AS paid_invoices,
                COUNT(*) FILTER (WHERE status = 'overdue') AS overdue_invoices,
                COUNT(*) FILTER (WHERE status = 'canceled') AS canceled_invoices,
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'paid'), 0) AS total_revenue,
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'sent'), 0) AS pending_revenue,
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'overdue'), 0) AS overdue_revenue
            FROM invoices
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            InvoiceError::Storage(anyhow::anyhow!("Failed to get invoice stats: {}", e))
        })?;

        timer.observe_duration();

        Ok(stats)
    }
}
