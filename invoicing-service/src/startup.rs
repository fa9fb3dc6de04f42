//! Application startup and lifecycle management.

use crate::config::InvoicingConfig;
use crate::handlers;
use crate::services::{init_metrics, AccountService, ClientService, Database, InvoiceService};
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub accounts: AccountService,
    pub invoices: InvoiceService,
    pub clients: ClientService,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            accounts: AccountService::new(db.clone()),
            invoices: InvoiceService::new(db.clone()),
            clients: ClientService::new(db.clone()),
            db: Arc::new(db),
        }
    }
}

/// HTTP routes with the shared middleware stack.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/accounts", post(handlers::accounts::create_account))
        .route("/accounts/me", get(handlers::accounts::get_current_account))
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/:client_id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route("/invoices/stats", get(handlers::invoices::get_invoice_stats))
        .route(
            "/invoices/:invoice_id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route(
            "/invoices/:invoice_id/status",
            patch(handlers::invoices::update_invoice_status),
        )
        .route(
            "/invoices/:invoice_id/duplicate",
            post(handlers::invoices::duplicate_invoice),
        )
        .route(
            "/invoices/:invoice_id/pdf",
            get(handlers::invoices::get_invoice_pdf),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect, migrate and bind the listener.
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let state = AppState::new(db);

        let addr: SocketAddr = config.common.listen_addr().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid listen address '{}': {}",
                config.common.listen_addr(),
                e
            ))
        })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(http_port = port, "Invoicing service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = router(self.state);

        tracing::info!(
            service = "invoicing-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
