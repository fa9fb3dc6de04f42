//! Client directory scoped to one account.

use crate::dtos::{ClientRequest, ListClientsParams};
use crate::models::{Client, ClientPage};
use crate::services::database::Database;
use crate::services::error::InvoiceError;
use crate::services::pagination::PageRequest;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ClientService {
    db: Database,
}

impl ClientService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(account_id = %account_id))]
    pub async fn create_client(
        &self,
        account_id: Uuid,
        request: ClientRequest,
    ) -> Result<Client, InvoiceError> {
        request.validate()?;
        let client = self.db.create_client(account_id, &request).await?;
        info!(client_id = %client.client_id, "Client added to directory");
        Ok(client)
    }

    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn get_client(&self, account_id: Uuid, client_id: Uuid) -> Result<Client, InvoiceError> {
        self.db
            .get_client(account_id, client_id)
            .await?
            .ok_or_else(|| InvoiceError::not_found("client"))
    }

    /// One page of active clients, newest first.
    #[instrument(skip(self, params), fields(account_id = %account_id))]
    pub async fn list_clients(
        &self,
        account_id: Uuid,
        params: ListClientsParams,
    ) -> Result<ClientPage, InvoiceError> {
        let page = PageRequest::new(params.page, params.page_size);
        let total = self.db.count_clients(account_id).await?;
        let clients = self
            .db
            .list_clients(account_id, page.limit(), page.offset())
            .await?;

        Ok(ClientPage {
            clients,
            total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages(total),
        })
    }

    /// Replace every editable field; omitted optional fields are cleared.
    #[instrument(skip(self, request), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn update_client(
        &self,
        account_id: Uuid,
        client_id: Uuid,
        request: ClientRequest,
    ) -> Result<Client, InvoiceError> {
        request.validate()?;
        self.db
            .update_client(account_id, client_id, &request)
            .await?
            .ok_or_else(|| InvoiceError::not_found("client"))
    }

    /// Soft delete. Invoices already billed to the client keep showing it.
    #[instrument(skip(self), fields(account_id = %account_id, client_id = %client_id))]
    pub async fn delete_client(&self, account_id: Uuid, client_id: Uuid) -> Result<(), InvoiceError> {
        if !self.db.deactivate_client(account_id, client_id).await? {
            return Err(InvoiceError::not_found("client"));
        }
        Ok(())
    }
}
