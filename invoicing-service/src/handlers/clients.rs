use crate::dtos::{ClientRequest, ListClientsParams};
use crate::handlers::app_error;
use crate::middleware::AccountId;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_clients(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Query(params): Query<ListClientsParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .clients
        .list_clients(account_id, params)
        .await
        .map_err(app_error)?;
    Ok(Json(page))
}

pub async fn create_client(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<ClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = state
        .clients
        .create_client(account_id, request)
        .await
        .map_err(app_error)?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let client = state
        .clients
        .get_client(account_id, client_id)
        .await
        .map_err(app_error)?;
    Ok(Json(client))
}

pub async fn update_client(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(client_id): Path<Uuid>,
    Json(request): Json<ClientRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = state
        .clients
        .update_client(account_id, client_id, request)
        .await
        .map_err(app_error)?;
    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(client_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .clients
        .delete_client(account_id, client_id)
        .await
        .map_err(app_error)?;
    Ok(StatusCode::NO_CONTENT)
}
