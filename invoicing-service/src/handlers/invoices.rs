use crate::dtos::{
    CreateInvoiceRequest, ListInvoicesParams, UpdateInvoiceRequest, UpdateInvoiceStatusRequest,
};
use crate::handlers::app_error;
use crate::middleware::AccountId;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_invoices(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Query(params): Query<ListInvoicesParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .invoices
        .list_invoices(account_id, params)
        .await
        .map_err(app_error)?;
    Ok(Json(page))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .create_invoice(account_id, request)
        .await
        .map_err(app_error)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice_stats(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .invoices
        .get_stats(account_id)
        .await
        .map_err(app_error)?;
    Ok(Json(stats))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .get_invoice(account_id, invoice_id)
        .await
        .map_err(app_error)?;
    Ok(Json(invoice))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .update_invoice(account_id, invoice_id, request)
        .await
        .map_err(app_error)?;
    Ok(Json(invoice))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .update_invoice_status(account_id, invoice_id, request)
        .await
        .map_err(app_error)?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .invoices
        .delete_invoice(account_id, invoice_id)
        .await
        .map_err(app_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn duplicate_invoice(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .duplicate_invoice(account_id, invoice_id)
        .await
        .map_err(app_error)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice_pdf(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = state
        .invoices
        .render_pdf(account_id, invoice_id)
        .await
        .map_err(app_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.file_name),
            ),
        ],
        document.bytes,
    ))
}
