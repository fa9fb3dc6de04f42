use crate::dtos::CreateAccountRequest;
use crate::handlers::app_error;
use crate::middleware::AccountId;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

/// Provision an account for a newly registered user. Called by the upstream
/// gateway before it starts forwarding the account's requests.
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .accounts
        .provision_account(request)
        .await
        .map_err(app_error)?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Plan usage and numbering settings of the calling account.
pub async fn get_current_account(
    State(state): State<AppState>,
    AccountId(account_id): AccountId,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .accounts
        .get_account(account_id)
        .await
        .map_err(app_error)?;
    Ok(Json(account))
}
