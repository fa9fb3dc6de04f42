//! Account identity extractor.
//!
//! The upstream auth gateway verifies the caller's token and forwards the
//! authenticated account as `X-Account-ID`. This service trusts that header
//! and scopes every query by it.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const ACCOUNT_ID_HEADER: &str = "X-Account-ID";

/// Authenticated account making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-Account-ID header (required from gateway)"
                ))
            })?;

        let account_id = Uuid::parse_str(raw.trim()).map_err(|_| {
            AppError::Unauthorized(anyhow::anyhow!("Invalid X-Account-ID header"))
        })?;

        tracing::Span::current().record("account_id", raw);

        Ok(AccountId(account_id))
    }
}
