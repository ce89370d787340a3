// ABOUTME: HTTP handlers for authentication tokens
// ABOUTME: Exchange email and password for a bearer token, or revoke the caller's tokens

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parley_core::Validator;
use parley_security::{verify_password_bounded, Scope};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiResult, AppError};
use crate::middleware::Caller;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTokenInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Unknown email and wrong password are indistinguishable to the client.
pub async fn create_authentication_token(
    State(state): State<AppState>,
    payload: Result<Json<CreateTokenInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;

    let mut v = Validator::new();
    v.validate_email(&input.email);
    v.validate_password_plaintext(&input.password);
    if !v.is_valid() {
        return Err(AppError::validation(v.into_errors()));
    }

    let user = state
        .bounded(state.users.get_by_email(&input.email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let matches = verify_password_bounded(
        input.password,
        user.password_hash.clone(),
        state.config.request_timeout,
    )
    .await?;
    if !matches {
        return Err(AppError::InvalidCredentials);
    }

    let token = state
        .issuer
        .issue(user.id, Scope::Authentication, state.config.auth_token_ttl)
        .await?;
    info!(user_id = user.id, "Authentication token issued");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "authentication_token": token })),
    ))
}

/// Log out everywhere: revoke every authentication token the caller holds.
pub async fn delete_authentication_tokens(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<impl IntoResponse> {
    let user = caller.user().ok_or(AppError::Unauthenticated)?;

    state
        .issuer
        .revoke_all(user.user_id, Scope::Authentication)
        .await?;

    Ok(Json(json!({ "message": "authentication tokens revoked" })))
}
