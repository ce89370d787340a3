// ABOUTME: HTTP handlers for user registration and activation
// ABOUTME: Registration mails a single-use activation token; activation consumes it

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use parley_core::Validator;
use parley_security::{hash_password_bounded, Scope, TokenError};
use parley_storage::NewUser;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiResult, AppError};
use crate::mailer::TEMPLATE_USER_WELCOME;
use crate::state::AppState;

/// Length of an encoded token plaintext
const TOKEN_PLAINTEXT_LEN: usize = 43;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateUserInput {
    #[serde(default)]
    pub token: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;

    let mut v = Validator::new();
    v.check(!input.name.is_empty(), "name", "must be provided");
    v.check(
        input.name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );
    v.validate_email(&input.email);
    v.validate_password_plaintext(&input.password);
    if !v.is_valid() {
        return Err(AppError::validation(v.into_errors()));
    }

    let password_hash =
        hash_password_bounded(input.password, state.config.request_timeout).await?;

    let new_user = NewUser {
        name: input.name,
        email: input.email,
        password_hash,
    };
    let user = state.bounded(state.users.insert(&new_user)).await?;

    let activation = state
        .issuer
        .issue(user.id, Scope::Activation, state.config.activation_token_ttl)
        .await?;

    state.mailer.dispatch(
        user.email.clone(),
        TEMPLATE_USER_WELCOME,
        json!({
            "activationToken": activation.token,
            "userID": user.id,
        }),
    );
    info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

pub async fn activate_user(
    State(state): State<AppState>,
    payload: Result<Json<ActivateUserInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;

    let mut v = Validator::new();
    v.check(!input.token.is_empty(), "token", "must be provided");
    v.check(
        input.token.len() == TOKEN_PLAINTEXT_LEN,
        "token",
        "must be 43 bytes long",
    );
    if !v.is_valid() {
        return Err(AppError::validation(v.into_errors()));
    }

    let identity = match state
        .issuer
        .authenticate(&input.token, Scope::Activation)
        .await
    {
        Ok(identity) => identity,
        Err(TokenError::Invalid) => {
            v.add_error("token", "invalid or expired activation token");
            return Err(AppError::validation(v.into_errors()));
        }
        Err(err) => return Err(err.into()),
    };

    let mut user = state
        .bounded(state.users.get_by_id(identity.user_id))
        .await?
        .ok_or(AppError::NotFound)?;
    user.activated = true;
    let user = state.bounded(state.users.update(&user)).await?;

    // Activation tokens are single-use
    state.issuer.revoke_all(user.id, Scope::Activation).await?;
    info!(user_id = user.id, "User activated");

    Ok(Json(json!({ "user": user })))
}
