// ABOUTME: Bearer token authentication middleware
// ABOUTME: Resolves the Authorization header into a CallerIdentity request extension

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parley_security::{CallerIdentity, Scope, TokenIssuer};
use tracing::debug;

use crate::error::AppError;

/// What the `Authorization` header carried
#[derive(Debug, PartialEq, Eq)]
pub enum BearerCredential<'a> {
    Absent,
    Malformed,
    Token(&'a str),
}

/// Parse `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub fn parse_bearer(headers: &HeaderMap) -> BearerCredential<'_> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return BearerCredential::Absent;
    };
    let Ok(value) = value.to_str() else {
        return BearerCredential::Malformed;
    };

    match value.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() || token.contains(char::is_whitespace) {
                BearerCredential::Malformed
            } else {
                BearerCredential::Token(token)
            }
        }
        _ => BearerCredential::Malformed,
    }
}

async fn resolve_identity(
    issuer: &TokenIssuer,
    headers: &HeaderMap,
) -> Result<CallerIdentity, AppError> {
    match parse_bearer(headers) {
        BearerCredential::Absent => Ok(CallerIdentity::Anonymous),
        BearerCredential::Malformed => Err(AppError::MalformedCredential),
        BearerCredential::Token(token) => {
            let user = issuer.authenticate(token, Scope::Authentication).await?;
            debug!(user_id = user.user_id, "Bearer token authenticated");
            Ok(CallerIdentity::User(user))
        }
    }
}

/// Attach a `CallerIdentity` to every request that gets through.
///
/// A missing header yields `Anonymous`; a present but unusable one ends the
/// request with 401. Every response varies on `Authorization`.
pub async fn authenticate(
    State(issuer): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut response = match resolve_identity(&issuer, request.headers()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// The identity resolved for the current request.
///
/// Requests that never passed through `authenticate` are anonymous.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub CallerIdentity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(
            parts
                .extensions
                .get::<CallerIdentity>()
                .copied()
                .unwrap_or_default(),
        ))
    }
}
