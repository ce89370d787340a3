// ABOUTME: Authorization gates layered onto protected routes
// ABOUTME: Reject anonymous callers with 401 and unactivated users with 403

use axum::{extract::Request, middleware::Next, response::Response};
use parley_security::CallerIdentity;

use crate::error::AppError;

fn caller_identity(request: &Request) -> CallerIdentity {
    request
        .extensions()
        .get::<CallerIdentity>()
        .copied()
        .unwrap_or_default()
}

pub async fn require_authenticated_user(request: Request, next: Next) -> Result<Response, AppError> {
    if caller_identity(&request).is_anonymous() {
        return Err(AppError::Unauthenticated);
    }

    Ok(next.run(request).await)
}

pub async fn require_activated_user(request: Request, next: Next) -> Result<Response, AppError> {
    match caller_identity(&request) {
        CallerIdentity::Anonymous => Err(AppError::Unauthenticated),
        CallerIdentity::User(user) if !user.is_activated => Err(AppError::NotActivated),
        CallerIdentity::User(_) => Ok(next.run(request).await),
    }
}
