use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::{
    authenticate, create_panic_handler, rate_limit, require_activated_user,
    require_authenticated_user,
};
use crate::state::AppState;

pub mod comments;
pub mod health;
pub mod tokens;
pub mod users;

async fn not_found() -> AppError {
    AppError::not_found()
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Routes open to anonymous callers
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/healthcheck", get(health::health_check))
        .route("/v1/comments", post(comments::create_comment))
        .route("/v1/comments/{id}", get(comments::show_comment))
        .route("/v1/users", post(users::register_user))
        .route("/v1/users/activated", put(users::activate_user))
        .route(
            "/v1/tokens/authentication",
            post(tokens::create_authentication_token),
        )
}

/// Routes that need an activated user
fn activated_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/comments", get(comments::list_comments))
        .route(
            "/v1/comments/{id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route_layer(middleware::from_fn(require_activated_user))
}

/// Routes that need any authenticated user
fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/tokens/authentication",
            delete(tokens::delete_authentication_tokens),
        )
        .route_layer(middleware::from_fn(require_authenticated_user))
}

/// Wrap `router` in the admission chain shared by every request.
///
/// Outermost first: panic recovery, tracing, rate limiting, authentication.
pub fn with_admission_layers(router: Router, state: &AppState) -> Router {
    router
        .layer(middleware::from_fn_with_state(
            state.issuer.clone(),
            authenticate,
        ))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(create_panic_handler())
}

pub fn create_router(state: AppState) -> Router {
    let router = public_routes()
        .merge(activated_routes())
        .merge(authenticated_routes())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state.clone());

    with_admission_layers(router, &state)
}
