// ABOUTME: Parley HTTP server library
// ABOUTME: Configuration, admission middleware, API handlers, and server bootstrap

pub mod api;
pub mod config;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod server;
pub mod state;

#[cfg(test)]
mod tests;

pub use api::create_router;
pub use config::{Config, ConfigError};
pub use error::{ApiResult, AppError};
pub use server::run_server;
pub use state::AppState;
