use axum::{extract::State, Json};
use parley_core::APP_VERSION;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.config.environment.as_str(),
            "version": APP_VERSION,
        }
    }))
}
