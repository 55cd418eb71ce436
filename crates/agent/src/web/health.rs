use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

pub async fn live() -> StatusCode {
    StatusCode::OK
}

pub async fn ready() -> StatusCode {
    StatusCode::OK
}

/// 404 until the startup checks pass, then 200 forever.
pub async fn startup(State(state): State<AppState>) -> StatusCode {
    if state.health.startup_ok() {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}
