use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::CustomError;
use crate::state::AppState;

/// Pass-through of the agent's own API specification file.
pub async fn get_spec(State(state): State<AppState>) -> Result<impl IntoResponse, CustomError> {
    let full_path = format!("{}/api/Agent API.yaml", state.config.base_path);
    let content = tokio::fs::read(&full_path)
        .await
        .map_err(|e| CustomError::internal("Failed to read API spec", e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], content))
}
