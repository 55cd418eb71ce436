use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::error;

use crate::error::CustomError;
use crate::model::service::DEFAULT_WORKSPACE_ID;
use crate::state::AppState;

pub async fn get_service_document_v1(
    State(state): State<AppState>,
    Path((name, service_id, file_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, CustomError> {
    get_document(&state, &name, DEFAULT_WORKSPACE_ID, &service_id, &file_id).await
}

pub async fn get_service_document(
    State(state): State<AppState>,
    Path((name, workspace_id, service_id, file_id)): Path<(String, String, String, String)>,
) -> Result<impl IntoResponse, CustomError> {
    get_document(&state, &name, &workspace_id, &service_id, &file_id).await
}

async fn get_document(
    state: &AppState,
    namespace: &str,
    workspace_id: &str,
    service_id: &str,
    file_id: &str,
) -> Result<impl IntoResponse, CustomError> {
    let content = state
        .document_service
        .get_document_by_id(namespace, workspace_id, service_id, file_id)
        .await
        .map_err(|e| {
            error!("Failed to get service document: {}", e);
            e
        })?;
    Ok(([(header::CONTENT_TYPE, "text/plain")], content))
}
