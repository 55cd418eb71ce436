use axum::extract::State;
use axum::Json;
use tracing::error;

use crate::error::CustomError;
use crate::model::service::NamespacesListResponse;
use crate::state::AppState;

pub async fn list_namespaces(
    State(state): State<AppState>,
) -> Result<Json<NamespacesListResponse>, CustomError> {
    let namespaces = state.namespace_cache.list_namespaces().await.map_err(|e| {
        error!("Failed to list namespaces: {}", e);
        e
    })?;
    Ok(Json(NamespacesListResponse {
        namespaces,
        cloud_name: state.namespace_cache.cloud_name().to_string(),
    }))
}
