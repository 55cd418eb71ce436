use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::error;

use crate::error::CustomError;
use crate::model::service::{
    ServiceItemsResponse, ServiceListResponse, ServiceNamesResponse, DEFAULT_WORKSPACE_ID,
};
use crate::secctx::SecurityContext;
use crate::state::AppState;

pub async fn list_services_v1(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<ServiceListResponse> {
    list_services_response(&state, &name, DEFAULT_WORKSPACE_ID)
}

pub async fn list_services(
    State(state): State<AppState>,
    Path((name, workspace_id)): Path<(String, String)>,
) -> Json<ServiceListResponse> {
    list_services_response(&state, &name, &workspace_id)
}

fn list_services_response(state: &AppState, namespace: &str, workspace_id: &str) -> Json<ServiceListResponse> {
    let (services, status, debug) = state.service_cache.get_services_list(namespace, workspace_id);
    Json(ServiceListResponse { services, status, debug })
}

pub async fn start_discovery_v1(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(name): Path<String>,
) -> Result<StatusCode, CustomError> {
    start_discovery_inner(&state, ctx, &name, DEFAULT_WORKSPACE_ID).await
}

pub async fn start_discovery(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path((name, workspace_id)): Path<(String, String)>,
) -> Result<StatusCode, CustomError> {
    start_discovery_inner(&state, ctx, &name, &workspace_id).await
}

async fn start_discovery_inner(
    state: &AppState,
    ctx: SecurityContext,
    namespace: &str,
    workspace_id: &str,
) -> Result<StatusCode, CustomError> {
    state.discovery.start_discovery(ctx, namespace, workspace_id).await.map_err(|e| {
        error!("Failed to start discovery process: {}", e);
        e
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn list_service_names(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ServiceNamesResponse>, CustomError> {
    let service_names = state.list_service.list_service_names(&name).await.map_err(|e| {
        error!("Failed to list service names: {}", e);
        e
    })?;
    Ok(Json(ServiceNamesResponse { service_names }))
}

pub async fn list_service_items(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ServiceItemsResponse>, CustomError> {
    let service_items = state.list_service.list_service_items(&name).await.map_err(|e| {
        error!("Failed to list service items: {}", e);
        e
    })?;
    Ok(Json(ServiceItemsResponse { service_items }))
}
