use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::error;

use crate::error::CustomError;
use crate::model::service::{AllServiceListResponse, DEFAULT_WORKSPACE_ID};
use crate::secctx::SecurityContext;
use crate::state::AppState;

pub async fn start_all_discovery_v1(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<StatusCode, CustomError> {
    start_all(&state, ctx, DEFAULT_WORKSPACE_ID)
}

pub async fn start_all_discovery(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(workspace_id): Path<String>,
) -> Result<StatusCode, CustomError> {
    start_all(&state, ctx, &workspace_id)
}

fn start_all(state: &AppState, ctx: SecurityContext, workspace_id: &str) -> Result<StatusCode, CustomError> {
    state.cloud.start_all_discovery(ctx, workspace_id).map_err(|e| {
        error!("Failed to start discovery all process: {}", e);
        e
    })?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn list_all_services_v1(State(state): State<AppState>) -> Json<AllServiceListResponse> {
    Json(state.cloud.get_all_services_list(DEFAULT_WORKSPACE_ID).await)
}

pub async fn list_all_services(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> Json<AllServiceListResponse> {
    Json(state.cloud.get_all_services_list(&workspace_id).await)
}
