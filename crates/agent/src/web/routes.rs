use axum::extract::{Path, State};
use axum::Json;
use tracing::error;

use crate::error::CustomError;
use crate::model::service::RouteView;
use crate::state::AppState;

pub async fn get_route_by_name(
    State(state): State<AppState>,
    Path((name, route_name)): Path<(String, String)>,
) -> Result<Json<RouteView>, CustomError> {
    let route = state.routes_service.get_route_by_name(&name, &route_name).await.map_err(|e| {
        error!("Failed to get route by name: {}", e);
        e
    })?;
    Ok(Json(route))
}
