//! HTTP surface: route table, middleware stack and CORS.

pub mod api_docs;
pub mod cloud;
pub mod documents;
pub mod health;
pub mod namespaces;
pub mod proxy;
pub mod routes;
pub mod services;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tracing::warn;

use crate::security::middleware::{disabling_gate, handle_panic, secure, secure_proxy};
use crate::state::AppState;

const WRITE_TIMEOUT: Duration = Duration::from_secs(300);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

const KNOWN_PATH_PREFIXES: &[&str] = &["/api/", "/v3/", "/agents/", "/startup/", "/ready/", "/live/"];

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/namespaces", get(namespaces::list_namespaces))
        .route("/api/v1/namespaces/{name}/serviceNames", get(services::list_service_names))
        .route("/api/v1/namespaces/{name}/routes/{routeName}", get(routes::get_route_by_name))
        .route("/api/v1/namespaces/{name}/serviceItems", get(services::list_service_items))
        // v1 routes predate workspace scoping and imply the default workspace
        .route("/api/v1/namespaces/{name}/services", get(services::list_services_v1))
        .route("/api/v1/namespaces/{name}/discover", post(services::start_discovery_v1))
        .route(
            "/api/v1/namespaces/{name}/services/{serviceId}/specs/{fileId}",
            get(documents::get_service_document_v1),
        )
        .route(
            "/api/v2/namespaces/{name}/workspaces/{workspaceId}/services",
            get(services::list_services),
        )
        .route(
            "/api/v2/namespaces/{name}/workspaces/{workspaceId}/discover",
            post(services::start_discovery),
        )
        .route(
            "/api/v2/namespaces/{name}/workspaces/{workspaceId}/services/{serviceId}/specs/{fileId}",
            get(documents::get_service_document),
        )
        .route("/api/v1/discover", post(cloud::start_all_discovery_v1))
        .route("/api/v1/services", get(cloud::list_all_services_v1))
        .route("/api/v2/workspaces/{workspaceId}/discover", post(cloud::start_all_discovery))
        .route("/api/v2/workspaces/{workspaceId}/services", get(cloud::list_all_services))
        .route_layer(middleware::from_fn_with_state(state.clone(), secure));

    let proxy_routes = Router::new()
        .route(
            "/agents/{agentId}/namespaces/{name}/services/{serviceId}/proxy/",
            any(proxy::proxy),
        )
        .route(
            "/agents/{agentId}/namespaces/{name}/services/{serviceId}/proxy/{*path}",
            any(proxy::proxy),
        );
    let proxy_routes = if state.config.insecure_proxy {
        proxy_routes
    } else {
        proxy_routes.route_layer(middleware::from_fn_with_state(state.clone(), secure_proxy))
    };

    Router::new()
        .route("/v3/api-docs", get(api_docs::get_spec))
        .route("/live", get(health::live))
        .route("/ready", get(health::ready))
        .route("/startup", get(health::startup))
        .merge(protected)
        .merge(proxy_routes)
        .fallback(unknown_endpoint)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(state.clone(), disabling_gate))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TimeoutLayer::new(WRITE_TIMEOUT))
                .layer(RequestBodyTimeoutLayer::new(READ_TIMEOUT))
                .layer(cors_layer(&state)),
        )
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONNECTION,
            header::ACCEPT_ENCODING,
            header::CONTENT_ENCODING,
            header::HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ]);
    match state.config.origin_allowed.parse::<HeaderValue>() {
        Ok(origin) if !state.config.origin_allowed.is_empty() => cors.allow_origin(origin),
        _ => cors.allow_origin(AnyOrigin),
    }
}

/// Unknown endpoints under known prefixes answer with a diagnostic
/// payload instead of a bare 404.
async fn unknown_endpoint(req: axum::extract::Request) -> axum::response::Response {
    let path = req.uri().path().to_string();
    if KNOWN_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        warn!("Requested unknown endpoint: {} {}", req.method(), path);
        return (
            StatusCode::MISDIRECTED_REQUEST,
            Json(json!({
                "status": StatusCode::MISDIRECTED_REQUEST.as_u16(),
                "message": "Requested unknown endpoint",
            })),
        )
            .into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
