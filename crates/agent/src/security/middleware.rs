use std::any::Any;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::CustomError;
use crate::state::AppState;

use super::CUSTOM_PROXY_ERROR_HEADER;

/// While the agent is disabled by a version mismatch every path except
/// the health probes answers 503.
pub async fn disabling_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path != "/live" && path != "/ready" && path != "/startup" {
        if let Some(err) = state.disabling.disabling_status() {
            return err.into_response();
        }
    }
    next.run(req).await
}

pub async fn secure(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match state.auth.authenticate(req.headers()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            debug!("Authorization failed(401): {}", e);
            CustomError { status: 401, code: String::new(), message: "Unauthorized".to_string(), params: Default::default(), debug: e }
                .into_response()
        }
    }
}

pub async fn secure_proxy(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match state.auth.authenticate_proxy(req.headers()).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => {
            debug!("Authorization failed(401): {}", e);
            let mut response = CustomError {
                status: 401,
                code: String::new(),
                message: "Unauthorized".to_string(),
                params: Default::default(),
                debug: e.clone(),
            }
            .into_response();
            if let Ok(value) = format!("Proxy authentication failed: {e}").parse() {
                response.headers_mut().insert(CUSTOM_PROXY_ERROR_HEADER, value);
            }
            response
        }
    }
}

/// Panics inside a handler become a 500 with the panic text as debug.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Request failed with panic: {}", detail);
    CustomError::internal("Internal Server Error", detail).into_response()
}
