use crate::gateway::Gateway;
use axum::extract::State;
use axum::middleware::Next;
use axum::{body::Body, http::Request, response::Response};
use std::sync::Arc;

pub mod utils;

/// Axum entry point for the gateway, installed with `from_fn_with_state`.
pub async fn gateway_middleware_fn(
    State(gateway): State<Arc<Gateway>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    gateway.intercept(req, next).await
}
