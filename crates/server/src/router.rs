// Copyright © 2026 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error_handler::{handle_core_error, handle_panic, GatewayRejection};
use crate::gateway::Gateway;
use crate::handlers::{ApiHandlers, UpstreamProxy};
use crate::middleware::gateway_middleware_fn;
use crate::models::{HealthResponse, LoginRequest};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use billgate_core::CoreError;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub handlers: Arc<ApiHandlers>,
    pub upstream: Arc<UpstreamProxy>,
}

/// Build the HTTP surface. `/health` answers directly; every other path goes
/// through the gateway and is either served locally (login) or forwarded.
pub fn create_router(state: AppState, gateway: Arc<Gateway>, request_timeout: Duration) -> Router {
    let api_routes = Router::new()
        .route("/api/v1/auth/login", post(handle_login))
        .fallback(handle_forward)
        .with_state(state.clone())
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/health", get(handle_health))
        .with_state(state)
        .merge(with_gateway(api_routes, gateway))
        .layer(TraceLayer::new_for_http())
}

/// Put `inner` behind the gateway. Panics inside `inner` become 500
/// responses before the gateway observes them, so they are still audited.
pub fn with_gateway(inner: Router, gateway: Arc<Gateway>) -> Router {
    inner
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(axum::middleware::from_fn_with_state(
            gateway,
            gateway_middleware_fn,
        ))
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.handlers.health().await)
}

async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return GatewayRejection::UsernameRequired.into_response();
    };

    match state.handlers.login(req).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => login_error_response(e),
    }
}

fn login_error_response(error: CoreError) -> Response {
    match error {
        CoreError::InvalidInput(_) => GatewayRejection::UsernameRequired.into_response(),
        e => {
            tracing::error!(error = %e, "Failed to issue token");
            GatewayRejection::LoginFailed.into_response()
        }
    }
}

async fn handle_forward(State(state): State<AppState>, req: Request<Body>) -> Response {
    match state.upstream.forward(req).await {
        Ok(response) => response,
        Err(CoreError::UpstreamError(_)) => GatewayRejection::UpstreamUnavailable.into_response(),
        Err(e) => handle_core_error(e),
    }
}
