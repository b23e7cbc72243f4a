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

use crate::models::ErrorBody;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billgate_core::types::error::CoreError;
use std::any::Any;

/// Responses the gateway produces without consulting the downstream handler,
/// or in place of one that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayRejection {
    MissingToken,
    InvalidToken,
    QuotaExceeded,
    PayloadTooLarge,
    InvalidBody,
    UsernameRequired,
    LoginFailed,
    UpstreamUnavailable,
    Internal,
}

impl GatewayRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayRejection::MissingToken => StatusCode::UNAUTHORIZED,
            GatewayRejection::InvalidToken => StatusCode::FORBIDDEN,
            GatewayRejection::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            GatewayRejection::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayRejection::InvalidBody => StatusCode::BAD_REQUEST,
            GatewayRejection::UsernameRequired => StatusCode::BAD_REQUEST,
            GatewayRejection::LoginFailed => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayRejection::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            GatewayRejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GatewayRejection::MissingToken => "Token is required (Authorization header missing)",
            GatewayRejection::InvalidToken => "Invalid or expired token",
            GatewayRejection::QuotaExceeded => "Daily limit exceeded (Gateway Blocked)",
            GatewayRejection::PayloadTooLarge => "Request body too large",
            GatewayRejection::InvalidBody => "Invalid request body",
            GatewayRejection::UsernameRequired => "Username is required",
            GatewayRejection::LoginFailed => "Login failed",
            GatewayRejection::UpstreamUnavailable => "Upstream unavailable",
            GatewayRejection::Internal => "Internal server error",
        }
    }
}

impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.message()))).into_response()
    }
}

/// Convert CoreError to HTTP response
pub fn handle_core_error(error: CoreError) -> Response {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    // server-side failures are not echoed to clients
    let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
        tracing::error!("Unhandled error: {}", error);
        GatewayRejection::Internal.message().to_string()
    } else {
        error.to_string()
    };

    (status, Json(ErrorBody::new(message))).into_response()
}

/// Response used by the panic-catching layer in front of downstream handlers.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = detail, "Downstream handler panicked");
    GatewayRejection::Internal.into_response()
}
