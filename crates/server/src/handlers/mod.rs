use crate::models::{HealthResponse, LoginRequest, LoginResponse};
use billgate_core::auth::{JwtAuthority, ROLE_SUBSCRIBER};
use billgate_core::{CoreError, Result};
use std::sync::Arc;
use validator::Validate;

pub mod proxy;

pub use proxy::UpstreamProxy;

pub struct ApiHandlers {
    authority: Arc<JwtAuthority>,
}

impl ApiHandlers {
    pub fn new(authority: Arc<JwtAuthority>) -> Self {
        Self { authority }
    }

    /// Issue a subscriber token for `req.username`.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse> {
        if req.validate().is_err() || req.username.trim().is_empty() {
            return Err(CoreError::InvalidInput("Username is required".to_string()));
        }

        let token = self.authority.issue(&req.username, ROLE_SUBSCRIBER)?;
        tracing::info!(username = req.username, "Token issued");
        Ok(LoginResponse { token })
    }

    pub async fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
        }
    }
}
