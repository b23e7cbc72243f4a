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

//! Bearer token verification and issuance (HS256 JWT).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::types::{CoreError, Result};

pub const ROLE_SUBSCRIBER: &str = "SUBSCRIBER";

/// Claims carried by a verified bearer token. Lives in the request
/// extensions for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject identifier.
    pub id: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

pub trait TokenVerifier: Send + Sync {
    /// Returns `None` for malformed, badly signed or expired tokens.
    fn verify(&self, token: &str) -> Option<AuthClaims>;
}

pub struct JwtAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_seconds: i64,
}

impl std::fmt::Debug for JwtAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthority")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl JwtAuthority {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.jwt_secret.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "JWT secret is not set".to_string(),
            ));
        }

        let secret = config.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_ttl_seconds: i64::try_from(config.token_ttl_seconds).unwrap_or(i64::MAX),
        })
    }

    /// Sign a token for `username`. The subject id is derived from the
    /// username so repeated logins yield the same subject.
    pub fn issue(&self, username: &str, role: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AuthClaims {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, username.as_bytes()).to_string(),
            username: username.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now.saturating_add(self.token_ttl_seconds),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &AuthClaims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(CoreError::from)
    }
}

impl TokenVerifier for JwtAuthority {
    fn verify(&self, token: &str) -> Option<AuthClaims> {
        match jsonwebtoken::decode::<AuthClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
                None
            }
        }
    }
}
