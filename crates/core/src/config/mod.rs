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

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::types::CoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration file error: {0}")]
    FileError(String),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::ConfigurationError(e.to_string())
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub host: String,
    pub http_port: u16,
    /// Peers allowed to set `X-Forwarded-For` / `X-Real-IP`.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "billgate".to_string(),
            host: "0.0.0.0".to_string(),
            http_port: 8000,
            trusted_proxies: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn http_addr(&self) -> ConfigResult<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("app.host={}", self.host)))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// When disabled the server keeps audit records in memory only.
    pub enabled: bool,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "sqlite::memory:".to_string(),
            max_connections: 20,
            min_connections: 1,
            acquire_timeout_seconds: 5,
            idle_timeout_seconds: 300,
        }
    }
}

impl DatabaseConfig {
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret shared with whoever issues bearer tokens.
    pub jwt_secret: String,
    pub token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_seconds: 3600,
        }
    }
}

/// Route matching below is substring containment against the path plus
/// query string, not prefix or exact matching: `/x/mobile/query-bill-old`
/// and `/x/pay?next=/bank/query-bill` are both protected.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub protected_routes: Vec<String>,
    pub rate_limited_route: String,
    /// Requests whose path and query contain this are never rate limited.
    pub rate_limit_exclusion: String,
    /// Substring identifying the audit records that count toward the quota.
    pub endpoint_family: String,
    pub daily_quota: u64,
    pub audited_headers: Vec<String>,
    /// JSON body field carrying the subscriber number.
    pub subscriber_field: String,
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            protected_routes: vec![
                "/mobile/query-bill".to_string(),
                "/mobile/query-bill-detailed".to_string(),
                "/bank/query-bill".to_string(),
                "/web/admin/add-bill".to_string(),
                "/web/admin/batch-upload".to_string(),
            ],
            rate_limited_route: "/mobile/query-bill".to_string(),
            rate_limit_exclusion: "detailed".to_string(),
            endpoint_family: "/query-bill".to_string(),
            daily_quota: 3,
            audited_headers: vec![
                "content-type".to_string(),
                "user-agent".to_string(),
                "accept".to_string(),
                "accept-language".to_string(),
                "origin".to_string(),
                "referer".to_string(),
            ],
            subscriber_field: "subscriberNo".to_string(),
            max_body_bytes: 1_048_576,
        }
    }
}

impl GatewayConfig {
    /// `endpoint` is the path together with its query string.
    pub fn is_protected(&self, endpoint: &str) -> bool {
        self.protected_routes
            .iter()
            .any(|route| endpoint.contains(route.as_str()))
    }

    pub fn is_rate_limited(&self, method: &str, path: &str, path_and_query: &str) -> bool {
        method == "POST"
            && path.contains(self.rate_limited_route.as_str())
            && !path_and_query.contains(self.rate_limit_exclusion.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load_from_file(path: &str) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileError(e.to_string()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Layer environment variables over the current values. `lookup` is
    /// `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("APP_HOST") {
            self.app.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.app.http_port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
            self.database.enabled = true;
        }
        if let Some(url) = lookup("UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "auth.jwt_secret (JWT_SECRET)".to_string(),
            ));
        }
        if self.gateway.daily_quota == 0 {
            return Err(ConfigError::InvalidValue(
                "gateway.daily_quota must be positive".to_string(),
            ));
        }
        if self.gateway.rate_limited_route.is_empty() || self.gateway.endpoint_family.is_empty() {
            return Err(ConfigError::InvalidValue(
                "gateway rate limit routes must not be empty".to_string(),
            ));
        }
        self.app.http_addr()?;
        Ok(())
    }
}
