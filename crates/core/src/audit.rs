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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Authenticated,
    MissingToken,
    InvalidToken,
    TokenProvided,
    NoAuth,
}

impl AuthStatus {
    /// Classify a finished request.
    pub fn derive(has_auth_header: bool, claims_attached: bool, status_code: u16) -> Self {
        if !has_auth_header {
            return AuthStatus::NoAuth;
        }
        if claims_attached {
            AuthStatus::Authenticated
        } else if status_code == 401 {
            AuthStatus::MissingToken
        } else if status_code == 403 {
            AuthStatus::InvalidToken
        } else {
            AuthStatus::TokenProvided
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::MissingToken => "missing_token",
            AuthStatus::InvalidToken => "invalid_token",
            AuthStatus::TokenProvided => "token_provided",
            AuthStatus::NoAuth => "no_auth",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthStatus {
    type Err = crate::types::CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "authenticated" => Ok(AuthStatus::Authenticated),
            "missing_token" => Ok(AuthStatus::MissingToken),
            "invalid_token" => Ok(AuthStatus::InvalidToken),
            "token_provided" => Ok(AuthStatus::TokenProvided),
            "no_auth" => Ok(AuthStatus::NoAuth),
            other => Err(crate::types::CoreError::InvalidInput(format!(
                "unknown auth status: {}",
                other
            ))),
        }
    }
}

/// One completed request. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub endpoint: String,
    pub method: String,
    pub subscriber_no: Option<String>,
    pub status_code: u16,
    pub ip_address: Option<String>,
    /// Allow-listed request headers; `None` when the header was absent.
    pub headers: BTreeMap<String, Option<String>>,
    pub request_size: u64,
    pub response_size: u64,
    pub auth_status: AuthStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(endpoint: String, method: String, status_code: u16, auth_status: AuthStatus) -> Self {
        Self {
            endpoint,
            method,
            subscriber_no: None,
            status_code,
            ip_address: None,
            headers: BTreeMap::new(),
            request_size: 0,
            response_size: 0,
            auth_status,
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_subscriber(mut self, subscriber_no: Option<String>) -> Self {
        self.subscriber_no = subscriber_no;
        self
    }

    pub fn with_ip_address(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, Option<String>>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_sizes(mut self, request_size: u64, response_size: u64) -> Self {
        self.request_size = request_size;
        self.response_size = response_size;
        self
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Inclusive time range used by quota queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Append-only store of audit records. Implementations must accept
/// concurrent appends from many in-flight requests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<()>;

    /// Count records for `subscriber_no` whose endpoint contains
    /// `endpoint_family` and whose timestamp falls inside `window`.
    async fn count_usage(
        &self,
        subscriber_no: &str,
        endpoint_family: &str,
        window: UsageWindow,
    ) -> Result<u64>;
}

pub type DynAuditSink = Arc<dyn AuditSink>;
