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

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Display, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[display("Configuration error: {}", _0)]
    ConfigurationError(String),

    #[display("Database error: {}", _0)]
    DatabaseError(String),

    #[display("Token error: {}", _0)]
    TokenError(String),

    #[display("Invalid input: {}", _0)]
    InvalidInput(String),

    #[display("Upstream error: {}", _0)]
    UpstreamError(String),

    #[display("I/O error: {}", _0)]
    IoError(String),
}

impl CoreError {
    /// HTTP status code this error surfaces as when it reaches a client.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::InvalidInput(_) => 400,
            CoreError::TokenError(_) => 403,
            CoreError::UpstreamError(_) => 502,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::IoError(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for CoreError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        CoreError::TokenError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
