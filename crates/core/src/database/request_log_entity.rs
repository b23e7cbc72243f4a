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

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use std::collections::BTreeMap;

use crate::audit::{AuditRecord, AuthStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "request_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub endpoint: String,
    pub method: String,
    pub subscriber_no: Option<String>,
    pub status_code: i32,
    pub ip_address: Option<String>,
    pub headers: Json,
    pub request_size: i64,
    pub response_size: i64,
    pub auth_status: String,
    pub duration_ms: i64,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl From<AuditRecord> for ActiveModel {
    fn from(record: AuditRecord) -> Self {
        let headers = serde_json::to_value(&record.headers).unwrap_or(Json::Null);
        ActiveModel {
            endpoint: Set(record.endpoint),
            method: Set(record.method),
            subscriber_no: Set(record.subscriber_no),
            status_code: Set(i32::from(record.status_code)),
            ip_address: Set(record.ip_address),
            headers: Set(headers),
            request_size: Set(clamp_i64(record.request_size)),
            response_size: Set(clamp_i64(record.response_size)),
            auth_status: Set(record.auth_status.to_string()),
            duration_ms: Set(clamp_i64(record.duration_ms)),
            timestamp: Set(record.timestamp),
            ..Default::default()
        }
    }
}

impl TryFrom<Model> for AuditRecord {
    type Error = crate::types::CoreError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let headers: BTreeMap<String, Option<String>> =
            serde_json::from_value(model.headers).unwrap_or_default();
        let auth_status: AuthStatus = model.auth_status.parse()?;

        Ok(AuditRecord {
            endpoint: model.endpoint,
            method: model.method,
            subscriber_no: model.subscriber_no,
            status_code: u16::try_from(model.status_code).unwrap_or_default(),
            ip_address: model.ip_address,
            headers,
            request_size: u64::try_from(model.request_size).unwrap_or_default(),
            response_size: u64::try_from(model.response_size).unwrap_or_default(),
            auth_status,
            duration_ms: u64::try_from(model.duration_ms).unwrap_or_default(),
            timestamp: model.timestamp,
        })
    }
}
