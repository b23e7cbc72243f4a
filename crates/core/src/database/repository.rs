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
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tracing::debug;

use crate::audit::{AuditRecord, AuditSink, UsageWindow};
use crate::database::request_log_entity::{
    ActiveModel as RequestLogActiveModel, Column as RequestLogColumn, Entity as RequestLogEntity,
};
use crate::types::{CoreError, Result};

/// `request_logs` backed audit sink. Concurrent appends rely on the
/// database's own concurrency control.
#[derive(Clone)]
pub struct SeaOrmAuditSink {
    db: DatabaseConnection,
}

impl SeaOrmAuditSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<AuditRecord>> {
        let models = RequestLogEntity::find()
            .order_by_desc(RequestLogColumn::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| CoreError::DatabaseError(e.to_string()))?;

        models.into_iter().map(AuditRecord::try_from).collect()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.db.ping().await.map_err(CoreError::from)
    }
}

#[async_trait]
impl AuditSink for SeaOrmAuditSink {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        let active: RequestLogActiveModel = record.into();
        let inserted = active
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::DatabaseError(e.to_string()))?;

        debug!(id = inserted.id, endpoint = inserted.endpoint, "Request log stored");
        Ok(())
    }

    async fn count_usage(
        &self,
        subscriber_no: &str,
        endpoint_family: &str,
        window: UsageWindow,
    ) -> Result<u64> {
        RequestLogEntity::find()
            .filter(RequestLogColumn::SubscriberNo.eq(subscriber_no))
            .filter(RequestLogColumn::Endpoint.contains(endpoint_family))
            .filter(RequestLogColumn::Timestamp.gte(window.start))
            .filter(RequestLogColumn::Timestamp.lte(window.end))
            .count(&self.db)
            .await
            .map_err(|e| CoreError::DatabaseError(e.to_string()))
    }
}
