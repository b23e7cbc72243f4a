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

//! Quota decisions against a real `request_logs` table (in-memory SQLite).

use crate::audit::{AuditRecord, AuditSink, AuthStatus};
use crate::config::Config;
use crate::database::connect_audit_sink;
use crate::rate_limit::DailyQuotaLimiter;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn query_bill(subscriber: &str, at: DateTime<Utc>) -> AuditRecord {
    AuditRecord::new(
        "/api/v1/mobile/query-bill".to_string(),
        "POST".to_string(),
        200,
        AuthStatus::Authenticated,
    )
    .with_subscriber(Some(subscriber.to_string()))
    .with_timestamp(at)
}

#[tokio::test]
async fn test_quota_resets_next_day() {
    let config = Config::default();
    let sink = Arc::new(connect_audit_sink(&config.database).await.unwrap());
    let limiter = DailyQuotaLimiter::new(sink.clone(), config.gateway.daily_quota);
    let family = config.gateway.endpoint_family.as_str();

    for hour in ["08", "09", "10"] {
        sink.append(query_bill("555", utc(&format!("2026-03-10T{}:00:00Z", hour))))
            .await
            .unwrap();
    }

    let fourth = utc("2026-03-10T11:00:00Z");
    assert!(limiter
        .is_exceeded_in("555", family, fourth, &Utc)
        .await
        .unwrap());

    // another subscriber is unaffected
    assert!(!limiter
        .is_exceeded_in("556", family, fourth, &Utc)
        .await
        .unwrap());

    let next_day = utc("2026-03-11T08:00:00Z");
    assert!(!limiter
        .is_exceeded_in("555", family, next_day, &Utc)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_records_after_as_of_are_ignored() {
    let config = Config::default();
    let sink = Arc::new(connect_audit_sink(&config.database).await.unwrap());
    let limiter = DailyQuotaLimiter::new(sink.clone(), 3);

    for minute in ["10", "20", "30"] {
        sink.append(query_bill("555", utc(&format!("2026-03-10T12:{}:00Z", minute))))
            .await
            .unwrap();
    }

    let before = utc("2026-03-10T12:00:00Z");
    assert!(!limiter
        .is_exceeded_in("555", "/query-bill", before, &Utc)
        .await
        .unwrap());
    assert!(limiter
        .is_exceeded_in("555", "/query-bill", before + Duration::hours(1), &Utc)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_every_status_counts_toward_quota() {
    let config = Config::default();
    let sink = Arc::new(connect_audit_sink(&config.database).await.unwrap());
    let limiter = DailyQuotaLimiter::new(sink.clone(), 3);
    let at = utc("2026-03-10T09:00:00Z");

    // rejected calls are still calls to the endpoint family
    for (status, auth) in [
        (401, AuthStatus::NoAuth),
        (403, AuthStatus::InvalidToken),
        (429, AuthStatus::Authenticated),
    ] {
        let mut record = query_bill("555", at);
        record.status_code = status;
        record.auth_status = auth;
        sink.append(record).await.unwrap();
    }

    assert!(limiter
        .is_exceeded_in("555", "/query-bill", at + Duration::minutes(1), &Utc)
        .await
        .unwrap());
}
