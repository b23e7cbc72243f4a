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

//! Daily per-subscriber quota computed from audit history.
//!
//! The limiter keeps no counters of its own. Two concurrent requests can
//! both observe a count below the threshold and both be admitted.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Timelike, Utc};
use tracing::debug;

use crate::audit::{DynAuditSink, UsageWindow};
use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub subscriber_no: String,
    pub endpoint_family: String,
    pub day: NaiveDate,
}

impl RateLimitKey {
    pub fn new<Tz: TimeZone>(
        subscriber_no: &str,
        endpoint_family: &str,
        as_of: DateTime<Utc>,
        tz: &Tz,
    ) -> Self {
        Self {
            subscriber_no: subscriber_no.to_string(),
            endpoint_family: endpoint_family.to_string(),
            day: as_of.with_timezone(tz).date_naive(),
        }
    }
}

/// Midnight of `as_of`'s calendar day in `tz`, expressed in UTC.
pub fn day_start<Tz: TimeZone>(as_of: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = as_of.with_timezone(tz);
    let midnight = local.date_naive().and_time(chrono::NaiveTime::MIN);

    match tz.from_local_datetime(&midnight).earliest() {
        Some(start) => start.with_timezone(&Utc),
        // midnight skipped by a DST transition
        None => as_of - Duration::seconds(i64::from(local.num_seconds_from_midnight())),
    }
}

#[derive(Clone)]
pub struct DailyQuotaLimiter {
    sink: DynAuditSink,
    threshold: u64,
}

impl DailyQuotaLimiter {
    pub fn new(sink: DynAuditSink, threshold: u64) -> Self {
        Self { sink, threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Server-local calendar day.
    pub async fn is_exceeded(
        &self,
        subscriber_no: &str,
        endpoint_family: &str,
        as_of: DateTime<Utc>,
    ) -> Result<bool> {
        self.is_exceeded_in(subscriber_no, endpoint_family, as_of, &Local)
            .await
    }

    pub async fn is_exceeded_in<Tz: TimeZone>(
        &self,
        subscriber_no: &str,
        endpoint_family: &str,
        as_of: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<bool> {
        let key = RateLimitKey::new(subscriber_no, endpoint_family, as_of, tz);
        let window = UsageWindow {
            start: day_start(as_of, tz),
            end: as_of,
        };

        let used = self
            .sink
            .count_usage(&key.subscriber_no, &key.endpoint_family, window)
            .await?;

        debug!(
            subscriber = key.subscriber_no,
            endpoint_family = key.endpoint_family,
            day = %key.day,
            used = used,
            threshold = self.threshold,
            "Daily quota checked"
        );

        Ok(used >= self.threshold)
    }
}
