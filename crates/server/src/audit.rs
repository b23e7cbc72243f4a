use async_trait::async_trait;
use billgate_core::audit::{AuditRecord, AuditSink, UsageWindow};
use billgate_core::types::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Bounded in-memory audit store. Oldest records are evicted once
/// `max_records` is reached, which also drops them from quota counts.
#[derive(Clone)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<VecDeque<AuditRecord>>>,
    max_records: usize,
    total_appended: Arc<AtomicU64>,
}

impl MemoryAuditSink {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(max_records.min(4096)))),
            max_records: max_records.max(1),
            total_appended: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn get_recent_records(&self, limit: usize) -> Vec<AuditRecord> {
        let records = self.records.lock().await;
        records.iter().rev().take(limit).cloned().collect()
    }

    pub fn total_appended(&self) -> u64 {
        self.total_appended.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        let mut records = self.records.lock().await;

        while records.len() >= self.max_records {
            records.pop_front();
        }

        info!(
            endpoint = record.endpoint,
            method = record.method,
            status = record.status_code,
            auth_status = %record.auth_status,
            duration_ms = record.duration_ms,
            "Request log recorded"
        );

        records.push_back(record);
        self.total_appended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn count_usage(
        &self,
        subscriber_no: &str,
        endpoint_family: &str,
        window: UsageWindow,
    ) -> Result<u64> {
        let records = self.records.lock().await;
        let used = records
            .iter()
            .filter(|r| r.subscriber_no.as_deref() == Some(subscriber_no))
            .filter(|r| r.endpoint.contains(endpoint_family))
            .filter(|r| window.contains(r.timestamp))
            .count();
        Ok(used as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billgate_core::audit::AuthStatus;
    use chrono::{Duration, Utc};

    fn record(endpoint: &str, subscriber: Option<&str>) -> AuditRecord {
        AuditRecord::new(
            endpoint.to_string(),
            "POST".to_string(),
            200,
            AuthStatus::NoAuth,
        )
        .with_subscriber(subscriber.map(str::to_string))
    }

    #[tokio::test]
    async fn test_memory_sink_creation() {
        let sink = MemoryAuditSink::new(100);
        assert_eq!(sink.total_appended(), 0);
        assert!(sink.is_empty().await);
    }

    #[tokio::test]
    async fn test_append_and_recent() {
        let sink = MemoryAuditSink::new(10);
        sink.append(record("/a", None)).await.unwrap();
        sink.append(record("/b", None)).await.unwrap();

        let recent = sink.get_recent_records(5).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].endpoint, "/b");
        assert_eq!(sink.total_appended(), 2);
    }

    #[tokio::test]
    async fn test_eviction() {
        let sink = MemoryAuditSink::new(2);
        for endpoint in ["/a", "/b", "/c"] {
            sink.append(record(endpoint, None)).await.unwrap();
        }
        assert_eq!(sink.len().await, 2);
        assert_eq!(sink.total_appended(), 3);
        assert_eq!(sink.get_recent_records(5).await[1].endpoint, "/b");
    }

    #[tokio::test]
    async fn test_count_usage() {
        let sink = MemoryAuditSink::new(100);
        sink.append(record("/api/v1/mobile/query-bill", Some("555")))
            .await
            .unwrap();
        sink.append(record("/api/v1/bank/query-bill", Some("555")))
            .await
            .unwrap();
        sink.append(record("/api/v1/web/pay-bill", Some("555")))
            .await
            .unwrap();
        sink.append(record("/api/v1/mobile/query-bill", Some("777")))
            .await
            .unwrap();
        sink.append(
            record("/api/v1/mobile/query-bill", Some("555"))
                .with_timestamp(Utc::now() - Duration::days(1)),
        )
        .await
        .unwrap();

        let window = UsageWindow {
            start: Utc::now() - Duration::hours(1),
            end: Utc::now() + Duration::seconds(1),
        };
        assert_eq!(sink.count_usage("555", "/query-bill", window).await.unwrap(), 2);
        assert_eq!(sink.count_usage("777", "/query-bill", window).await.unwrap(), 1);
        assert_eq!(sink.len().await, 5);
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let sink = MemoryAuditSink::new(1000);
        let mut handles = Vec::new();
        for i in 0..50 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.append(record(&format!("/r/{}", i), None)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(sink.len().await, 50);
    }
}
