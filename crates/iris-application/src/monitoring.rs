//! Lightweight request metrics.
//!
//! Counters are plain atomics so recording never contends with request
//! handling. A snapshot is taken on demand and carries its own timestamp.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared request counters for the gateway.
///
/// Cheap to clone; clones share the same counters.
#[derive(Clone, Default)]
pub struct ServiceMetrics {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_latency_ms: f64,
    /// RFC3339 timestamp of when the snapshot was taken.
    pub timestamp: String,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency_ms: u64) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        self.inner
            .successful_requests
            .fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self, latency_ms: u64) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        self.inner.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.inner.total_requests.load(Ordering::Relaxed);
        let total_latency = self.inner.total_latency_ms.load(Ordering::Relaxed);
        let average = if total == 0 {
            0.0
        } else {
            total_latency as f64 / total as f64
        };

        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.inner.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.inner.failed_requests.load(Ordering::Relaxed),
            average_latency_ms: average,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
