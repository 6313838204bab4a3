//! Atomic counters plus a fixed-size circular latency buffer for
//! p50/p95/p99, per the orchestrator's metrics contract.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

const LATENCY_BUFFER_CAPACITY: usize = 1000;

struct LatencyBuffer {
    slots: Vec<u64>,
    next: usize,
    filled: usize,
}

impl LatencyBuffer {
    fn new() -> Self {
        Self {
            slots: vec![0; LATENCY_BUFFER_CAPACITY],
            next: 0,
            filled: 0,
        }
    }

    fn push(&mut self, value_ms: u64) {
        self.slots[self.next] = value_ms;
        self.next = (self.next + 1) % LATENCY_BUFFER_CAPACITY;
        self.filled = (self.filled + 1).min(LATENCY_BUFFER_CAPACITY);
    }

    fn snapshot_sorted(&self) -> Vec<u64> {
        let mut copy = self.slots[..self.filled].to_vec();
        copy.sort_unstable();
        copy
    }
}

fn percentile(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((pct * sorted.len() as f64).ceil() as usize).saturating_sub(1);
    sorted[rank.min(sorted.len() - 1)]
}

/// Point-in-time view of accumulated metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub total_enrichments: u64,
    pub matches_found: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
    pub error_count: u64,
    pub timeout_count: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
}

/// Concurrency-safe metrics collector for the Context Bridge.
#[derive(Default)]
pub struct Metrics {
    total_enrichments: AtomicU64,
    matches_found: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_latency_ms: AtomicU64,
    max_latency_ms: AtomicU64,
    error_count: AtomicU64,
    timeout_count: AtomicU64,
    latencies: Mutex<Option<LatencyBuffer>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            latencies: Mutex::new(Some(LatencyBuffer::new())),
            ..Default::default()
        }
    }

    pub fn record_enrichment(&self, latency_ms: u64, match_count: u64) {
        self.total_enrichments.fetch_add(1, Ordering::Relaxed);
        self.matches_found.fetch_add(match_count, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);
        if let Some(buf) = self.latencies.lock().as_mut() {
            buf.push(latency_ms);
        }
        if latency_ms > 100 {
            tracing::warn!(latency_ms, "enrichment exceeded 100ms");
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let sorted = self
            .latencies
            .lock()
            .as_ref()
            .map(LatencyBuffer::snapshot_sorted)
            .unwrap_or_default();

        MetricsSnapshot {
            total_enrichments: self.total_enrichments.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            total_latency_ms: self.total_latency_ms.load(Ordering::Relaxed),
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            timeout_count: self.timeout_count.load(Ordering::Relaxed),
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = Metrics::new();
        m.record_enrichment(10, 2);
        m.record_enrichment(20, 1);
        m.record_cache_hit();
        m.record_error();
        m.record_timeout();

        let snap = m.snapshot();
        assert_eq!(snap.total_enrichments, 2);
        assert_eq!(snap.matches_found, 3);
        assert_eq!(snap.total_latency_ms, 30);
        assert_eq!(snap.max_latency_ms, 20);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.error_count, 1);
        assert_eq!(snap.timeout_count, 1);
    }

    #[test]
    fn percentiles_over_buffer() {
        let m = Metrics::new();
        for i in 1..=100u64 {
            m.record_enrichment(i, 0);
        }
        let snap = m.snapshot();
        assert_eq!(snap.p50_ms, 50);
        assert_eq!(snap.p95_ms, 95);
        assert_eq!(snap.p99_ms, 99);
    }

    #[test]
    fn buffer_wraps_past_capacity() {
        let m = Metrics::new();
        for i in 1..=1500u64 {
            m.record_enrichment(i, 0);
        }
        let snap = m.snapshot();
        assert_eq!(snap.max_latency_ms, 1500);
        // buffer only retains the most recent 1000 samples
        assert!(snap.p50_ms >= 500);
    }
}
