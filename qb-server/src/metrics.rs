use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use serde::Serialize;

/// Process-wide counters rendered by `/metrics`.
pub struct ServiceMetrics {
    started_at: Instant,
    upstream_requests_total: AtomicU64,
    upstream_errors_total: AtomicU64,
    sample_cache_hits_total: AtomicU64,
    answers_created_total: AtomicU64,
    explore_queries_total: AtomicU64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub upstream_requests_total: u64,
    pub upstream_errors_total: u64,
    pub sample_cache_hits_total: u64,
    pub answers_created_total: u64,
    pub explore_queries_total: u64,
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            upstream_requests_total: AtomicU64::new(0),
            upstream_errors_total: AtomicU64::new(0),
            sample_cache_hits_total: AtomicU64::new(0),
            answers_created_total: AtomicU64::new(0),
            explore_queries_total: AtomicU64::new(0),
        }
    }
}

impl ServiceMetrics {
    pub fn record_upstream_request(&self) {
        self.upstream_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_cache_hit(&self) {
        self.sample_cache_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_answer_created(&self) {
        self.answers_created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_explore_query(&self) {
        self.explore_queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_seconds: self.started_at.elapsed().as_secs(),
            upstream_requests_total: self.upstream_requests_total.load(Ordering::Relaxed),
            upstream_errors_total: self.upstream_errors_total.load(Ordering::Relaxed),
            sample_cache_hits_total: self.sample_cache_hits_total.load(Ordering::Relaxed),
            answers_created_total: self.answers_created_total.load(Ordering::Relaxed),
            explore_queries_total: self.explore_queries_total.load(Ordering::Relaxed),
        }
    }

    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            concat!(
                "qb_uptime_seconds {}\n",
                "qb_upstream_requests_total {}\n",
                "qb_upstream_errors_total {}\n",
                "qb_sample_cache_hits_total {}\n",
                "qb_answers_created_total {}\n",
                "qb_explore_queries_total {}\n"
            ),
            snapshot.uptime_seconds,
            snapshot.upstream_requests_total,
            snapshot.upstream_errors_total,
            snapshot.sample_cache_hits_total,
            snapshot.answers_created_total,
            snapshot.explore_queries_total,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_every_counter() {
        let metrics = ServiceMetrics::default();
        metrics.record_upstream_request();
        metrics.record_upstream_request();
        metrics.record_upstream_error();
        metrics.record_sample_cache_hit();

        let text = metrics.render();
        assert!(text.contains("qb_upstream_requests_total 2\n"));
        assert!(text.contains("qb_upstream_errors_total 1\n"));
        assert!(text.contains("qb_sample_cache_hits_total 1\n"));
        assert!(text.contains("qb_explore_queries_total 0\n"));
        assert_eq!(text.lines().count(), 6);
    }
}
