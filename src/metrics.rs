use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for engine observability.
/// All metrics are atomic for thread-safety; cloning shares the counters.
#[derive(Clone, Default)]
pub struct Metrics {
    /// Plans produced by the deterministic builder
    pub plans_generated: Arc<AtomicU64>,
    /// Refinement requests processed
    pub refinements: Arc<AtomicU64>,
    /// Times the AI path failed and the baseline was returned
    pub ai_fallbacks: Arc<AtomicU64>,
    /// Model call latency in milliseconds (sum)
    pub model_latency_ms: Arc<AtomicU64>,
    /// Response cache hit count
    pub cache_hit_count: Arc<AtomicU64>,
    /// Response cache miss count
    pub cache_miss_count: Arc<AtomicU64>,
    /// Total errors across stages
    pub errors_total: Arc<AtomicU64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_plan_generated(&self) {
        self.plans_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refinement(&self) {
        self.refinements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ai_fallback(&self) {
        self.ai_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_latency(&self, ms: u64) {
        self.model_latency_ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hit_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_miss_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }
}
