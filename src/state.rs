use crate::breaker::ServiceBreaker;
use crate::cache::CachedReply;
use crate::metrics::Metrics;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Engine-wide state container.
/// All mutable state is centralized here and passed explicitly to functions.
/// Plan data itself is never stored here: every generate/refine call works
/// on its own copies, so requests stay independent.
#[derive(Clone)]
pub struct EngineState {
    /// Model response cache (LRU with bounded size)
    pub response_cache: Arc<RwLock<LruCache<u64, CachedReply>>>,
    /// Engine counters
    pub metrics: Metrics,
    /// Circuit breaker for the text-generation service
    pub breaker: ServiceBreaker,
}

impl EngineState {
    pub fn new() -> Self {
        EngineState {
            response_cache: Arc::new(RwLock::new(LruCache::new(
                NonZeroUsize::new(200).expect("200 > 0"),
            ))),
            metrics: Metrics::new(),
            breaker: ServiceBreaker::new(),
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}
