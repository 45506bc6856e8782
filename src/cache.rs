use crate::state::EngineState;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedReply {
    pub text: String,
    pub timestamp: i64,
}

/// Generate a hash key from model name and prompt
fn cache_key(model: &str, prompt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    prompt.hash(&mut hasher);
    hasher.finish()
}

/// Check cache and return the raw reply text if found
pub fn get_cached(state: &EngineState, model: &str, prompt: &str) -> Option<String> {
    let key = cache_key(model, prompt);
    let cache = state.response_cache.read();

    if let Some(cached) = cache.peek(&key) {
        tracing::debug!(
            model = model,
            prompt_preview = &prompt[..prompt.len().min(50)],
            "Cache hit"
        );
        state.metrics.record_cache_hit();
        return Some(cached.text.clone());
    }

    state.metrics.record_cache_miss();
    None
}

/// Store a raw reply in the cache
pub fn cache_reply(state: &EngineState, model: &str, prompt: &str, text: &str) {
    let key = cache_key(model, prompt);
    let cached = CachedReply {
        text: text.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    };

    let mut cache = state.response_cache.write();
    cache.put(key, cached);
}
