use crate::breaker::backoff_delay_ms;
use crate::cache::{cache_reply, get_cached};
use crate::config::get_engine_config;
use crate::error::CramError;
use crate::state::EngineState;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::OnceLock;
use tokio::time::{timeout, Duration, Instant};

const MAX_RETRIES: u32 = 2;

/// One entry in the ordered message list sent to the text-generation
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[allow(dead_code)]
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

/// Reusable HTTP client singleton (created once, reused for all requests)
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to create HTTP client")
    })
}

/// Chat transport over an Ollama-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OllamaChat {
    pub model: String,
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OllamaChat {
    pub fn from_config() -> Self {
        let config = get_engine_config();
        OllamaChat {
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }

    async fn call(&self, messages: &[ChatMessage]) -> Result<String> {
        let result = timeout(self.timeout, async {
            let client = get_http_client();

            let response = client
                .post(&self.endpoint)
                .json(&ChatRequest {
                    model: &self.model,
                    messages,
                    stream: true,
                    options: ChatOptions {
                        temperature: self.temperature,
                        num_predict: self.max_tokens,
                    },
                })
                .send()
                .await
                .with_context(|| format!("Failed to reach chat endpoint for '{}'", self.model))?;

            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("Model '{}' returned HTTP {}", self.model, status);
            }

            let text = response
                .text()
                .await
                .with_context(|| format!("Failed to read response from '{}'", self.model))?;

            // Streaming response: one JSON object per line
            let mut full_response = String::new();
            for line in text.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(chunk) = serde_json::from_str::<ChatChunk>(line) {
                    if let Some(message) = chunk.message {
                        full_response.push_str(&message.content);
                    }
                    if chunk.done {
                        break;
                    }
                }
            }

            if full_response.is_empty() {
                anyhow::bail!("Model '{}' returned empty response", self.model);
            }

            Ok(full_response)
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => anyhow::bail!(
                "Model '{}' call timed out after {}s",
                self.model,
                self.timeout.as_secs()
            ),
        }
    }
}

/// Scripted transport for tests and offline embedders: replies are consumed
/// in order; an exhausted script behaves like a dead service.
pub struct CannedChat {
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl CannedChat {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        CannedChat {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    async fn call(&self) -> Result<String> {
        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => anyhow::bail!("{}", message),
            None => anyhow::bail!("no scripted reply left"),
        }
    }
}

/// Unified model transport. Any backend satisfying the chat contract
/// (model id, ordered role/content messages, temperature, max tokens)
/// slots in here.
pub enum ModelClient {
    Ollama(OllamaChat),
    Canned(CannedChat),
}

impl ModelClient {
    pub fn from_config() -> Self {
        ModelClient::Ollama(OllamaChat::from_config())
    }

    pub fn name(&self) -> &str {
        match self {
            ModelClient::Ollama(m) => &m.model,
            ModelClient::Canned(_) => "canned",
        }
    }

    async fn call_raw(&self, messages: &[ChatMessage]) -> Result<String> {
        match self {
            ModelClient::Ollama(m) => m.call(messages).await,
            ModelClient::Canned(m) => m.call().await,
        }
    }

    /// One chat completion with caching, circuit breaking, and retry with
    /// exponential backoff. Returns the raw reply text; parsing is the
    /// caller's concern.
    pub async fn chat(
        &self,
        state: &EngineState,
        messages: &[ChatMessage],
    ) -> Result<String, CramError> {
        let prompt_key = serde_json::to_string(messages)?;

        if let Some(cached) = get_cached(state, self.name(), &prompt_key) {
            return Ok(cached);
        }

        if state.breaker.is_open() {
            state.metrics.record_error();
            return Err(CramError::service("circuit open, call refused", "model_call")
                .with_model(self.name()));
        }

        for attempt in 0..=MAX_RETRIES {
            let attempt_start = Instant::now();
            match self.call_raw(messages).await {
                Ok(reply) => {
                    let latency_ms = attempt_start.elapsed().as_millis() as u64;
                    state.metrics.record_model_latency(latency_ms);
                    state.breaker.record_success();
                    tracing::info!(
                        model = self.name(),
                        latency_ms = latency_ms,
                        attempt = attempt,
                        "Model call succeeded"
                    );
                    cache_reply(state, self.name(), &prompt_key, &reply);
                    return Ok(reply);
                }
                Err(e) => {
                    state.breaker.record_failure();
                    state.metrics.record_error();
                    if attempt < MAX_RETRIES {
                        let delay_ms = backoff_delay_ms(attempt);
                        tracing::warn!(
                            model = self.name(),
                            error = %e,
                            attempt = attempt + 1,
                            delay_ms = delay_ms,
                            "Model call failed, retrying with backoff"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    } else {
                        tracing::error!(
                            model = self.name(),
                            error = %e,
                            attempts = MAX_RETRIES + 1,
                            "Model call failed after all retries"
                        );
                        return Err(CramError::service(
                            format!("failed after {} attempts: {}", MAX_RETRIES + 1, e),
                            "model_call",
                        )
                        .with_model(self.name()));
                    }
                }
            }
        }

        unreachable!()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_replies_come_back_in_order() {
        let state = EngineState::new();
        let model = ModelClient::Canned(CannedChat::new(vec![Ok("first".into())]));
        let messages = vec![ChatMessage::user("hello")];
        let reply = model.chat(&state, &messages).await.unwrap();
        assert_eq!(reply, "first");

        // Second identical call is served from the cache.
        let reply = model.chat(&state, &messages).await.unwrap();
        assert_eq!(reply, "first");
    }

    #[tokio::test]
    async fn scripted_failure_surfaces_as_service_error() {
        let state = EngineState::new();
        let model = ModelClient::Canned(CannedChat::new(vec![
            Err("HTTP 500".into()),
            Err("HTTP 500".into()),
            Err("HTTP 500".into()),
        ]));
        let messages = vec![ChatMessage::user("hello")];
        let err = model.chat(&state, &messages).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("model_call"));
    }
}
