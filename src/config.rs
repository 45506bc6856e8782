use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model identifier handed to the text-generation endpoint
    pub model: String,
    /// Chat endpoint URL (any Ollama-compatible transport)
    pub endpoint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Timeout for one outbound model call, in seconds
    pub call_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            model: "qwen2.5:7b-instruct".to_string(),
            endpoint: "http://localhost:11434/api/chat".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            call_timeout_secs: 20,
        }
    }
}

fn get_config_path() -> PathBuf {
    // Use platform-specific app data directory
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push("Library/Application Support/com.cram.engine");
            dir.push("engine.toml");
            return dir;
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            let mut dir = PathBuf::from(appdata);
            dir.push("com.cram.engine");
            dir.push("engine.toml");
            return dir;
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let mut dir = PathBuf::from(home);
            dir.push(".local/share/com.cram.engine");
            dir.push("engine.toml");
            return dir;
        }
    }

    // Fallback
    PathBuf::from("engine.toml")
}

fn load_engine_config_internal() -> EngineConfig {
    let config_path = get_config_path();

    if let Ok(content) = fs::read_to_string(&config_path) {
        match toml::from_str::<EngineConfig>(&content) {
            Ok(config) => {
                tracing::info!(path = ?config_path, "Loaded engine config");
                return config;
            }
            Err(e) => {
                tracing::warn!(path = ?config_path, error = %e, "Failed to parse engine.toml, using defaults");
            }
        }
    }

    EngineConfig::default()
}

lazy_static! {
    static ref ENGINE_CONFIG: EngineConfig = load_engine_config_internal();
}

/// Get the cached engine configuration (loaded once at startup)
pub fn get_engine_config() -> &'static EngineConfig {
    &ENGINE_CONFIG
}
