use thiserror::Error;

/// Unified error type for the entire cram codebase.
/// All fallible functions return Result<T, CramError> instead of String errors.
///
/// Only `InvalidInput` ever escapes the top-level generate/refine
/// operations; everything else is recovered by the fallback path.
#[derive(Debug, Error)]
pub enum CramError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("external service failure in {stage}: {message}")]
    ExternalService {
        stage: &'static str,
        message: String,
        model: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("operation timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

impl CramError {
    /// Create an external-service error with stage and message
    pub fn service<S: Into<String>>(message: S, stage: &'static str) -> Self {
        CramError::ExternalService {
            stage,
            message: message.into(),
            model: None,
        }
    }

    /// Add model context to an external-service error
    pub fn with_model<S: Into<String>>(mut self, name: S) -> Self {
        if let CramError::ExternalService { ref mut model, .. } = self {
            *model = Some(name.into());
        }
        self
    }

    /// True for every failure class the orchestrator recovers from by
    /// falling back to the deterministic baseline.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CramError::InvalidInput(_))
    }
}

impl From<anyhow::Error> for CramError {
    fn from(err: anyhow::Error) -> Self {
        CramError::service(err.to_string(), "model_call")
    }
}
