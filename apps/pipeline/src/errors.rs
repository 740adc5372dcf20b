use thiserror::Error;

/// Pipeline-level error type.
///
/// Every failure here is scoped to one analyze/apply invocation — nothing is
/// fatal to the process. The only construction-time failure is a missing
/// credential or model id, reported once by `PipelineConfig::from_env` /
/// `OpenAiClient::new`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed caller arguments, unsupported template or version.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity absent, or not owned by the caller. The two cases are
    /// indistinguishable on purpose: ownership failures must not leak existence.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity exists but is not in a usable state (analysis not completed,
    /// extracted text missing).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The completion call exceeded the configured deadline.
    #[error("Provider timeout after {timeout_secs}s (model {model})")]
    ProviderTimeout { model: String, timeout_secs: u64 },

    /// The provider reported a structured failure.
    #[error("Provider error ({error_type}): {message}")]
    Provider { message: String, error_type: String },

    /// The provider answered but the completion content was empty.
    #[error("Provider returned empty content")]
    EmptyResponse,

    /// Network-level failure talking to the provider.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller's cancellation signal fired while a call was outstanding.
    #[error("Invocation cancelled")]
    Cancelled,

    /// The model response is not valid JSON after all permitted repair
    /// attempts, or no JSON object could be located in it.
    #[error("Invalid LLM output: {0}")]
    InvalidLlmOutput(String),

    /// Valid JSON that fails the target schema's structural invariants.
    #[error("Invalid result schema: {0}")]
    InvalidResultSchema(String),

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PipelineError {
    /// Stable machine-readable code for operator-facing logs and API mapping.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "INVALID_INPUT",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            PipelineError::ProviderTimeout { .. } => "PROVIDER_TIMEOUT",
            PipelineError::Provider { .. } => "PROVIDER_ERROR",
            PipelineError::EmptyResponse => "EMPTY_RESPONSE",
            PipelineError::Transport(_) => "TRANSPORT_ERROR",
            PipelineError::Cancelled => "CANCELLED",
            PipelineError::InvalidLlmOutput(_) => "INVALID_LLM_OUTPUT",
            PipelineError::InvalidResultSchema(_) => "INVALID_RESULT_SCHEMA",
            PipelineError::RenderFailure(_) => "RENDER_FAILURE",
            PipelineError::StorageFailure(_) => "STORAGE_FAILURE",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
