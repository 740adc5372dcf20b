//! Scripted in-memory completion client for tests. Pops canned responses in
//! order and records every message sequence it was called with.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::llm_client::{CallOptions, ChatMessage, CompletionClient, CompletionResult, Usage};

/// Installs a per-test subscriber so `cargo test -- --nocapture` shows the
/// pipeline's log lines. Any test may call it; only the first install wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, PipelineError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, PipelineError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self::new(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_errors(errors: Vec<PipelineError>) -> Self {
        Self::new(errors.into_iter().map(Err).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The message sequence of the n-th call (0-based).
    pub fn recorded_messages(&self, index: usize) -> Vec<ChatMessage> {
        self.calls.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _model: &str,
        _opts: &CallOptions,
    ) -> Result<CompletionResult, PipelineError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted client called more times than scripted");
        next.map(|content| CompletionResult {
            content,
            usage: Some(Usage {
                prompt_tokens: Some(100),
                completion_tokens: Some(40),
                total_tokens: Some(140),
            }),
        })
    }
}
