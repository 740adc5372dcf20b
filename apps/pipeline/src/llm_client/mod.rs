//! Completion gateway — the single point of entry for all LLM calls.
//!
//! ARCHITECTURAL RULE: no other module talks to the provider directly.
//! Every call goes through `CompletionClient`, and new providers are added
//! by implementing that trait, never by branching inside this gateway.
//!
//! The concrete `OpenAiClient` speaks the chat-completions wire shape and
//! owns the model-specific quirks: a JSON-object response format on every
//! request, a fixed temperature of 0 that is omitted entirely for models
//! that reject it, and a single retry without temperature when the provider
//! rejects the parameter at runtime. Request budget is at most two calls per
//! invocation — never more.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::models::analysis::AnalyzeInput;
use crate::prompts::ResolvedTemplate;

/// Fixed sampling temperature for models that accept one.
pub const FIXED_TEMPERATURE: f32 = 0.0;

/// Model-name prefixes known to reject a fixed temperature regardless of the
/// configured denylist.
const TEMPERATURE_FREE_FAMILIES: [&str; 4] = ["o1", "o3", "o4", "gpt-5"];

// ────────────────────────────────────────────────────────────────────────────
// Message and result types
// ────────────────────────────────────────────────────────────────────────────

/// Message role. `Developer` carries the schema instructions on models that
/// support it; providers that don't are expected to map it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Developer => "developer",
            Role::User => "user",
        }
    }
}

/// One role-tagged message. An ordered sequence forms exactly one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Token usage counters as reported by the provider. Logged for
/// observability, never used for control flow.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Raw outcome of one successful completion call.
#[derive(Debug, Clone)]
pub struct CompletionResult {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Per-call options. These used to be ambient side channels in the source
/// system; they are explicit fields here so every dependency of a call is
/// visible at its call site.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Requested schema tag, included in the per-call usage log line.
    pub schema_tag: Option<String>,
    /// Extra system message appended after the template's own system prompt.
    pub extra_system: Option<String>,
    /// Cancellation signal for this invocation. A fired token surfaces as
    /// `Cancelled`, not as a transport error.
    pub cancel: Option<CancelToken>,
}

// ────────────────────────────────────────────────────────────────────────────
// Client trait
// ────────────────────────────────────────────────────────────────────────────

/// The pluggable completion capability. Exactly two operations: a minimal
/// "complete these messages" and a richer "complete until the content is
/// syntactically valid JSON" with one bounded repair attempt. Held as
/// `Arc<dyn CompletionClient>` by the services.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// One completion call. No retries beyond the gateway's internal
    /// temperature-rejection retry.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        opts: &CallOptions,
    ) -> Result<CompletionResult, PipelineError>;

    /// Completion whose content must be syntactically valid JSON. Runs the
    /// two-state repair loop: direct attempt, then at most one repair call
    /// embedding the malformed output. Never issues a third call.
    async fn complete_json(
        &self,
        resolved: &ResolvedTemplate,
        input: &AnalyzeInput,
        model: &str,
        opts: &CallOptions,
    ) -> Result<String, PipelineError> {
        crate::analysis::repair::run(self, resolved, input, model, opts, None)
            .await
            .map(|outcome| outcome.content)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible provider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Provider-backed gateway speaking the OpenAI chat-completions shape.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    timeout: Duration,
    temperature_denylist: Vec<String>,
}

impl OpenAiClient {
    /// Fails once, at construction, on a misconfigured transport — nothing
    /// past this point is fatal to the process.
    pub fn new(config: &PipelineConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            temperature_denylist: config.temperature_denylist.clone(),
        })
    }

    /// Whether the temperature field must be omitted for this model:
    /// configured denylist (exact name or prefix) or a family known to
    /// reject fixed temperature.
    fn temperature_omitted(&self, model: &str) -> bool {
        self.temperature_denylist
            .iter()
            .any(|entry| model == entry || model.starts_with(entry.as_str()))
            || TEMPERATURE_FREE_FAMILIES
                .iter()
                .any(|family| model.starts_with(family))
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        model: &str,
        opts: &CallOptions,
        include_temperature: bool,
    ) -> Result<CompletionResult, PipelineError> {
        let body = ChatRequest {
            model,
            messages: assemble_wire(messages, opts.extra_system.as_deref()),
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: include_temperature.then_some(FIXED_TEMPERATURE),
        };

        let response = guard(
            async {
                self.http
                    .post(&self.api_url)
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(classify_transport(model, self.timeout))
            },
            opts.cancel.as_ref(),
            self.timeout,
            model,
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = error_body_or_abort(
                guard(
                    async { response.text().await.map_err(PipelineError::Transport) },
                    opts.cancel.as_ref(),
                    self.timeout,
                    model,
                )
                .await,
            )?;
            let (message, error_type) = match serde_json::from_str::<ApiError>(&raw) {
                Ok(parsed) => (
                    parsed.error.message,
                    parsed.error.error_type.unwrap_or_else(|| "unknown".into()),
                ),
                Err(_) => (raw, format!("http_{}", status.as_u16())),
            };
            return Err(PipelineError::Provider {
                message,
                error_type,
            });
        }

        let parsed: ChatResponse = guard(
            async { response.json().await.map_err(PipelineError::Transport) },
            opts.cancel.as_ref(),
            self.timeout,
            model,
        )
        .await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(PipelineError::EmptyResponse);
        }

        let usage = parsed.usage;
        debug!(
            model,
            schema = opts.schema_tag.as_deref().unwrap_or("-"),
            prompt_tokens = usage.and_then(|u| u.prompt_tokens),
            completion_tokens = usage.and_then(|u| u.completion_tokens),
            total_tokens = usage.and_then(|u| u.total_tokens),
            "completion call succeeded"
        );

        Ok(CompletionResult { content, usage })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        opts: &CallOptions,
    ) -> Result<CompletionResult, PipelineError> {
        let include_temperature = !self.temperature_omitted(model);
        with_temperature_retry(include_temperature, |with_temp| {
            self.send_once(messages, model, opts, with_temp)
        })
        .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Control-flow helpers (pure of HTTP, unit-tested below)
// ────────────────────────────────────────────────────────────────────────────

/// Builds the outgoing message list. An extra system message from the call
/// options lands immediately after the template's own system prompt(s),
/// never after developer or user content.
fn assemble_wire<'a>(
    messages: &'a [ChatMessage],
    extra_system: Option<&'a str>,
) -> Vec<WireMessage<'a>> {
    let mut wire: Vec<WireMessage> = messages
        .iter()
        .map(|message| WireMessage {
            role: message.role.as_str(),
            content: &message.content,
        })
        .collect();
    if let Some(extra) = extra_system {
        let at = wire.iter().take_while(|m| m.role == "system").count();
        wire.insert(
            at,
            WireMessage {
                role: "system",
                content: extra,
            },
        );
    }
    wire
}

/// A transport hiccup while reading an error body must not mask the HTTP
/// status, but cancellation and the deadline always win.
fn error_body_or_abort(read: Result<String, PipelineError>) -> Result<String, PipelineError> {
    match read {
        Ok(text) => Ok(text),
        Err(err @ (PipelineError::Cancelled | PipelineError::ProviderTimeout { .. })) => Err(err),
        Err(_) => Ok(String::new()),
    }
}

/// Detects a provider rejection caused specifically by the temperature
/// parameter. The provider reports this as free text, not a structured code.
fn is_temperature_rejection(message: &str) -> bool {
    message.to_ascii_lowercase().contains("temperature")
}

/// First attempt with the caller's temperature decision; if the provider
/// rejects the temperature parameter, exactly one retry without it. Any
/// failure of the second attempt surfaces unchanged. Attempts are strictly
/// sequential — the retry waits for the first response.
async fn with_temperature_retry<Fut>(
    include_temperature: bool,
    mut attempt: impl FnMut(bool) -> Fut,
) -> Result<CompletionResult, PipelineError>
where
    Fut: std::future::Future<Output = Result<CompletionResult, PipelineError>>,
{
    match attempt(include_temperature).await {
        Err(PipelineError::Provider { ref message, .. })
            if include_temperature && is_temperature_rejection(message) =>
        {
            warn!("provider rejected fixed temperature, retrying once without it");
            attempt(false).await
        }
        other => other,
    }
}

fn classify_transport(
    model: &str,
    timeout: Duration,
) -> impl FnOnce(reqwest::Error) -> PipelineError + '_ {
    move |err| {
        if err.is_timeout() {
            PipelineError::ProviderTimeout {
                model: model.to_string(),
                timeout_secs: timeout.as_secs(),
            }
        } else {
            PipelineError::Transport(err)
        }
    }
}

/// Races a transport future against the invocation's deadline and the
/// caller's cancellation token. Timeout and cancellation classify as
/// distinct error kinds, never as generic transport failures.
async fn guard<T>(
    fut: impl std::future::Future<Output = Result<T, PipelineError>>,
    cancel: Option<&CancelToken>,
    timeout: Duration,
    model: &str,
) -> Result<T, PipelineError> {
    let deadline = PipelineError::ProviderTimeout {
        model: model.to_string(),
        timeout_secs: timeout.as_secs(),
    };
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(PipelineError::Cancelled),
            outcome = tokio::time::timeout(timeout, fut) => {
                outcome.map_err(|_| deadline)?
            }
        },
        None => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| deadline)?,
    }
}
