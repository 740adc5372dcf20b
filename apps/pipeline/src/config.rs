use anyhow::{Context, Result};

/// Default request timeout for completion calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Pipeline configuration loaded from environment variables.
/// Fails at startup if required variables are missing — a misconfigured
/// client must never be constructed.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: String,
    pub api_url: String,
    /// Target model for all completion calls, e.g. "gpt-4o".
    pub model: String,
    pub timeout_secs: u64,
    /// Models (exact names or prefixes) that reject a fixed temperature.
    /// The request omits the temperature field entirely for these.
    pub temperature_denylist: Vec<String>,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let model = require_env("LLM_MODEL")?;
        if model.trim().is_empty() {
            anyhow::bail!("LLM_MODEL must not be blank");
        }

        Ok(PipelineConfig {
            api_key: require_env("LLM_API_KEY")?,
            api_url: std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            model,
            timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .context("LLM_TIMEOUT_SECS must be a positive integer")?,
            temperature_denylist: std::env::var("LLM_TEMPERATURE_DENYLIST")
                .map(|raw| parse_denylist(&raw))
                .unwrap_or_default(),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Splits a comma-separated denylist, trimming entries and dropping blanks.
fn parse_denylist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
