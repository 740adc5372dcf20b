//! Bounded JSON repair loop.
//!
//! Two working states: `Direct` (first attempt with the analysis prompt) and
//! `Repairing` (one retry with the repair prompt embedding the malformed
//! output). Terminal states are `Done` and `Failed` — there is never a third
//! gateway call. Callers that already hold a raw payload to fix can seed the
//! loop straight into `Repairing`.

use tracing::warn;

use crate::errors::PipelineError;
use crate::llm_client::{CallOptions, ChatMessage, CompletionClient, Usage};
use crate::models::analysis::AnalyzeInput;
use crate::prompts::{build_analyze_messages, build_repair_messages, ResolvedTemplate};

/// Repair-loop state. `Repairing` carries the previous raw response so the
/// repair prompt can embed it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairState {
    Direct,
    Repairing(String),
    Done(String),
    Failed(String),
}

/// Syntactically valid JSON content plus the last call's usage counters.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub content: String,
    pub usage: Option<Usage>,
}

fn is_valid_json(content: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(content).is_ok()
}

/// Runs the loop to a terminal state. `seed` pre-loads `Repairing` with a
/// previously stored raw response, skipping the direct attempt.
pub async fn run<C>(
    client: &C,
    resolved: &ResolvedTemplate,
    input: &AnalyzeInput,
    model: &str,
    opts: &CallOptions,
    seed: Option<String>,
) -> Result<RepairOutcome, PipelineError>
where
    C: CompletionClient + ?Sized,
{
    let mut state = match seed {
        Some(previous) => RepairState::Repairing(previous),
        None => RepairState::Direct,
    };
    let mut usage: Option<Usage> = None;

    loop {
        state = match state {
            RepairState::Direct => {
                let messages = build_analyze_messages(resolved, input, model);
                let result = client.complete(&messages, model, opts).await?;
                usage = result.usage;
                if is_valid_json(&result.content) {
                    RepairState::Done(result.content)
                } else {
                    RepairState::Repairing(result.content)
                }
            }
            RepairState::Repairing(previous) => {
                let messages: Vec<ChatMessage> =
                    build_repair_messages(resolved, input, model, &previous);
                let result = client.complete(&messages, model, opts).await?;
                usage = result.usage;
                if is_valid_json(&result.content) {
                    RepairState::Done(result.content)
                } else {
                    RepairState::Failed(result.content)
                }
            }
            RepairState::Done(content) => {
                return Ok(RepairOutcome { content, usage });
            }
            RepairState::Failed(raw) => {
                warn!(
                    schema = %resolved.requested_tag,
                    raw_len = raw.len(),
                    "repair attempt still returned invalid JSON, giving up"
                );
                return Err(PipelineError::InvalidLlmOutput(
                    "response is not valid JSON after one repair attempt".to_string(),
                ));
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::ScriptedClient;
    use crate::llm_client::Role;
    use crate::prompts::PromptRegistry;

    fn input() -> AnalyzeInput {
        AnalyzeInput {
            resume_text: "Jane Doe, Engineer".to_string(),
            job_description: None,
            schema_version: "v1".to_string(),
            target_role: None,
        }
    }

    #[tokio::test]
    async fn test_valid_first_response_means_single_call() {
        let client = ScriptedClient::with_responses(vec![r#"{"ok": true}"#]);
        let resolved = PromptRegistry::new().resolve("v1");
        let outcome = run(
            &client,
            &resolved,
            &input(),
            "gpt-4o",
            &CallOptions::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.content, r#"{"ok": true}"#);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_then_valid_issues_exactly_two_calls() {
        let client =
            ScriptedClient::with_responses(vec!["Sure! Here is the JSON: {", r#"{"ok": true}"#]);
        let resolved = PromptRegistry::new().resolve("v1");
        let outcome = run(
            &client,
            &resolved,
            &input(),
            "gpt-4o",
            &CallOptions::default(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.content, r#"{"ok": true}"#);
        assert_eq!(client.call_count(), 2);

        // the second call used the repair prompt and embedded the bad output
        let second = client.recorded_messages(1);
        assert!(second[0].content.contains("JSON repair assistant"));
        assert!(second[2].content.contains("Sure! Here is the JSON: {"));
    }

    #[tokio::test]
    async fn test_two_invalid_responses_fail_without_third_call() {
        let client = ScriptedClient::with_responses(vec!["not json", "still not json"]);
        let resolved = PromptRegistry::new().resolve("v1");
        let result = run(
            &client,
            &resolved,
            &input(),
            "gpt-4o",
            &CallOptions::default(),
            None,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::InvalidLlmOutput(_))));
        assert_eq!(client.call_count(), 2, "never a third attempt");
    }

    #[tokio::test]
    async fn test_seeded_loop_skips_the_direct_attempt() {
        let client = ScriptedClient::with_responses(vec![r#"{"fixed": true}"#]);
        let resolved = PromptRegistry::new().resolve("v1");
        let outcome = run(
            &client,
            &resolved,
            &input(),
            "gpt-4o",
            &CallOptions::default(),
            Some("stored { garbage".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(outcome.content, r#"{"fixed": true}"#);
        assert_eq!(client.call_count(), 1);

        let only = client.recorded_messages(0);
        assert_eq!(only[0].role, Role::System);
        assert!(only[2].content.contains("stored { garbage"));
    }

    #[tokio::test]
    async fn test_complete_json_trait_default_runs_the_repair_loop() {
        let client =
            ScriptedClient::with_responses(vec!["```json broken", r#"{"repaired": true}"#]);
        let resolved = PromptRegistry::new().resolve("v2");
        let content = client
            .complete_json(&resolved, &input(), "gpt-4o", &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(content, r#"{"repaired": true}"#);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_gateway_error_propagates_unwrapped() {
        let client = ScriptedClient::with_errors(vec![PipelineError::EmptyResponse]);
        let resolved = PromptRegistry::new().resolve("v1");
        let result = run(
            &client,
            &resolved,
            &input(),
            "gpt-4o",
            &CallOptions::default(),
            None,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::EmptyResponse)));
        assert_eq!(client.call_count(), 1);
    }
}
