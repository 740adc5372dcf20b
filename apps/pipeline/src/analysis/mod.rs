//! Analyze path: prompt resolution, completion with bounded JSON repair,
//! and version-specific schema validation.
//!
//! Flow: resolve template → build messages → gateway call → (on invalid
//! JSON) one repair call → per-version validation → `AnalysisOutcome`.
//! All mutable state lives on the invocation's call stack; the registry and
//! client are read-only, so invocations run fully in parallel.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::llm_client::{CallOptions, CompletionClient, Usage};
use crate::models::analysis::{AnalyzeInput, VersionedAnalysisResult};
use crate::prompts::{
    build_analyze_messages, build_repair_messages, prompt_hash, PromptRegistry, SchemaVersion,
};

pub mod repair;
#[cfg(test)]
pub(crate) mod testing;
pub mod validate;

/// A validated analysis plus the correlation data callers log alongside it.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: VersionedAnalysisResult,
    /// The raw (syntactically valid) JSON the result was decoded from.
    pub raw: String,
    /// Digest of the direct prompt — observability only.
    pub prompt_hash: String,
    /// Usage counters of the last gateway call, when the provider reports them.
    pub usage: Option<Usage>,
    pub requested_version: String,
    pub effective_version: SchemaVersion,
}

/// The analyze service. Cheap to clone; holds no per-invocation state.
#[derive(Clone)]
pub struct Analyzer {
    client: Arc<dyn CompletionClient>,
    registry: PromptRegistry,
    model: String,
}

impl Analyzer {
    pub fn new(client: Arc<dyn CompletionClient>, registry: PromptRegistry, model: String) -> Self {
        Self {
            client,
            registry,
            model,
        }
    }

    /// Full analyze pipeline. The repair loop keys on JSON syntax only; a
    /// response that is valid JSON but fails the version's schema surfaces
    /// as `InvalidResultSchema` without another call — callers wanting a
    /// schema-driven retry use [`Analyzer::validate_with_retry`].
    pub async fn analyze(
        &self,
        input: AnalyzeInput,
        opts: &CallOptions,
    ) -> Result<AnalysisOutcome, PipelineError> {
        input.validate()?;
        let resolved = self.registry.resolve(&input.schema_version);
        let hash = prompt_hash(&build_analyze_messages(&resolved, &input, &self.model));

        info!(
            requested = %resolved.requested_tag,
            effective = %resolved.effective.tag(),
            model = %self.model,
            prompt_hash = %hash,
            "starting analysis"
        );

        let outcome = repair::run(
            self.client.as_ref(),
            &resolved,
            &input,
            &self.model,
            opts,
            None,
        )
        .await?;

        let result = validate::validate(resolved.effective, &outcome.content).map_err(|err| {
            // raw payload is not safe to surface to end users; log it here
            warn!(
                requested = %resolved.requested_tag,
                raw_len = outcome.content.len(),
                %err,
                "analysis payload failed schema validation"
            );
            err
        })?;

        Ok(AnalysisOutcome {
            result,
            raw: outcome.content,
            prompt_hash: hash,
            usage: outcome.usage,
            requested_version: resolved.requested_tag,
            effective_version: resolved.effective,
        })
    }

    /// Schema-aware retry composition: one direct call (or a caller-supplied
    /// stored payload in place of it), validate, and on *any* validation
    /// failure repair once and validate again. At most two gateway calls —
    /// one when `raw_seed` is supplied.
    pub async fn validate_with_retry(
        &self,
        input: AnalyzeInput,
        opts: &CallOptions,
        raw_seed: Option<String>,
    ) -> Result<AnalysisOutcome, PipelineError> {
        input.validate()?;
        let resolved = self.registry.resolve(&input.schema_version);
        let direct_messages = build_analyze_messages(&resolved, &input, &self.model);
        let hash = prompt_hash(&direct_messages);

        let (first_raw, mut usage) = match raw_seed {
            Some(seed) => (seed, None),
            None => {
                let result = self
                    .client
                    .complete(&direct_messages, &self.model, opts)
                    .await?;
                let usage = result.usage;
                (result.content, usage)
            }
        };

        let first_err = match validate::validate(resolved.effective, &first_raw) {
            Ok(result) => {
                return Ok(AnalysisOutcome {
                    result,
                    raw: first_raw,
                    prompt_hash: hash,
                    usage,
                    requested_version: resolved.requested_tag,
                    effective_version: resolved.effective,
                })
            }
            Err(err) => err,
        };

        warn!(
            requested = %resolved.requested_tag,
            %first_err,
            "stored or first result failed validation, attempting repair"
        );

        let repair_messages = build_repair_messages(&resolved, &input, &self.model, &first_raw);
        let second = self
            .client
            .complete(&repair_messages, &self.model, opts)
            .await?;
        usage = second.usage;

        let result = validate::validate(resolved.effective, &second.content).map_err(|err| {
            warn!(
                requested = %resolved.requested_tag,
                raw_len = second.content.len(),
                %err,
                "repaired result still fails validation"
            );
            err
        })?;

        Ok(AnalysisOutcome {
            result,
            raw: second.content,
            prompt_hash: hash,
            usage,
            requested_version: resolved.requested_tag,
            effective_version: resolved.effective,
        })
    }
}
