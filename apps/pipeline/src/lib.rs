//! Resume analysis and generation pipeline.
//!
//! Turns an unstructured resume into a validated, versioned analysis via an
//! LLM completion provider, and optionally turns a completed analysis back
//! into a rendered resume document. The pipeline owns prompt construction,
//! the completion gateway with its model-specific quirks, the bounded JSON
//! repair loop, per-version schema validation, and apply orchestration.
//! HTTP routing, persistence adapters, and the renderer's internals are
//! external collaborators reached through the traits in
//! [`apply::collaborators`] and [`llm_client::CompletionClient`].

pub mod analysis;
pub mod apply;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod prompts;

pub use analysis::{Analyzer, AnalysisOutcome};
pub use apply::{ApplyPipeline, ApplyRequest, DEFAULT_TEMPLATE_ID};
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::PipelineConfig;
pub use errors::PipelineError;
pub use llm_client::{CallOptions, ChatMessage, CompletionClient, OpenAiClient, Role};
pub use models::analysis::{AnalyzeInput, VersionedAnalysisResult};
pub use models::artifact::GeneratedArtifact;
pub use models::resume::ResumeModel;
pub use prompts::{PromptRegistry, SchemaVersion};
