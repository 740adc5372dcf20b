//! Prompt template registry and builder.
//!
//! The registry maps a schema-version tag to a prompt template; the builder
//! fills the template's placeholders and assembles the ordered message
//! sequence for one completion call. Templates are process-wide and
//! read-only: construct `PromptRegistry` once at startup and inject it.
//!
//! Unknown version tags resolve leniently to the default version's template
//! (the rendered prompt still echoes the tag the caller asked for). That is
//! preserved source behavior, not an endorsement — see DESIGN.md.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::llm_client::{ChatMessage, Role};
use crate::models::analysis::AnalyzeInput;

pub mod templates;

/// Fallback when the caller's tag is unknown.
pub const DEFAULT_SCHEMA_VERSION: SchemaVersion = SchemaVersion::V2_3;

/// A schema version selects both the prompt template and the validation
/// rules applied to the model's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    V1,
    V2,
    V2_1,
    V2_2,
    V2_3,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 5] = [
        SchemaVersion::V1,
        SchemaVersion::V2,
        SchemaVersion::V2_1,
        SchemaVersion::V2_2,
        SchemaVersion::V2_3,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V2 => "v2",
            SchemaVersion::V2_1 => "v2_1",
            SchemaVersion::V2_2 => "v2_2",
            SchemaVersion::V2_3 => "v2_3",
        }
    }

    pub fn parse(tag: &str) -> Option<SchemaVersion> {
        Self::ALL.iter().copied().find(|v| v.tag() == tag)
    }
}

/// One versioned prompt template. `strict` selects the v2-family system
/// message ("no markdown, never omit keys") over the plain v1 one.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub version: SchemaVersion,
    pub strict: bool,
    pub developer_template: &'static str,
}

impl PromptTemplate {
    fn system_prompt(&self) -> &'static str {
        if self.strict {
            templates::SYSTEM_JSON_STRICT_V2
        } else {
            templates::SYSTEM_JSON_STRICT
        }
    }
}

/// Outcome of resolving a requested version tag.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    /// The tag the caller asked for, echoed verbatim into the prompt.
    pub requested_tag: String,
    /// The version whose template and validation rules actually apply.
    pub effective: SchemaVersion,
    pub template: &'static PromptTemplate,
}

static TEMPLATES: [PromptTemplate; 5] = [
    PromptTemplate {
        version: SchemaVersion::V1,
        strict: false,
        developer_template: templates::DEVELOPER_V1,
    },
    PromptTemplate {
        version: SchemaVersion::V2,
        strict: true,
        developer_template: templates::DEVELOPER_V2,
    },
    PromptTemplate {
        version: SchemaVersion::V2_1,
        strict: true,
        developer_template: templates::DEVELOPER_V2_1,
    },
    PromptTemplate {
        version: SchemaVersion::V2_2,
        strict: true,
        developer_template: templates::DEVELOPER_V2_2,
    },
    PromptTemplate {
        version: SchemaVersion::V2_3,
        strict: true,
        developer_template: templates::DEVELOPER_V2_3,
    },
];

/// Read-only registry of all prompt templates, keyed by version.
#[derive(Debug, Clone, Default)]
pub struct PromptRegistry;

impl PromptRegistry {
    pub fn new() -> Self {
        PromptRegistry
    }

    fn template_for(version: SchemaVersion) -> &'static PromptTemplate {
        TEMPLATES
            .iter()
            .find(|t| t.version == version)
            .unwrap_or(&TEMPLATES[0])
    }

    /// Resolves a requested tag to an effective template. Unknown tags log a
    /// warning and fall back to `DEFAULT_SCHEMA_VERSION` — no error is raised.
    pub fn resolve(&self, requested_tag: &str) -> ResolvedTemplate {
        let effective = match SchemaVersion::parse(requested_tag) {
            Some(version) => version,
            None => {
                warn!(
                    requested = %requested_tag,
                    fallback = %DEFAULT_SCHEMA_VERSION.tag(),
                    "unknown schema version, falling back to default template"
                );
                DEFAULT_SCHEMA_VERSION
            }
        };
        ResolvedTemplate {
            requested_tag: requested_tag.to_string(),
            effective,
            template: Self::template_for(effective),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Message building
// ────────────────────────────────────────────────────────────────────────────

/// Fills the developer schema template. Literal single-pass token replacement.
fn render_developer(resolved: &ResolvedTemplate, input: &AnalyzeInput, model: &str) -> String {
    resolved
        .template
        .developer_template
        .replace("{schema_version}", &resolved.requested_tag)
        .replace("{target_model}", model)
        .replace(
            "{has_job_description}",
            if input.has_job_description() {
                "true"
            } else {
                "false"
            },
        )
}

fn render_user(input: &AnalyzeInput) -> String {
    let job_description = if input.has_job_description() {
        input.job_description.as_deref().unwrap_or("N/A")
    } else {
        "N/A"
    };
    let target_role = input
        .target_role
        .as_deref()
        .filter(|role| !role.trim().is_empty())
        .unwrap_or("N/A");

    templates::ANALYZE_USER_TEMPLATE
        .replace("{resume_text}", &input.resume_text)
        .replace("{job_description}", job_description)
        .replace("{target_role}", target_role)
}

/// Assembles the direct-analysis message sequence: system, developer, user.
pub fn build_analyze_messages(
    resolved: &ResolvedTemplate,
    input: &AnalyzeInput,
    model: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::System, resolved.template.system_prompt()),
        ChatMessage::new(Role::Developer, render_developer(resolved, input, model)),
        ChatMessage::new(Role::User, render_user(input)),
    ]
}

/// Assembles the repair message sequence: repair system prompt, the same
/// developer schema prompt, and a user prompt embedding the previous raw
/// (possibly malformed) response verbatim.
pub fn build_repair_messages(
    resolved: &ResolvedTemplate,
    input: &AnalyzeInput,
    model: &str,
    previous_raw: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::System, templates::REPAIR_SYSTEM),
        ChatMessage::new(Role::Developer, render_developer(resolved, input, model)),
        ChatMessage::new(
            Role::User,
            templates::REPAIR_USER_TEMPLATE.replace("{previous_raw}", previous_raw),
        ),
    ]
}

/// Fills the apply-path generation template with the extracted resume text
/// and the serialized prior analysis.
pub fn build_apply_messages(resume_text: &str, analysis_json: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::System, templates::APPLY_SYSTEM),
        ChatMessage::new(
            Role::User,
            templates::APPLY_PROMPT_TEMPLATE
                .replace("{analysis_json}", analysis_json)
                .replace("{resume_text}", resume_text),
        ),
    ]
}

/// Deterministic SHA-256 digest of a rendered message sequence. Used for
/// caching/observability correlation only, never for control flow. Role and
/// content are length-framed so shifting text between messages changes the
/// hash.
pub fn prompt_hash(messages: &[ChatMessage]) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        let role = message.role.as_str();
        hasher.update((role.len() as u64).to_be_bytes());
        hasher.update(role.as_bytes());
        hasher.update((message.content.len() as u64).to_be_bytes());
        hasher.update(message.content.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
