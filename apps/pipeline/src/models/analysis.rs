//! Analyze-path data models: the caller's input and the versioned result
//! shapes the schema validators decode into.
//!
//! Each version is an independent struct decoded on its own — validators
//! never share a shape across versions, because required fields differ.

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Upper bound on reported issues per analysis.
pub const MAX_ISSUES: usize = 50;
/// Upper bound on bullet rewrites per analysis.
pub const MAX_BULLET_REWRITES: usize = 25;
/// Upper bound on action-plan steps per analysis.
pub const MAX_ACTION_PLAN_STEPS: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// One analyze request. Immutable once constructed; passed by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeInput {
    /// Extracted resume text. Must be non-empty after trimming.
    pub resume_text: String,
    /// Optional job description to analyze against. Absent or blank renders
    /// as "N/A" in the prompt with the presence flag set to "false".
    pub job_description: Option<String>,
    /// Requested schema version tag, e.g. "v2_3". Unknown tags fall back to
    /// the default version's template but are still echoed into the prompt.
    pub schema_version: String,
    /// Optional target-role hint, e.g. "Staff Engineer".
    pub target_role: Option<String>,
}

impl AnalyzeInput {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.resume_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "resume_text cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a usable (non-blank) job description was supplied.
    pub fn has_job_description(&self) -> bool {
        self.job_description
            .as_deref()
            .is_some_and(|jd| !jd.trim().is_empty())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared result fragments
// ────────────────────────────────────────────────────────────────────────────

/// Issue severity. Any other wire value is a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single problem the model found in the resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    /// Resume section the issue refers to. Only populated by v2-family models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// A suggested rewrite of one resume bullet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletRewrite {
    pub original: String,
    pub improved: String,
}

/// Keyword coverage against the job description. Required from v2_2 on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Versioned result shapes
// ────────────────────────────────────────────────────────────────────────────

/// v1 result: the original flat shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResultV1 {
    pub summary: String,
    /// ATS compatibility score, 0–100.
    pub ats_score: u8,
    pub issues: Vec<Issue>,
    pub bullet_rewrites: Vec<BulletRewrite>,
    pub missing_information: Vec<String>,
    pub action_plan: Vec<String>,
}

/// v2-family result. v2.0 allows an empty assessment; v2.1 requires it
/// non-empty; v2.2 requires `keyword_analysis`; v2.3 requires
/// `section_scores`. The optional fields stay optional at the serde layer —
/// the per-version validators enforce presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResultV2 {
    pub summary: String,
    pub ats_score: u8,
    /// Narrative assessment of overall fit. Required non-empty from v2_1.
    #[serde(default)]
    pub assessment: String,
    pub issues: Vec<Issue>,
    pub bullet_rewrites: Vec<BulletRewrite>,
    pub missing_information: Vec<String>,
    pub action_plan: Vec<String>,
    /// Required from v2_2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_analysis: Option<KeywordAnalysis>,
    /// Per-section 0–100 scores, keyed by section name. Required from v2_3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_scores: Option<std::collections::BTreeMap<String, u8>>,
}

/// A validated analysis result, tagged by the schema version that produced it.
/// Shapes are mutually exclusive; no implicit migration between them.
#[derive(Debug, Clone, Serialize)]
pub enum VersionedAnalysisResult {
    V1(AnalysisResultV1),
    V2(AnalysisResultV2),
    V2_1(AnalysisResultV2),
    V2_2(AnalysisResultV2),
    V2_3(AnalysisResultV2),
}

impl VersionedAnalysisResult {
    /// The tag of the version this result was validated against.
    pub fn version_tag(&self) -> &'static str {
        match self {
            VersionedAnalysisResult::V1(_) => "v1",
            VersionedAnalysisResult::V2(_) => "v2",
            VersionedAnalysisResult::V2_1(_) => "v2_1",
            VersionedAnalysisResult::V2_2(_) => "v2_2",
            VersionedAnalysisResult::V2_3(_) => "v2_3",
        }
    }

    pub fn ats_score(&self) -> u8 {
        match self {
            VersionedAnalysisResult::V1(r) => r.ats_score,
            VersionedAnalysisResult::V2(r)
            | VersionedAnalysisResult::V2_1(r)
            | VersionedAnalysisResult::V2_2(r)
            | VersionedAnalysisResult::V2_3(r) => r.ats_score,
        }
    }
}
