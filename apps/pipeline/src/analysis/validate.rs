//! Per-version schema validators.
//!
//! One validation function per schema version — required fields differ
//! between versions, so no validator is shared across them. Decode failures
//! and structural-invariant failures both surface as `InvalidResultSchema`;
//! callers that want a repair pass route the raw content back through the
//! repair loop instead of inspecting the message.

use crate::errors::PipelineError;
use crate::models::analysis::{
    AnalysisResultV1, AnalysisResultV2, VersionedAnalysisResult, MAX_ACTION_PLAN_STEPS,
    MAX_BULLET_REWRITES, MAX_ISSUES,
};
use crate::prompts::SchemaVersion;

fn schema_err(version: &str, detail: impl std::fmt::Display) -> PipelineError {
    PipelineError::InvalidResultSchema(format!("{version}: {detail}"))
}

fn decode<T: serde::de::DeserializeOwned>(version: &str, raw: &str) -> Result<T, PipelineError> {
    serde_json::from_str(raw).map_err(|e| schema_err(version, e))
}

pub fn validate_v1(raw: &str) -> Result<AnalysisResultV1, PipelineError> {
    let result: AnalysisResultV1 = decode("v1", raw)?;
    if result.summary.trim().is_empty() {
        return Err(schema_err("v1", "summary must not be empty"));
    }
    if result.ats_score > 100 {
        return Err(schema_err("v1", "ats_score must be 0-100"));
    }
    if result.issues.len() > MAX_ISSUES {
        return Err(schema_err("v1", format!("more than {MAX_ISSUES} issues")));
    }
    if result.bullet_rewrites.len() > MAX_BULLET_REWRITES {
        return Err(schema_err(
            "v1",
            format!("more than {MAX_BULLET_REWRITES} bullet rewrites"),
        ));
    }
    if result.action_plan.len() > MAX_ACTION_PLAN_STEPS {
        return Err(schema_err(
            "v1",
            format!("more than {MAX_ACTION_PLAN_STEPS} action-plan steps"),
        ));
    }
    Ok(result)
}

pub fn validate_v2(raw: &str) -> Result<AnalysisResultV2, PipelineError> {
    let result: AnalysisResultV2 = decode("v2", raw)?;
    if result.summary.trim().is_empty() {
        return Err(schema_err("v2", "summary must not be empty"));
    }
    if result.ats_score > 100 {
        return Err(schema_err("v2", "ats_score must be 0-100"));
    }
    if result.issues.len() > MAX_ISSUES {
        return Err(schema_err("v2", format!("more than {MAX_ISSUES} issues")));
    }
    if result.bullet_rewrites.len() > MAX_BULLET_REWRITES {
        return Err(schema_err(
            "v2",
            format!("more than {MAX_BULLET_REWRITES} bullet rewrites"),
        ));
    }
    if result.action_plan.len() > MAX_ACTION_PLAN_STEPS {
        return Err(schema_err(
            "v2",
            format!("more than {MAX_ACTION_PLAN_STEPS} action-plan steps"),
        ));
    }
    Ok(result)
}

/// v2_1 is the v2 shape with a mandatory non-empty assessment.
pub fn validate_v2_1(raw: &str) -> Result<AnalysisResultV2, PipelineError> {
    validate_v2_1_shape("v2_1", raw)
}

/// v2_2 additionally requires keyword coverage.
pub fn validate_v2_2(raw: &str) -> Result<AnalysisResultV2, PipelineError> {
    let result = validate_v2_1_shape("v2_2", raw)?;
    if result.keyword_analysis.is_none() {
        return Err(schema_err("v2_2", "keyword_analysis is required"));
    }
    Ok(result)
}

/// v2_3 additionally requires per-section scores, each 0-100.
pub fn validate_v2_3(raw: &str) -> Result<AnalysisResultV2, PipelineError> {
    let result = validate_v2_1_shape("v2_3", raw)?;
    if result.keyword_analysis.is_none() {
        return Err(schema_err("v2_3", "keyword_analysis is required"));
    }
    match &result.section_scores {
        None => return Err(schema_err("v2_3", "section_scores is required")),
        Some(scores) => {
            for (section, score) in scores {
                if *score > 100 {
                    return Err(schema_err(
                        "v2_3",
                        format!("section_scores.{section} must be 0-100"),
                    ));
                }
            }
        }
    }
    Ok(result)
}

// v2_1 and up share the v2_1 base invariants and layer extras on top. The
// version label in the error message stays the caller's.
fn validate_v2_1_shape(version: &str, raw: &str) -> Result<AnalysisResultV2, PipelineError> {
    let result: AnalysisResultV2 = decode(version, raw)?;
    if result.summary.trim().is_empty() {
        return Err(schema_err(version, "summary must not be empty"));
    }
    if result.ats_score > 100 {
        return Err(schema_err(version, "ats_score must be 0-100"));
    }
    if result.assessment.trim().is_empty() {
        return Err(schema_err(version, "assessment must not be empty"));
    }
    if result.issues.len() > MAX_ISSUES {
        return Err(schema_err(
            version,
            format!("more than {MAX_ISSUES} issues"),
        ));
    }
    if result.bullet_rewrites.len() > MAX_BULLET_REWRITES {
        return Err(schema_err(
            version,
            format!("more than {MAX_BULLET_REWRITES} bullet rewrites"),
        ));
    }
    if result.action_plan.len() > MAX_ACTION_PLAN_STEPS {
        return Err(schema_err(
            version,
            format!("more than {MAX_ACTION_PLAN_STEPS} action-plan steps"),
        ));
    }
    Ok(result)
}

/// Dispatch to the version's own validator.
pub fn validate(
    version: SchemaVersion,
    raw: &str,
) -> Result<VersionedAnalysisResult, PipelineError> {
    match version {
        SchemaVersion::V1 => validate_v1(raw).map(VersionedAnalysisResult::V1),
        SchemaVersion::V2 => validate_v2(raw).map(VersionedAnalysisResult::V2),
        SchemaVersion::V2_1 => validate_v2_1(raw).map(VersionedAnalysisResult::V2_1),
        SchemaVersion::V2_2 => validate_v2_2(raw).map(VersionedAnalysisResult::V2_2),
        SchemaVersion::V2_3 => validate_v2_3(raw).map(VersionedAnalysisResult::V2_3),
    }
}
