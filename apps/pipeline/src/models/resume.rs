//! The apply-target resume shape and its structural invariants.
//!
//! The LLM produces this model as JSON; `ResumeModel::validate` applies the
//! invariants JSON syntax cannot express. One violating entry invalidates
//! the whole model — partial acceptance would hand the renderer a document
//! the caller never approved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Max summary lines.
pub const MAX_SUMMARY_LINES: usize = 4;
/// Max highlight bullets per experience entry.
pub const MAX_HIGHLIGHTS_PER_ROLE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Required; must be non-blank after trimming.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// At most `MAX_HIGHLIGHTS_PER_ROLE` bullets.
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tech: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub institution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// The full resume document model handed to the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeModel {
    pub header: Header,
    /// Summary lines, at most `MAX_SUMMARY_LINES`.
    #[serde(default)]
    pub summary: Vec<String>,
    /// Skill category → skills. BTreeMap keeps render order deterministic.
    #[serde(default)]
    pub skills: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

impl ResumeModel {
    /// Structural invariants beyond what decoding guarantees.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.header.name.trim().is_empty() {
            return Err(PipelineError::InvalidResultSchema(
                "header.name must not be blank".to_string(),
            ));
        }
        if self.summary.len() > MAX_SUMMARY_LINES {
            return Err(PipelineError::InvalidResultSchema(format!(
                "summary has {} lines, max is {MAX_SUMMARY_LINES}",
                self.summary.len()
            )));
        }
        for entry in &self.experience {
            if entry.highlights.len() > MAX_HIGHLIGHTS_PER_ROLE {
                return Err(PipelineError::InvalidResultSchema(format!(
                    "experience entry '{} at {}' has {} highlights, max is {MAX_HIGHLIGHTS_PER_ROLE}",
                    entry.role,
                    entry.company,
                    entry.highlights.len()
                )));
            }
        }
        Ok(())
    }
}
