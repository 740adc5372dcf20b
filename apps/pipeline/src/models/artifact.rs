use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rendered resume document. Created exactly once per successful apply and
/// never mutated afterwards; soft-deletion belongs to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: Uuid,
    /// Source resume document the analysis was run against.
    pub document_id: Uuid,
    pub analysis_id: Uuid,
    pub template_id: String,
    pub storage_key: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}
