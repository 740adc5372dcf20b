//! Contracts for the apply pipeline's external collaborators: repositories,
//! object storage, and the document renderer. The concrete adapters
//! (relational, S3-style, templating) live outside this crate; the pipeline
//! holds them as `Arc<dyn …>` and depends only on these traits.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::models::artifact::GeneratedArtifact;
use crate::models::resume::ResumeModel;

/// Lifecycle of a stored analysis. Apply only accepts `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A stored analysis as the repository reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub status: AnalysisStatus,
    pub schema_version: String,
    /// The validated result payload; null until the analysis completes.
    pub result_json: Option<Value>,
}

/// A stored source document as the repository reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    /// Storage key of the extracted text; null until extraction finishes.
    pub extracted_text_key: Option<String>,
}

/// What the object store reports back after a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
    /// MIME type detected by the store, not asserted by the pipeline.
    pub mime_type: String,
}

#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<AnalysisRecord>, PipelineError>;
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<DocumentRecord>, PipelineError>;
}

/// Byte-stream storage keyed by opaque keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Bytes, PipelineError>;
    async fn put(
        &self,
        owner: Uuid,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<StoredObject, PipelineError>;
}

/// Pure model-to-document rendering. The pipeline never inspects the bytes.
pub trait ResumeRenderer: Send + Sync {
    fn render(&self, model: &ResumeModel) -> Result<Bytes, PipelineError>;
}

#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn insert(&self, artifact: &GeneratedArtifact) -> Result<(), PipelineError>;
}
