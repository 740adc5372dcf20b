//! Apply pipeline — turns a completed analysis back into a rendered resume
//! document.
//!
//! Flow: precondition checks (no LLM call before they all pass) → load
//! extracted text → one generation call (no repair loop at this layer) →
//! heuristic JSON extraction → decode + invariants → render → persist →
//! `GeneratedArtifact`. Decode and invariant failures after a successful
//! completion are logged with the analysis id and surfaced without retry.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::llm_client::{CallOptions, CompletionClient};
use crate::models::artifact::GeneratedArtifact;
use crate::models::resume::ResumeModel;
use crate::prompts::build_apply_messages;

pub mod collaborators;
pub mod extract;

use collaborators::{
    AnalysisRepository, AnalysisStatus, ArtifactRepository, DocumentRepository, ObjectStore,
    ResumeRenderer,
};
use extract::extract_json_object;

/// The single supported render template. Any other requested id is an
/// invalid-input error until more templates ship.
pub const DEFAULT_TEMPLATE_ID: &str = "modern";

/// One apply request.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub user_id: Uuid,
    pub analysis_id: Uuid,
    /// Optional template selection; `None` means the default.
    pub template_id: Option<String>,
}

/// The apply orchestrator. Holds only read-only collaborators; invocations
/// share no mutable state.
#[derive(Clone)]
pub struct ApplyPipeline {
    client: Arc<dyn CompletionClient>,
    analyses: Arc<dyn AnalysisRepository>,
    documents: Arc<dyn DocumentRepository>,
    store: Arc<dyn ObjectStore>,
    renderer: Arc<dyn ResumeRenderer>,
    artifacts: Arc<dyn ArtifactRepository>,
    model: String,
}

impl ApplyPipeline {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        analyses: Arc<dyn AnalysisRepository>,
        documents: Arc<dyn DocumentRepository>,
        store: Arc<dyn ObjectStore>,
        renderer: Arc<dyn ResumeRenderer>,
        artifacts: Arc<dyn ArtifactRepository>,
        model: String,
    ) -> Self {
        Self {
            client,
            analyses,
            documents,
            store,
            renderer,
            artifacts,
            model,
        }
    }

    pub async fn apply(
        &self,
        request: ApplyRequest,
        opts: &CallOptions,
    ) -> Result<GeneratedArtifact, PipelineError> {
        if request.user_id.is_nil() {
            return Err(PipelineError::InvalidInput("user_id is required".into()));
        }
        if request.analysis_id.is_nil() {
            return Err(PipelineError::InvalidInput(
                "analysis_id is required".into(),
            ));
        }
        let template_id = match request.template_id.as_deref() {
            None | Some(DEFAULT_TEMPLATE_ID) => DEFAULT_TEMPLATE_ID.to_string(),
            Some(other) => {
                return Err(PipelineError::InvalidInput(format!(
                    "unsupported template '{other}', only '{DEFAULT_TEMPLATE_ID}' is available"
                )))
            }
        };

        // ownership failure reads identically to absence
        let analysis = self
            .analyses
            .find(request.analysis_id)
            .await?
            .filter(|record| record.user_id == request.user_id)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("analysis {}", request.analysis_id))
            })?;

        if analysis.status != AnalysisStatus::Completed {
            return Err(PipelineError::PreconditionFailed(format!(
                "analysis {} is not completed",
                analysis.id
            )));
        }
        let result_json = analysis.result_json.as_ref().ok_or_else(|| {
            PipelineError::PreconditionFailed(format!("analysis {} has no result", analysis.id))
        })?;

        let document = self
            .documents
            .find(analysis.document_id)
            .await?
            .filter(|record| record.user_id == request.user_id)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("document {}", analysis.document_id))
            })?;
        let text_key = document.extracted_text_key.as_deref().ok_or_else(|| {
            PipelineError::PreconditionFailed(format!(
                "document {} has no extracted text",
                document.id
            ))
        })?;

        // preconditions hold; from here on the invocation may spend LLM budget
        let text_bytes = self.store.get(text_key).await?;
        let resume_text = String::from_utf8_lossy(&text_bytes);

        let analysis_json = serde_json::to_string_pretty(result_json)
            .map_err(|e| PipelineError::Internal(anyhow::anyhow!(e)))?;
        let messages = build_apply_messages(&resume_text, &analysis_json);

        let completion = self.client.complete(&messages, &self.model, opts).await?;

        let object_slice = extract_json_object(&completion.content).map_err(|err| {
            warn!(analysis_id = %analysis.id, %err, "apply response carried no JSON object");
            err
        })?;
        let model: ResumeModel = serde_json::from_str(object_slice).map_err(|err| {
            warn!(analysis_id = %analysis.id, %err, "apply response failed to decode");
            PipelineError::InvalidResultSchema(format!("resume model: {err}"))
        })?;
        model.validate().map_err(|err| {
            warn!(analysis_id = %analysis.id, %err, "generated resume violates invariants");
            err
        })?;

        let rendered = self.renderer.render(&model)?;
        let file_name = format!("resume-{}.pdf", analysis.id);
        let stored = self
            .store
            .put(request.user_id, &file_name, rendered)
            .await?;

        let artifact = GeneratedArtifact {
            id: Uuid::new_v4(),
            document_id: document.id,
            analysis_id: analysis.id,
            template_id,
            storage_key: stored.key,
            mime_type: stored.mime_type,
            size_bytes: stored.size_bytes,
            created_at: Utc::now(),
        };
        self.artifacts.insert(&artifact).await?;

        info!(
            analysis_id = %analysis.id,
            artifact_id = %artifact.id,
            size_bytes = artifact.size_bytes,
            "apply pipeline produced artifact"
        );

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::collaborators::*;
    use super::*;
    use crate::analysis::testing::{init_tracing, ScriptedClient};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ── In-memory fakes ─────────────────────────────────────────────────────

    struct FakeAnalyses(HashMap<Uuid, AnalysisRecord>);
    #[async_trait]
    impl AnalysisRepository for FakeAnalyses {
        async fn find(&self, id: Uuid) -> Result<Option<AnalysisRecord>, PipelineError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct FakeDocuments(HashMap<Uuid, DocumentRecord>);
    #[async_trait]
    impl DocumentRepository for FakeDocuments {
        async fn find(&self, id: Uuid) -> Result<Option<DocumentRecord>, PipelineError> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct FakeStore {
        objects: Mutex<HashMap<String, Bytes>>,
    }
    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn get(&self, key: &str) -> Result<Bytes, PipelineError> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| PipelineError::StorageFailure(format!("missing key {key}")))
        }
        async fn put(
            &self,
            owner: Uuid,
            file_name: &str,
            bytes: Bytes,
        ) -> Result<StoredObject, PipelineError> {
            let key = format!("{owner}/{file_name}");
            let size_bytes = bytes.len() as u64;
            self.objects.lock().unwrap().insert(key.clone(), bytes);
            Ok(StoredObject {
                key,
                size_bytes,
                mime_type: "application/pdf".to_string(),
            })
        }
    }

    struct FakeRenderer;
    impl ResumeRenderer for FakeRenderer {
        fn render(&self, model: &ResumeModel) -> Result<Bytes, PipelineError> {
            Ok(Bytes::from(format!("%PDF {}", model.header.name)))
        }
    }

    struct FakeArtifacts(Mutex<Vec<GeneratedArtifact>>);
    #[async_trait]
    impl ArtifactRepository for FakeArtifacts {
        async fn insert(&self, artifact: &GeneratedArtifact) -> Result<(), PipelineError> {
            self.0.lock().unwrap().push(artifact.clone());
            Ok(())
        }
    }

    // ── Fixture wiring ──────────────────────────────────────────────────────

    struct Fixture {
        user_id: Uuid,
        analysis_id: Uuid,
        pipeline: ApplyPipeline,
        client: Arc<ScriptedClient>,
        artifacts: Arc<FakeArtifacts>,
    }

    fn valid_resume_json() -> String {
        serde_json::json!({
            "header": {"name": "Jane Doe", "title": "Staff Engineer"},
            "summary": ["Backend engineer.", "Rust and distributed systems."],
            "skills": {"Languages": ["Rust", "Go"]},
            "experience": [{
                "company": "Initech",
                "role": "Engineer",
                "highlights": ["Cut p99 latency 40%", "Ran 200-node fleet"]
            }]
        })
        .to_string()
    }

    fn fixture(responses: Vec<&str>) -> Fixture {
        fixture_with(responses, |_, _| {})
    }

    fn fixture_with(
        responses: Vec<&str>,
        tweak: impl FnOnce(&mut AnalysisRecord, &mut DocumentRecord),
    ) -> Fixture {
        init_tracing();
        let user_id = Uuid::new_v4();
        let analysis_id = Uuid::new_v4();
        let document_id = Uuid::new_v4();

        let mut analysis = AnalysisRecord {
            id: analysis_id,
            user_id,
            document_id,
            status: AnalysisStatus::Completed,
            schema_version: "v2_3".to_string(),
            result_json: Some(serde_json::json!({"summary": "ok", "ats_score": 70})),
        };
        let mut document = DocumentRecord {
            id: document_id,
            user_id,
            file_name: "resume.pdf".to_string(),
            extracted_text_key: Some("extracted/resume.txt".to_string()),
        };
        tweak(&mut analysis, &mut document);

        let store = Arc::new(FakeStore {
            objects: Mutex::new(HashMap::from([(
                "extracted/resume.txt".to_string(),
                Bytes::from_static(b"Jane Doe\nStaff Engineer\nInitech 2019-2024"),
            )])),
        });
        let client = Arc::new(ScriptedClient::with_responses(responses));
        let artifacts = Arc::new(FakeArtifacts(Mutex::new(vec![])));

        let pipeline = ApplyPipeline::new(
            client.clone(),
            Arc::new(FakeAnalyses(HashMap::from([(analysis_id, analysis)]))),
            Arc::new(FakeDocuments(HashMap::from([(document_id, document)]))),
            store,
            Arc::new(FakeRenderer),
            artifacts.clone(),
            "gpt-4o".to_string(),
        );

        Fixture {
            user_id,
            analysis_id,
            pipeline,
            client,
            artifacts,
        }
    }

    fn request(f: &Fixture) -> ApplyRequest {
        ApplyRequest {
            user_id: f.user_id,
            analysis_id: f.analysis_id,
            template_id: None,
        }
    }

    // ── Tests ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_happy_path_produces_one_artifact_with_nonzero_size() {
        let f = fixture(vec![&valid_resume_json()]);
        let artifact = f
            .pipeline
            .apply(request(&f), &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(artifact.analysis_id, f.analysis_id);
        assert_eq!(artifact.template_id, DEFAULT_TEMPLATE_ID);
        assert_eq!(artifact.mime_type, "application/pdf");
        assert!(artifact.size_bytes > 0);
        assert_eq!(f.artifacts.0.lock().unwrap().len(), 1);
        assert_eq!(f.client.call_count(), 1, "exactly one completion, no repair");
    }

    #[tokio::test]
    async fn test_noisy_response_is_salvaged_by_extraction() {
        let noisy = format!("Here is your resume!\n{}\nHope it helps.", valid_resume_json());
        let f = fixture(vec![&noisy]);
        let artifact = f
            .pipeline
            .apply(request(&f), &CallOptions::default())
            .await
            .unwrap();
        assert!(artifact.size_bytes > 0);
    }

    #[tokio::test]
    async fn test_unsupported_template_is_rejected_before_llm_call() {
        let f = fixture(vec![]);
        let mut req = request(&f);
        req.template_id = Some("fancy".to_string());
        let result = f.pipeline.apply(req, &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
        assert_eq!(f.client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_default_template_id_may_be_passed_explicitly() {
        let f = fixture(vec![&valid_resume_json()]);
        let mut req = request(&f);
        req.template_id = Some(DEFAULT_TEMPLATE_ID.to_string());
        assert!(f.pipeline.apply(req, &CallOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_analysis_reads_as_not_found() {
        let f = fixture(vec![]);
        let mut req = request(&f);
        req.user_id = Uuid::new_v4(); // someone else
        let result = f.pipeline.apply(req, &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
        assert_eq!(f.client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_analysis_fails_precondition() {
        let f = fixture_with(vec![], |analysis, _| {
            analysis.status = AnalysisStatus::Running;
        });
        let result = f.pipeline.apply(request(&f), &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::PreconditionFailed(_))));
    }

    #[tokio::test]
    async fn test_completed_analysis_without_result_fails_precondition() {
        let f = fixture_with(vec![], |analysis, _| {
            analysis.result_json = None;
        });
        let result = f.pipeline.apply(request(&f), &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::PreconditionFailed(_))));
    }

    #[tokio::test]
    async fn test_document_without_extracted_text_fails_precondition() {
        let f = fixture_with(vec![], |_, document| {
            document.extracted_text_key = None;
        });
        let result = f.pipeline.apply(request(&f), &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::PreconditionFailed(_))));
        assert_eq!(f.client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_response_without_json_fails_as_invalid_llm_output() {
        let f = fixture(vec!["I am unable to produce a resume right now."]);
        let result = f.pipeline.apply(request(&f), &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::InvalidLlmOutput(_))));
        assert_eq!(f.client.call_count(), 1, "no retry at this layer");
        assert!(f.artifacts.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_header_name_is_rejected() {
        let mut bad: serde_json::Value = serde_json::from_str(&valid_resume_json()).unwrap();
        bad["header"]["name"] = serde_json::json!("   ");
        let raw = bad.to_string();
        let f = fixture(vec![&raw]);
        let result = f.pipeline.apply(request(&f), &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::InvalidResultSchema(_))));
    }

    #[tokio::test]
    async fn test_six_highlights_reject_the_model() {
        let mut bad: serde_json::Value = serde_json::from_str(&valid_resume_json()).unwrap();
        bad["experience"][0]["highlights"] =
            serde_json::json!(["a", "b", "c", "d", "e", "f"]);
        let raw = bad.to_string();
        let f = fixture(vec![&raw]);
        let result = f.pipeline.apply(request(&f), &CallOptions::default()).await;
        assert!(matches!(result, Err(PipelineError::InvalidResultSchema(_))));
        assert!(f.artifacts.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_embeds_extracted_text_and_prior_analysis() {
        let f = fixture(vec![&valid_resume_json()]);
        f.pipeline
            .apply(request(&f), &CallOptions::default())
            .await
            .unwrap();
        let messages = f.client.recorded_messages(0);
        let user_prompt = &messages[1].content;
        assert!(user_prompt.contains("Jane Doe\nStaff Engineer\nInitech 2019-2024"));
        assert!(user_prompt.contains("\"ats_score\": 70"));
    }
}
