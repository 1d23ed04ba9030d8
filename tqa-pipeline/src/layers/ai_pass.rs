//! AI review passes (L2 screening, L3 deep analysis)
//!
//! One runner parameterized by layer; L2 and L3 differ only in model,
//! prior-finding context and prompt depth. Chunks are reviewed strictly
//! in order. A retriable provider error (rate limit, timeout) aborts the
//! whole run for the workflow to retry; any other chunk failure is
//! contained: the chunk's findings are lost, the run continues and the
//! layer completes with a partial-failure marker.

use crate::chunker::{chunk_segments, Chunk};
use crate::db::audit::{AuditEntry, AuditLog};
use crate::db::files::FileRepository;
use crate::db::findings::FindingRepository;
use crate::db::segments::SegmentRepository;
use crate::error::{PipelineError, PipelineResult};
use crate::layers::rule_pass::rollback;
use crate::models::{Finding, FindingStatus, Layer, QaFile};
use crate::services::limits::{BudgetService, RateLimiterService};
use crate::services::llm::{AiCallError, ChunkReviewRequest, TextGenerator, TokenUsage};
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tqa_common::events::{EventBus, TqaEvent};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome summary of one AI layer run
#[derive(Debug, Clone)]
pub struct AiPassSummary {
    pub layer: Layer,
    pub finding_count: usize,
    pub total_chunks: usize,
    pub chunks_succeeded: usize,
    pub chunks_failed: usize,
    /// True when at least one chunk failed non-retriably
    pub partial_failure: bool,
    pub model: String,
    pub usage: TokenUsage,
}

pub struct AiPassRunner {
    layer: Layer,
    files: FileRepository,
    segments: SegmentRepository,
    findings: FindingRepository,
    audit: AuditLog,
    generator: Arc<dyn TextGenerator>,
    budget: Arc<dyn BudgetService>,
    limiter: Arc<dyn RateLimiterService>,
    event_bus: EventBus,
    chunk_char_budget: usize,
}

impl AiPassRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layer: Layer,
        files: FileRepository,
        segments: SegmentRepository,
        findings: FindingRepository,
        audit: AuditLog,
        generator: Arc<dyn TextGenerator>,
        budget: Arc<dyn BudgetService>,
        limiter: Arc<dyn RateLimiterService>,
        event_bus: EventBus,
        chunk_char_budget: usize,
    ) -> Self {
        debug_assert!(matches!(layer, Layer::L2 | Layer::L3));
        Self {
            layer,
            files,
            segments,
            findings,
            audit,
            generator,
            budget,
            limiter,
            event_bus,
            chunk_char_budget,
        }
    }

    /// Prior layers whose findings are sent as context so the model does
    /// not re-report known issues
    fn prior_layers(&self) -> &'static [Layer] {
        match self.layer {
            Layer::L3 => &[Layer::L1, Layer::L2],
            _ => &[Layer::L1],
        }
    }

    /// Run the AI pass over a file.
    ///
    /// Claims the file from the predecessor state; rate-limit and budget
    /// gates are checked before any AI spend. On failure the rollback
    /// rules from the deterministic pass apply.
    pub async fn run(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        file_id: Uuid,
    ) -> PipelineResult<AiPassSummary> {
        self.files.claim(tenant_id, file_id, self.layer).await?;

        match self.run_claimed(tenant_id, project_id, file_id).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                rollback(&self.files, tenant_id, file_id, self.layer, &e).await;
                Err(e)
            }
        }
    }

    async fn run_claimed(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        file_id: Uuid,
    ) -> PipelineResult<AiPassSummary> {
        if !self.limiter.acquire(project_id).await? {
            return Err(PipelineError::RateLimited(project_id));
        }

        let budget = self.budget.check_budget(project_id, tenant_id).await?;
        if !budget.has_quota {
            return Err(PipelineError::BudgetExhausted(project_id));
        }

        let file = self
            .files
            .get(tenant_id, file_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("file {}", file_id)))?;

        let segments = self.segments.for_file(tenant_id, file_id).await?;
        if segments.is_empty() {
            return Err(PipelineError::EmptyFile(file_id));
        }
        let known_segments: HashSet<Uuid> = segments.iter().map(|s| s.id).collect();

        let prior = self
            .findings
            .for_file(tenant_id, file_id, Some(self.prior_layers()))
            .await?;

        let chunks = chunk_segments(&segments, self.chunk_char_budget);
        let total_chunks = chunks.len();
        let mut findings: Vec<Finding> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut chunks_failed = 0usize;

        for chunk in chunks {
            match self
                .review_chunk(tenant_id, project_id, &file, &chunk, &prior)
                .await
            {
                Ok(response) => {
                    usage.add(&response.usage);
                    for ai_finding in response.findings {
                        if !known_segments.contains(&ai_finding.segment_id) {
                            warn!(
                                %file_id, segment_id = %ai_finding.segment_id,
                                "dropping finding for segment not in file"
                            );
                            continue;
                        }
                        findings.push(Finding {
                            id: Uuid::new_v4(),
                            tenant_id,
                            project_id,
                            file_id: Some(file_id),
                            segment_id: Some(ai_finding.segment_id),
                            layer: self.layer,
                            severity: ai_finding.severity,
                            category: ai_finding.category,
                            status: FindingStatus::Pending,
                            segment_count: 1,
                            description: ai_finding.description,
                            suggested_fix: ai_finding.suggested_fix,
                            confidence: Some(ai_finding.confidence.clamp(0.0, 100.0)),
                            source_file_ids: None,
                        });
                    }
                }
                Err(e) if e.is_retriable() => {
                    return Err(match e {
                        AiCallError::RateLimited(_) => PipelineError::RateLimited(project_id),
                        other => PipelineError::AiTimeout(other.to_string()),
                    });
                }
                Err(e) => {
                    warn!(%file_id, chunk = chunk.index, "chunk review failed: {}", e);
                    chunks_failed += 1;
                }
            }
        }

        let finding_count = self
            .findings
            .replace_for_layer(tenant_id, file_id, self.layer, &findings)
            .await?;

        let completed = self.layer.completed_status().ok_or_else(|| {
            PipelineError::Internal(format!("{} has no completed status", self.layer))
        })?;
        self.files.set_status(tenant_id, file_id, completed).await?;

        let partial_failure = chunks_failed > 0;
        info!(
            %file_id, layer = %self.layer, finding_count, chunks_failed,
            "AI pass completed"
        );
        self.audit
            .record(AuditEntry {
                tenant_id,
                project_id: Some(project_id),
                file_id: Some(file_id),
                action: format!("layer.{}.completed", self.layer),
                details: json!({
                    "findingCount": finding_count,
                    "totalChunks": total_chunks,
                    "chunksFailed": chunks_failed,
                    "model": self.generator.model_id(),
                    "inputTokens": usage.input_tokens,
                    "outputTokens": usage.output_tokens,
                    "costUsd": usage.cost_usd,
                }),
            })
            .await;

        if self
            .event_bus
            .emit(TqaEvent::LayerCompleted {
                file_id,
                layer: self.layer.as_str().to_string(),
                finding_count,
                partial_failure,
                timestamp: Utc::now(),
            })
            .is_err()
        {
            warn!(%file_id, "layer event dropped: no subscribers");
        }

        Ok(AiPassSummary {
            layer: self.layer,
            finding_count,
            total_chunks,
            chunks_succeeded: total_chunks - chunks_failed,
            chunks_failed,
            partial_failure,
            model: self.generator.model_id(),
            usage,
        })
    }

    async fn review_chunk(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        file: &QaFile,
        chunk: &Chunk,
        prior: &[Finding],
    ) -> Result<crate::services::llm::ChunkReviewResponse, AiCallError> {
        let request = ChunkReviewRequest {
            layer: self.layer,
            source_language: file.source_language.clone(),
            target_language: file.target_language.clone(),
            chunk: chunk.clone(),
            prior_findings: prior.to_vec(),
        };
        let response = self.generator.review_chunk(&request).await?;

        self.audit
            .record(AuditEntry {
                tenant_id,
                project_id: Some(project_id),
                file_id: Some(file.id),
                action: format!("layer.{}.chunk_reviewed", self.layer),
                details: json!({
                    "chunk": chunk.index,
                    "segmentCount": chunk.segments.len(),
                    "inputTokens": response.usage.input_tokens,
                    "outputTokens": response.usage.output_tokens,
                    "costUsd": response.usage.cost_usd,
                }),
            })
            .await;

        Ok(response)
    }
}
