//! Score orchestrator
//!
//! Pulls the finding set and word count, resolves weights, computes the
//! MQM score, evaluates auto-pass eligibility and persists the result as
//! the file's single current score row. Audit and notification are
//! best-effort; score persistence is not.

use crate::db::audit::{AuditEntry, AuditLog};
use crate::db::files::FileRepository;
use crate::db::findings::FindingRepository;
use crate::db::scores::ScoreRepository;
use crate::db::segments::SegmentRepository;
use crate::db::weights::ScoringConfigRepository;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Layer, QaFile, Score, ScoreStatus};
use crate::scoring::auto_pass::{evaluate_auto_pass, AutoPassDecision, AutoPassInput, NEW_PAIR_REVIEW_WINDOW};
use crate::scoring::mqm::calculate_mqm_score;
use crate::services::notify::Notifier;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tqa_common::events::{EventBus, TqaEvent};
use tracing::{info, warn};
use uuid::Uuid;

/// Result of one scoring run
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: Score,
    /// Absent for `na` scores, which never reach the auto-pass gate
    pub decision: Option<AutoPassDecision>,
}

pub struct ScoreOrchestrator {
    files: FileRepository,
    segments: SegmentRepository,
    findings: FindingRepository,
    scores: ScoreRepository,
    config: ScoringConfigRepository,
    audit: AuditLog,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
}

impl ScoreOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: FileRepository,
        segments: SegmentRepository,
        findings: FindingRepository,
        scores: ScoreRepository,
        config: ScoringConfigRepository,
        audit: AuditLog,
        notifier: Arc<dyn Notifier>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            files,
            segments,
            findings,
            scores,
            config,
            audit,
            notifier,
            event_bus,
        }
    }

    /// Score a file from its current finding set.
    ///
    /// `layers` restricts which layers' findings contribute; `None` means
    /// all layers. Rerunning replaces the previous score row while
    /// preserving its layers-completed marker.
    pub async fn score_file(
        &self,
        tenant_id: Uuid,
        file_id: Uuid,
        layers: Option<&[Layer]>,
    ) -> PipelineResult<ScoreOutcome> {
        let file = self
            .files
            .get(tenant_id, file_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("file {}", file_id)))?;

        let total_words = self.segments.total_words(tenant_id, file_id).await?;
        let findings = self.findings.for_file(tenant_id, file_id, layers).await?;
        let weights = self.config.penalty_weights(tenant_id).await?;

        let mqm = calculate_mqm_score(&findings, total_words, &weights);

        if mqm.status == ScoreStatus::Na {
            // Zero translatable words: not a perfect score, not an error
            let score = self
                .persist(&file, total_words, &mqm, ScoreStatus::Na, None, layers)
                .await?;
            self.audit
                .record(AuditEntry {
                    tenant_id,
                    project_id: Some(file.project_id),
                    file_id: Some(file_id),
                    action: "score.not_applicable".to_string(),
                    details: json!({ "totalWords": total_words }),
                })
                .await;
            self.emit_calculated(&score);
            return Ok(ScoreOutcome {
                score,
                decision: None,
            });
        }

        let pair_threshold = self
            .config
            .pair_threshold(
                tenant_id,
                file.project_id,
                &file.source_language,
                &file.target_language,
            )
            .await?;
        let project_threshold = self
            .config
            .project_threshold(tenant_id, file.project_id)
            .await?;
        let scored_file_count = self
            .scores
            .count_scored_for_pair(
                tenant_id,
                file.project_id,
                &file.source_language,
                &file.target_language,
            )
            .await?;

        let decision = evaluate_auto_pass(&AutoPassInput {
            score: mqm.score,
            critical_count: mqm.critical_count,
            pair_threshold,
            project_threshold,
            scored_file_count,
        });

        let status = if decision.eligible {
            ScoreStatus::AutoPassed
        } else {
            ScoreStatus::Calculated
        };

        let score = self
            .persist(
                &file,
                total_words,
                &mqm,
                status,
                Some(decision.rationale.clone()),
                layers,
            )
            .await?;

        let action = if decision.eligible {
            "score.auto_passed"
        } else {
            "score.calculated"
        };
        self.audit
            .record(AuditEntry {
                tenant_id,
                project_id: Some(file.project_id),
                file_id: Some(file_id),
                action: action.to_string(),
                details: json!({
                    "score": score.score,
                    "npt": score.npt,
                    "criticalCount": score.critical_count,
                    "majorCount": score.major_count,
                    "minorCount": score.minor_count,
                    "totalWords": total_words,
                    "rationale": decision.rationale,
                }),
            })
            .await;

        self.emit_calculated(&score);
        if decision.eligible {
            if self
                .event_bus
                .emit(TqaEvent::AutoPassed {
                    file_id,
                    score: score.score,
                    rationale: decision.rationale.clone(),
                    timestamp: Utc::now(),
                })
                .is_err()
            {
                warn!(%file_id, "auto-pass event dropped: no subscribers");
            }
        }

        if decision.is_new_pair
            && decision.eligible
            && decision.file_count == NEW_PAIR_REVIEW_WINDOW
        {
            info!(
                %tenant_id, project_id = %file.project_id,
                source = %file.source_language, target = %file.target_language,
                "language pair graduated from mandatory review window"
            );
            self.notifier
                .pair_graduated(
                    tenant_id,
                    file.project_id,
                    &file.source_language,
                    &file.target_language,
                    decision.file_count,
                )
                .await;
        }

        Ok(ScoreOutcome {
            score,
            decision: Some(decision),
        })
    }

    async fn persist(
        &self,
        file: &QaFile,
        total_words: i64,
        mqm: &crate::scoring::MqmResult,
        status: ScoreStatus,
        rationale: Option<String>,
        layers: Option<&[Layer]>,
    ) -> PipelineResult<Score> {
        let score = Score {
            id: Uuid::new_v4(),
            tenant_id: file.tenant_id,
            project_id: file.project_id,
            file_id: file.id,
            score: mqm.score,
            npt: mqm.npt,
            critical_count: mqm.critical_count,
            major_count: mqm.major_count,
            minor_count: mqm.minor_count,
            total_words,
            status,
            auto_pass_rationale: rationale,
            layers_completed: layers_marker(layers),
            created_at: Utc::now(),
        };
        self.scores.replace_for_file(&score).await
    }

    fn emit_calculated(&self, score: &Score) {
        if self
            .event_bus
            .emit(TqaEvent::ScoreCalculated {
                file_id: score.file_id,
                score: score.score,
                npt: score.npt,
                status: score.status.as_str().to_string(),
                timestamp: Utc::now(),
            })
            .is_err()
        {
            warn!(file_id = %score.file_id, "score event dropped: no subscribers");
        }
    }
}

/// Highest per-file layer among the contributing set, recorded on the
/// score row so later reruns know how deep processing got
fn layers_marker(layers: Option<&[Layer]>) -> Option<String> {
    let layers = layers?;
    layers
        .iter()
        .filter_map(|layer| match layer {
            Layer::L1 => Some((1, "l1")),
            Layer::L2 => Some((2, "l2")),
            Layer::L3 => Some((3, "l3")),
            Layer::Consistency => None,
        })
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, name)| name.to_string())
}
