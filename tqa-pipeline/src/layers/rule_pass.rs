//! L1 deterministic rule pass
//!
//! Runs the rule engine over all of a file's segments with the tenant's
//! glossary, suppression list and custom rules. Fully deterministic: a
//! rerun over unchanged inputs replaces the finding set with an
//! identical one.

use crate::db::audit::{AuditEntry, AuditLog};
use crate::db::files::FileRepository;
use crate::db::findings::FindingRepository;
use crate::db::segments::SegmentRepository;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Finding, FindingStatus, Layer, Severity};
use crate::services::rules::{GlossaryProvider, RuleConfigProvider, RuleEngine};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tqa_common::events::{EventBus, TqaEvent};
use tracing::{info, warn};
use uuid::Uuid;

pub struct RulePassRunner {
    files: FileRepository,
    segments: SegmentRepository,
    findings: FindingRepository,
    audit: AuditLog,
    engine: Arc<dyn RuleEngine>,
    glossary: Arc<dyn GlossaryProvider>,
    rule_config: Arc<dyn RuleConfigProvider>,
    event_bus: EventBus,
}

impl RulePassRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: FileRepository,
        segments: SegmentRepository,
        findings: FindingRepository,
        audit: AuditLog,
        engine: Arc<dyn RuleEngine>,
        glossary: Arc<dyn GlossaryProvider>,
        rule_config: Arc<dyn RuleConfigProvider>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            files,
            segments,
            findings,
            audit,
            engine,
            glossary,
            rule_config,
            event_bus,
        }
    }

    /// Run the deterministic pass over a file.
    ///
    /// Claims the file from `parsed`, leaves it at `l1_completed` on
    /// success. On failure the file is rolled back and the original error
    /// is returned; rollback failures are logged, never surfaced.
    pub async fn run(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        file_id: Uuid,
    ) -> PipelineResult<usize> {
        self.files.claim(tenant_id, file_id, Layer::L1).await?;

        match self.run_claimed(tenant_id, project_id, file_id).await {
            Ok(count) => Ok(count),
            Err(e) => {
                rollback(&self.files, tenant_id, file_id, Layer::L1, &e).await;
                Err(e)
            }
        }
    }

    async fn run_claimed(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        file_id: Uuid,
    ) -> PipelineResult<usize> {
        let segments = self.segments.for_file(tenant_id, file_id).await?;
        if segments.is_empty() {
            return Err(PipelineError::EmptyFile(file_id));
        }

        let glossary = self.glossary.terms(tenant_id, project_id).await?;
        let suppressed = self
            .rule_config
            .suppressed_categories(tenant_id, project_id)
            .await?;
        let custom = self.rule_config.custom_rules(tenant_id, project_id).await?;

        let raw = self
            .engine
            .evaluate(&segments, &glossary, &suppressed, &custom)
            .await?;

        let findings: Vec<Finding> = raw
            .into_iter()
            .map(|f| Finding {
                id: Uuid::new_v4(),
                tenant_id,
                project_id,
                file_id: Some(file_id),
                segment_id: Some(f.segment_id),
                layer: Layer::L1,
                severity: f.severity,
                category: f.category,
                status: FindingStatus::Pending,
                segment_count: f.segment_count,
                description: f.description,
                suggested_fix: f.suggested_fix,
                confidence: None,
                source_file_ids: None,
            })
            .collect();

        let count = self
            .findings
            .replace_for_layer(tenant_id, file_id, Layer::L1, &findings)
            .await?;

        self.files
            .set_status(tenant_id, file_id, Layer::L1.completed_status().ok_or_else(
                || PipelineError::Internal("l1 has no completed status".to_string()),
            )?)
            .await?;

        let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
        let major = findings.iter().filter(|f| f.severity == Severity::Major).count();
        let minor = findings.iter().filter(|f| f.severity == Severity::Minor).count();

        info!(%file_id, count, "rule pass completed");
        self.audit
            .record(AuditEntry {
                tenant_id,
                project_id: Some(project_id),
                file_id: Some(file_id),
                action: "layer.l1.completed".to_string(),
                details: json!({
                    "findingCount": count,
                    "critical": critical,
                    "major": major,
                    "minor": minor,
                }),
            })
            .await;

        if self
            .event_bus
            .emit(TqaEvent::LayerCompleted {
                file_id,
                layer: Layer::L1.as_str().to_string(),
                finding_count: count,
                partial_failure: false,
                timestamp: Utc::now(),
            })
            .is_err()
        {
            warn!(%file_id, "layer event dropped: no subscribers");
        }

        Ok(count)
    }
}

/// Roll a claimed file back after a failed layer run.
///
/// Retriable errors restore the predecessor state so a workflow retry
/// can re-claim; everything else lands at `failed`. The original error
/// always wins over a rollback failure.
pub(crate) async fn rollback(
    files: &FileRepository,
    tenant_id: Uuid,
    file_id: Uuid,
    layer: Layer,
    cause: &PipelineError,
) {
    let target = if cause.is_retriable() {
        layer.expected_predecessor()
    } else {
        Some(crate::models::FileStatus::Failed)
    };

    if let Some(target) = target {
        if let Err(rollback_err) = files.set_status(tenant_id, file_id, target).await {
            warn!(
                %file_id, %target,
                "rollback after failed {} run did not stick: {}", layer, rollback_err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{FileStatus, QaFile, Segment};
    use crate::services::rules::{BuiltinRuleEngine, EmptyGlossary, EmptyRuleConfig};
    use sqlx::SqlitePool;

    fn runner(pool: &SqlitePool) -> RulePassRunner {
        RulePassRunner::new(
            FileRepository::new(pool.clone()),
            SegmentRepository::new(pool.clone()),
            FindingRepository::new(pool.clone()),
            AuditLog::new(pool.clone()),
            Arc::new(BuiltinRuleEngine),
            Arc::new(EmptyGlossary),
            Arc::new(EmptyRuleConfig),
            EventBus::new(16),
        )
    }

    async fn insert_file(pool: &SqlitePool, status: FileStatus) -> QaFile {
        let file = QaFile {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "ui.xliff".to_string(),
            status,
            source_language: "en".to_string(),
            target_language: "de".to_string(),
        };
        FileRepository::new(pool.clone()).insert(&file).await.unwrap();
        file
    }

    fn segment(file_id: Uuid, position: i64, source: &str, target: &str) -> Segment {
        Segment {
            id: Uuid::new_v4(),
            file_id,
            position,
            source_text: source.to_string(),
            target_text: target.to_string(),
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            word_count: source.split_whitespace().count() as i64,
            signed_off: false,
        }
    }

    #[tokio::test]
    async fn successful_run_advances_file_and_stores_findings() {
        let pool = test_pool().await;
        let file = insert_file(&pool, FileStatus::Parsed).await;
        SegmentRepository::new(pool.clone())
            .insert_many(
                file.tenant_id,
                &[
                    segment(file.id, 0, "Save changes", "Änderungen speichern"),
                    segment(file.id, 1, "Delete everything now", ""),
                ],
            )
            .await
            .unwrap();

        let count = runner(&pool)
            .run(file.tenant_id, file.project_id, file.id)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let loaded = FileRepository::new(pool.clone())
            .get(file.tenant_id, file.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, FileStatus::L1Completed);

        let findings = FindingRepository::new(pool)
            .for_file(file.tenant_id, file.id, Some(&[Layer::L1]))
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].status, FindingStatus::Pending);
    }

    #[tokio::test]
    async fn claim_refuses_file_in_wrong_state() {
        let pool = test_pool().await;
        let file = insert_file(&pool, FileStatus::Uploaded).await;

        let err = runner(&pool)
            .run(file.tenant_id, file.project_id, file.id)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StateGuard { .. }));

        // The claim never happened, so the status is untouched
        let loaded = FileRepository::new(pool)
            .get(file.tenant_id, file.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, FileStatus::Uploaded);
    }

    #[tokio::test]
    async fn empty_file_fails_and_rolls_back_to_failed() {
        let pool = test_pool().await;
        let file = insert_file(&pool, FileStatus::Parsed).await;

        let err = runner(&pool)
            .run(file.tenant_id, file.project_id, file.id)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyFile(_)));

        let loaded = FileRepository::new(pool)
            .get(file.tenant_id, file.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, FileStatus::Failed);
    }

    #[tokio::test]
    async fn rerun_replaces_previous_finding_set() {
        let pool = test_pool().await;
        let file = insert_file(&pool, FileStatus::Parsed).await;
        SegmentRepository::new(pool.clone())
            .insert_many(
                file.tenant_id,
                &[segment(file.id, 0, "Hello there friend", "")],
            )
            .await
            .unwrap();

        let runner = runner(&pool);
        runner
            .run(file.tenant_id, file.project_id, file.id)
            .await
            .unwrap();

        // Reset the state machine and rerun
        FileRepository::new(pool.clone())
            .set_status(file.tenant_id, file.id, FileStatus::Parsed)
            .await
            .unwrap();
        runner
            .run(file.tenant_id, file.project_id, file.id)
            .await
            .unwrap();

        let findings = FindingRepository::new(pool)
            .for_file(file.tenant_id, file.id, None)
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
    }
}
