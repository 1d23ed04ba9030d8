//! Pipeline workflow orchestration
//!
//! Drives a file through its layer steps in order, with a durable step
//! journal, bounded retries with backoff for retriable errors, and a
//! per-project concurrency limit of one run. Batch processing fans out
//! per file and finishes with the cross-file consistency pass.

use crate::db::files::FileRepository;
use crate::db::runs::RunJournal;
use crate::error::{PipelineError, PipelineResult};
use crate::layers::{AiPassRunner, ConsistencyPass, RulePassRunner};
use crate::models::{FailureContext, FileStatus, Layer, ProcessingMode, TriggerEvent};
use crate::scoring::ScoreOrchestrator;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tqa_common::events::{EventBus, TqaEvent};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Retry attempts per step for retriable errors
const MAX_RETRIES: u32 = 3;

/// Workflow steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    RulePass,
    Screening,
    DeepAnalysis,
    Score,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::RulePass => "rule_pass",
            Step::Screening => "ai_screening",
            Step::DeepAnalysis => "deep_analysis",
            Step::Score => "score",
        }
    }
}

fn steps_for(mode: ProcessingMode) -> &'static [Step] {
    match mode {
        ProcessingMode::Economy => &[Step::RulePass, Step::Screening, Step::Score],
        ProcessingMode::Thorough => &[
            Step::RulePass,
            Step::Screening,
            Step::DeepAnalysis,
            Step::Score,
        ],
    }
}

/// Layers whose findings feed the score, per mode
fn scoring_layers(mode: ProcessingMode) -> &'static [Layer] {
    match mode {
        ProcessingMode::Economy => &[Layer::L1, Layer::L2],
        ProcessingMode::Thorough => &[Layer::L1, Layer::L2, Layer::L3],
    }
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<(Uuid, String)>,
    pub consistency_findings: usize,
}

pub struct PipelineWorkflow {
    files: FileRepository,
    journal: RunJournal,
    rule_pass: RulePassRunner,
    screening: AiPassRunner,
    deep_analysis: AiPassRunner,
    consistency: ConsistencyPass,
    scorer: ScoreOrchestrator,
    event_bus: EventBus,
    project_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    retry_base_delay: Duration,
}

impl PipelineWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: FileRepository,
        journal: RunJournal,
        rule_pass: RulePassRunner,
        screening: AiPassRunner,
        deep_analysis: AiPassRunner,
        consistency: ConsistencyPass,
        scorer: ScoreOrchestrator,
        event_bus: EventBus,
    ) -> Self {
        Self {
            files,
            journal,
            rule_pass,
            screening,
            deep_analysis,
            consistency,
            scorer,
            event_bus,
            project_locks: Mutex::new(HashMap::new()),
            retry_base_delay: Duration::from_millis(500),
        }
    }

    /// Shrink the retry backoff; test builds only
    #[cfg(test)]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// One mutex per project: at most one pipeline run per project at a
    /// time, so concurrent triggers queue instead of fighting over the
    /// CAS claims.
    async fn project_lock(&self, project_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.project_locks.lock().await;
        locks
            .entry(project_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Process one file through its mode's steps.
    ///
    /// Steps already journaled as completed are skipped, so a resumed run
    /// continues where the previous one stopped. A fresh run (file still
    /// at `parsed`) clears any stale journal first.
    pub async fn process_file(&self, event: &TriggerEvent) -> PipelineResult<()> {
        let lock = self.project_lock(event.project_id).await;
        let _guard = lock.lock().await;

        let status = self
            .files
            .current_status(event.tenant_id, event.file_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("file {}", event.file_id)))?;
        if status == FileStatus::Parsed.as_str() {
            self.journal.clear(event.file_id).await?;
        }

        info!(
            file_id = %event.file_id, mode = ?event.mode,
            "pipeline run starting"
        );

        for step in steps_for(event.mode) {
            if self.journal.is_completed(event.file_id, step.name()).await? {
                info!(file_id = %event.file_id, step = step.name(), "step already completed, skipping");
                continue;
            }

            if let Err(e) = self.run_step_with_retry(event, *step).await {
                self.handle_failure(&FailureContext {
                    file_id: event.file_id,
                    tenant_id: event.tenant_id,
                    cause: format!("step {} failed: {}", step.name(), e),
                })
                .await;
                return Err(e);
            }

            self.journal.mark_completed(event.file_id, step.name()).await?;
        }

        info!(file_id = %event.file_id, "pipeline run finished");
        Ok(())
    }

    async fn run_step_with_retry(&self, event: &TriggerEvent, step: Step) -> PipelineResult<()> {
        let mut attempt = 0u32;
        loop {
            match self.run_step(event, step).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retriable() && attempt + 1 < MAX_RETRIES => {
                    attempt += 1;
                    let delay = self.retry_base_delay * 2u32.pow(attempt - 1);
                    warn!(
                        file_id = %event.file_id, step = step.name(), attempt,
                        "retriable step failure, backing off {:?}: {}", delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_step(&self, event: &TriggerEvent, step: Step) -> PipelineResult<()> {
        match step {
            Step::RulePass => {
                self.rule_pass
                    .run(event.tenant_id, event.project_id, event.file_id)
                    .await?;
            }
            Step::Screening => {
                self.screening
                    .run(event.tenant_id, event.project_id, event.file_id)
                    .await?;
            }
            Step::DeepAnalysis => {
                self.deep_analysis
                    .run(event.tenant_id, event.project_id, event.file_id)
                    .await?;
            }
            Step::Score => {
                self.scorer
                    .score_file(
                        event.tenant_id,
                        event.file_id,
                        Some(scoring_layers(event.mode)),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Terminal failure handler.
    ///
    /// Marks the file failed (tenant-scoped), logs a structured error and
    /// emits a failure event. Used both by in-process runs and by the
    /// failure callback endpoint that external runtimes post to.
    pub async fn handle_failure(&self, context: &FailureContext) {
        error!(
            file_id = %context.file_id, tenant_id = %context.tenant_id,
            "pipeline run failed: {}", context.cause
        );

        if let Err(e) = self
            .files
            .set_status(context.tenant_id, context.file_id, FileStatus::Failed)
            .await
        {
            warn!(file_id = %context.file_id, "could not mark file failed: {}", e);
        }

        if self
            .event_bus
            .emit(TqaEvent::FileFailed {
                file_id: context.file_id,
                error: context.cause.clone(),
                timestamp: Utc::now(),
            })
            .is_err()
        {
            warn!(file_id = %context.file_id, "failure event dropped: no subscribers");
        }
    }

    /// Process a batch of files, then run the cross-file consistency pass
    /// over the ones that succeeded.
    ///
    /// Per-file failures do not abort the batch. The consistency pass runs
    /// per (tenant, project) group of successful files.
    pub async fn process_batch(&self, events: &[TriggerEvent]) -> PipelineResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut groups: HashMap<(Uuid, Uuid), Vec<Uuid>> = HashMap::new();

        for event in events {
            match self.process_file(event).await {
                Ok(()) => {
                    summary.succeeded.push(event.file_id);
                    groups
                        .entry((event.tenant_id, event.project_id))
                        .or_default()
                        .push(event.file_id);
                }
                Err(e) => {
                    summary.failed.push((event.file_id, e.to_string()));
                }
            }
        }

        for ((tenant_id, project_id), file_ids) in groups {
            summary.consistency_findings += self
                .consistency
                .run(tenant_id, project_id, &file_ids)
                .await?;
        }

        Ok(summary)
    }
}
