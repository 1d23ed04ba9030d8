//! Batch-scoped cross-file consistency pass
//!
//! Groups segments across a batch by normalized source text and flags
//! groups whose targets diverge. Stands outside the per-file state
//! machine: findings carry no owning file, only the set of contributing
//! file ids, and reruns replace the project's whole consistency set.

use crate::db::audit::{AuditEntry, AuditLog};
use crate::db::findings::FindingRepository;
use crate::db::segments::SegmentRepository;
use crate::error::PipelineResult;
use crate::models::{Finding, FindingStatus, Layer, Segment, Severity};
use crate::services::rules::GlossaryProvider;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::info;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// Minimum source word count for a segment to participate; short strings
/// ("OK", "Yes") legitimately translate differently by context
const MIN_SOURCE_WORDS: usize = 3;

pub struct ConsistencyPass {
    segments: SegmentRepository,
    findings: FindingRepository,
    glossary: Arc<dyn GlossaryProvider>,
    audit: AuditLog,
}

impl ConsistencyPass {
    pub fn new(
        segments: SegmentRepository,
        findings: FindingRepository,
        glossary: Arc<dyn GlossaryProvider>,
        audit: AuditLog,
    ) -> Self {
        Self {
            segments,
            findings,
            glossary,
            audit,
        }
    }

    /// Run the consistency pass over a batch of files.
    ///
    /// Produces exactly one finding per divergent source group, however
    /// many segments repeat it, and replaces the project's previous
    /// consistency set.
    pub async fn run(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        file_ids: &[Uuid],
    ) -> PipelineResult<usize> {
        let segments = self.segments.for_files(tenant_id, file_ids).await?;

        let glossary = self.glossary.terms(tenant_id, project_id).await?;
        let glossary_sources: HashSet<String> = glossary
            .iter()
            .map(|term| normalize(&term.source_term))
            .collect();

        // BTreeMap keeps group iteration order stable across reruns
        let mut groups: BTreeMap<String, Vec<&Segment>> = BTreeMap::new();
        for segment in &segments {
            if segment.signed_off {
                continue;
            }
            let source = normalize(&segment.source_text);
            if source.split_whitespace().count() < MIN_SOURCE_WORDS {
                continue;
            }
            // Glossary-governed sources are already checked by the rule pass
            if glossary_sources.contains(&source) {
                continue;
            }
            groups.entry(source).or_default().push(segment);
        }

        let mut findings = Vec::new();
        for (source, group) in &groups {
            let distinct_targets: BTreeSet<String> =
                group.iter().map(|s| normalize(&s.target_text)).collect();
            if distinct_targets.len() < 2 {
                continue;
            }

            let contributing: BTreeSet<Uuid> = group.iter().map(|s| s.file_id).collect();
            findings.push(Finding {
                id: Uuid::new_v4(),
                tenant_id,
                project_id,
                file_id: None,
                segment_id: None,
                layer: Layer::Consistency,
                severity: Severity::Major,
                category: "consistency".to_string(),
                status: FindingStatus::Pending,
                segment_count: group.len() as i64,
                description: format!(
                    "Source \"{}\" is translated {} different ways across {} segment(s)",
                    source,
                    distinct_targets.len(),
                    group.len()
                ),
                suggested_fix: None,
                confidence: None,
                source_file_ids: Some(contributing.into_iter().collect()),
            });
        }

        let count = self
            .findings
            .replace_consistency(tenant_id, project_id, &findings)
            .await?;

        info!(%project_id, count, files = file_ids.len(), "consistency pass completed");
        self.audit
            .record(AuditEntry {
                tenant_id,
                project_id: Some(project_id),
                file_id: None,
                action: "layer.consistency.completed".to_string(),
                details: json!({
                    "findingCount": count,
                    "fileCount": file_ids.len(),
                }),
            })
            .await;

        Ok(count)
    }
}

/// NFC-normalize and trim, so "café" in NFC and NFD compare equal
fn normalize(text: &str) -> String {
    text.nfc().collect::<String>().trim().to_string()
}
