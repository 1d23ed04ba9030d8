//! Rule-evaluation and glossary collaborators for the deterministic pass

use crate::error::PipelineResult;
use crate::models::{Segment, Severity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A glossary term pair supplied by the glossary-matching collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub source_term: String,
    pub target_term: String,
}

/// A tenant-defined custom rule definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    pub id: Uuid,
    pub name: String,
    /// Substring that must not appear in the target text
    pub forbidden_target: String,
    pub category: String,
    pub severity: Severity,
}

/// A raw finding candidate produced by the rule evaluation
#[derive(Debug, Clone)]
pub struct RuleFinding {
    pub segment_id: Uuid,
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub suggested_fix: Option<String>,
    pub segment_count: i64,
}

/// Rule-evaluation collaborator contract
#[async_trait]
pub trait RuleEngine: Send + Sync {
    async fn evaluate(
        &self,
        segments: &[Segment],
        glossary: &[GlossaryTerm],
        suppressed_categories: &[String],
        custom_rules: &[CustomRule],
    ) -> PipelineResult<Vec<RuleFinding>>;
}

/// Glossary-matching collaborator contract
#[async_trait]
pub trait GlossaryProvider: Send + Sync {
    async fn terms(&self, tenant_id: Uuid, project_id: Uuid) -> PipelineResult<Vec<GlossaryTerm>>;
}

/// Supplier of suppression rules and custom rule definitions
#[async_trait]
pub trait RuleConfigProvider: Send + Sync {
    async fn suppressed_categories(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
    ) -> PipelineResult<Vec<String>>;

    async fn custom_rules(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
    ) -> PipelineResult<Vec<CustomRule>>;
}

/// Glossary provider with no terms, for deployments without a glossary
pub struct EmptyGlossary;

#[async_trait]
impl GlossaryProvider for EmptyGlossary {
    async fn terms(&self, _tenant_id: Uuid, _project_id: Uuid) -> PipelineResult<Vec<GlossaryTerm>> {
        Ok(Vec::new())
    }
}

/// Rule config provider with no suppressions or custom rules
pub struct EmptyRuleConfig;

#[async_trait]
impl RuleConfigProvider for EmptyRuleConfig {
    async fn suppressed_categories(
        &self,
        _tenant_id: Uuid,
        _project_id: Uuid,
    ) -> PipelineResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn custom_rules(
        &self,
        _tenant_id: Uuid,
        _project_id: Uuid,
    ) -> PipelineResult<Vec<CustomRule>> {
        Ok(Vec::new())
    }
}

/// Built-in deterministic checks used when no external rule collaborator
/// is wired in: empty target, untranslated target, glossary adherence,
/// and substring-based custom rules. Suppressed categories are dropped
/// before candidates are returned.
pub struct BuiltinRuleEngine;

#[async_trait]
impl RuleEngine for BuiltinRuleEngine {
    async fn evaluate(
        &self,
        segments: &[Segment],
        glossary: &[GlossaryTerm],
        suppressed_categories: &[String],
        custom_rules: &[CustomRule],
    ) -> PipelineResult<Vec<RuleFinding>> {
        let mut findings = Vec::new();

        for segment in segments {
            let source = segment.source_text.trim();
            let target = segment.target_text.trim();

            if !source.is_empty() && target.is_empty() {
                findings.push(RuleFinding {
                    segment_id: segment.id,
                    category: "completeness".to_string(),
                    severity: Severity::Critical,
                    description: "Target segment is empty".to_string(),
                    suggested_fix: None,
                    segment_count: 1,
                });
                continue;
            }

            if !source.is_empty()
                && source == target
                && source.split_whitespace().count() >= 3
            {
                findings.push(RuleFinding {
                    segment_id: segment.id,
                    category: "accuracy".to_string(),
                    severity: Severity::Major,
                    description: "Target is identical to source (untranslated)".to_string(),
                    suggested_fix: None,
                    segment_count: 1,
                });
            }

            for term in glossary {
                if source.contains(&term.source_term) && !target.contains(&term.target_term) {
                    findings.push(RuleFinding {
                        segment_id: segment.id,
                        category: "terminology".to_string(),
                        severity: Severity::Minor,
                        description: format!(
                            "Glossary term '{}' not rendered as '{}'",
                            term.source_term, term.target_term
                        ),
                        suggested_fix: Some(format!("Use '{}'", term.target_term)),
                        segment_count: 1,
                    });
                }
            }

            for rule in custom_rules {
                if !rule.forbidden_target.is_empty() && target.contains(&rule.forbidden_target) {
                    findings.push(RuleFinding {
                        segment_id: segment.id,
                        category: rule.category.clone(),
                        severity: rule.severity,
                        description: format!(
                            "Custom rule '{}': forbidden text '{}' present",
                            rule.name, rule.forbidden_target
                        ),
                        suggested_fix: None,
                        segment_count: 1,
                    });
                }
            }
        }

        findings.retain(|f| !suppressed_categories.contains(&f.category));
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(source: &str, target: &str) -> Segment {
        Segment {
            id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            position: 0,
            source_text: source.to_string(),
            target_text: target.to_string(),
            source_language: "en".to_string(),
            target_language: "de".to_string(),
            word_count: source.split_whitespace().count() as i64,
            signed_off: false,
        }
    }

    #[tokio::test]
    async fn empty_target_is_critical() {
        let engine = BuiltinRuleEngine;
        let findings = engine
            .evaluate(&[segment("Press the button", "")], &[], &[], &[])
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].category, "completeness");
    }

    #[tokio::test]
    async fn glossary_miss_is_reported_unless_suppressed() {
        let engine = BuiltinRuleEngine;
        let glossary = vec![GlossaryTerm {
            source_term: "button".to_string(),
            target_term: "Schaltfläche".to_string(),
        }];
        let segments = [segment("Press the button", "Drücken Sie den Knopf")];

        let findings = engine
            .evaluate(&segments, &glossary, &[], &[])
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "terminology");

        let suppressed = engine
            .evaluate(&segments, &glossary, &["terminology".to_string()], &[])
            .await
            .unwrap();
        assert!(suppressed.is_empty());
    }

    #[tokio::test]
    async fn evaluation_is_deterministic_across_reruns() {
        let engine = BuiltinRuleEngine;
        let segments = [
            segment("One two three", "One two three"),
            segment("Hello", ""),
        ];
        let first = engine.evaluate(&segments, &[], &[], &[]).await.unwrap();
        let second = engine.evaluate(&segments, &[], &[], &[]).await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.segment_id, b.segment_id);
            assert_eq!(a.category, b.category);
            assert_eq!(a.description, b.description);
        }
    }
}
