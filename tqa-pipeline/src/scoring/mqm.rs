//! MQM score calculation
//!
//! Pure function from a finding set, a word count and resolved penalty
//! weights to a normalized 0-100 score. No database access, so layer
//! reruns and score recomputations are deterministic.

use crate::models::{Finding, PenaltyWeights, ScoreStatus, Severity};

/// Result of an MQM calculation
#[derive(Debug, Clone, PartialEq)]
pub struct MqmResult {
    /// Normalized quality score, 0-100
    pub score: f64,
    /// Normalized penalty total per 1000 words
    pub npt: f64,
    pub critical_count: i64,
    pub major_count: i64,
    pub minor_count: i64,
    pub status: ScoreStatus,
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute the MQM score for a file.
///
/// A zero word count forces status `na` with zeroed counts regardless of
/// findings present; it is never interpreted as a perfect score. Findings
/// outside the contributing status set (pending, accepted, re_accepted)
/// are excluded from both the penalty sum and the severity counts. Each
/// finding contributes once irrespective of how many segments it spans.
pub fn calculate_mqm_score(
    findings: &[Finding],
    total_words: i64,
    weights: &PenaltyWeights,
) -> MqmResult {
    if total_words == 0 {
        return MqmResult {
            score: 0.0,
            npt: 0.0,
            critical_count: 0,
            major_count: 0,
            minor_count: 0,
            status: ScoreStatus::Na,
        };
    }

    let mut critical_count = 0i64;
    let mut major_count = 0i64;
    let mut minor_count = 0i64;
    let mut penalty_sum = 0.0f64;

    for finding in findings {
        if !finding.status.contributes_to_score() {
            continue;
        }
        match finding.severity {
            Severity::Critical => {
                critical_count += 1;
                penalty_sum += weights.critical;
            }
            Severity::Major => {
                major_count += 1;
                penalty_sum += weights.major;
            }
            Severity::Minor => {
                minor_count += 1;
                penalty_sum += weights.minor;
            }
        }
    }

    let npt = round2(penalty_sum / total_words as f64 * 1000.0);
    let score = round2((100.0 - npt).max(0.0));

    MqmResult {
        score,
        npt,
        critical_count,
        major_count,
        minor_count,
        status: ScoreStatus::Calculated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FindingStatus, Layer};
    use uuid::Uuid;

    fn finding(severity: Severity, status: FindingStatus, segment_count: i64) -> Finding {
        Finding {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            file_id: Some(Uuid::new_v4()),
            segment_id: Some(Uuid::new_v4()),
            layer: Layer::L1,
            severity,
            category: "accuracy".to_string(),
            status,
            segment_count,
            description: "test".to_string(),
            suggested_fix: None,
            confidence: None,
            source_file_ids: None,
        }
    }

    #[test]
    fn no_findings_is_a_perfect_calculated_score() {
        let result = calculate_mqm_score(&[], 1000, &PenaltyWeights::default());
        assert_eq!(result.score, 100.0);
        assert_eq!(result.npt, 0.0);
        assert_eq!(result.status, ScoreStatus::Calculated);
    }

    #[test]
    fn zero_words_is_na_even_with_findings() {
        let findings = vec![finding(Severity::Critical, FindingStatus::Pending, 1)];
        let result = calculate_mqm_score(&findings, 0, &PenaltyWeights::default());
        assert_eq!(result.status, ScoreStatus::Na);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.npt, 0.0);
        assert_eq!(result.critical_count, 0);
    }

    #[test]
    fn weighted_penalty_sum_per_1000_words() {
        // 2 critical + 3 major + 5 minor @ 25/5/1 over 1000 words:
        // npt = (50 + 15 + 5) / 1000 * 1000 = 70, score = 30
        let mut findings = Vec::new();
        for _ in 0..2 {
            findings.push(finding(Severity::Critical, FindingStatus::Pending, 1));
        }
        for _ in 0..3 {
            findings.push(finding(Severity::Major, FindingStatus::Accepted, 1));
        }
        for _ in 0..5 {
            findings.push(finding(Severity::Minor, FindingStatus::ReAccepted, 1));
        }

        let result = calculate_mqm_score(&findings, 1000, &PenaltyWeights::default());
        assert_eq!(result.npt, 70.0);
        assert_eq!(result.score, 30.0);
        assert_eq!(result.critical_count, 2);
        assert_eq!(result.major_count, 3);
        assert_eq!(result.minor_count, 5);
        assert_eq!(result.status, ScoreStatus::Calculated);
    }

    #[test]
    fn non_contributing_statuses_are_excluded_entirely() {
        let findings = vec![
            finding(Severity::Critical, FindingStatus::Rejected, 1),
            finding(Severity::Critical, FindingStatus::Flagged, 1),
            finding(Severity::Major, FindingStatus::Noted, 1),
            finding(Severity::Major, FindingStatus::SourceIssue, 1),
            finding(Severity::Minor, FindingStatus::Manual, 1),
        ];
        let result = calculate_mqm_score(&findings, 500, &PenaltyWeights::default());
        assert_eq!(result.npt, 0.0);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.critical_count, 0);
        assert_eq!(result.major_count, 0);
        assert_eq!(result.minor_count, 0);
    }

    #[test]
    fn multi_segment_finding_counts_once() {
        let findings = vec![finding(Severity::Major, FindingStatus::Pending, 3)];
        let result = calculate_mqm_score(&findings, 1000, &PenaltyWeights::default());
        // One major weight unit, not three
        assert_eq!(result.npt, 5.0);
        assert_eq!(result.major_count, 1);
    }

    #[test]
    fn score_floors_at_zero_but_stays_calculated() {
        let findings: Vec<Finding> = (0..20)
            .map(|_| finding(Severity::Critical, FindingStatus::Pending, 1))
            .collect();
        let result = calculate_mqm_score(&findings, 100, &PenaltyWeights::default());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.npt, 5000.0);
        assert_eq!(result.status, ScoreStatus::Calculated);
    }

    #[test]
    fn npt_rounds_to_two_decimals() {
        let findings = vec![finding(Severity::Minor, FindingStatus::Pending, 1)];
        let result = calculate_mqm_score(&findings, 300, &PenaltyWeights::default());
        // 1 / 300 * 1000 = 3.333... -> 3.33
        assert_eq!(result.npt, 3.33);
        assert_eq!(result.score, 96.67);
    }
}
