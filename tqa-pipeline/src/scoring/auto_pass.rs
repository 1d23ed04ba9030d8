//! Auto-pass eligibility
//!
//! Business-rule gate combining the computed score, the critical-finding
//! count, and language-pair maturity. Pure decision logic; the score
//! orchestrator supplies the looked-up thresholds and file counts.

/// Files that must be manually reviewed before a new language pair can
/// auto-pass
pub const NEW_PAIR_REVIEW_WINDOW: i64 = 50;

/// Conservative threshold used when the project record cannot be found
pub const FALLBACK_AUTO_PASS_THRESHOLD: f64 = 99.0;

/// Inputs to the eligibility decision
#[derive(Debug, Clone)]
pub struct AutoPassInput {
    pub score: f64,
    pub critical_count: i64,
    /// Language-pair-specific threshold, when configured
    pub pair_threshold: Option<f64>,
    /// Project-level threshold; `None` when the project record is missing
    pub project_threshold: Option<f64>,
    /// Files already scored for this exact language pair in the project
    pub scored_file_count: i64,
}

/// Eligibility decision, including the human-readable rationale consumed
/// by the score orchestrator and shown to reviewers.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoPassDecision {
    pub eligible: bool,
    pub rationale: String,
    /// True when no dedicated language-pair config exists
    pub is_new_pair: bool,
    /// File count observed at decision time
    pub file_count: i64,
}

/// Evaluate auto-pass eligibility.
///
/// Decision order: a dedicated language-pair threshold wins outright; a
/// pair with no config and fewer than [`NEW_PAIR_REVIEW_WINDOW`] scored
/// files sits in a mandatory-manual-review window regardless of score;
/// past the window the project threshold applies (falling back to
/// [`FALLBACK_AUTO_PASS_THRESHOLD`] when the project is unknown). Every
/// eligible branch also requires zero critical findings.
pub fn evaluate_auto_pass(input: &AutoPassInput) -> AutoPassDecision {
    if let Some(threshold) = input.pair_threshold {
        let eligible = input.score >= threshold && input.critical_count == 0;
        let rationale = if eligible {
            format!(
                "Auto-passed: score {:.2} meets language-pair threshold {:.2} with 0 critical findings",
                input.score, threshold
            )
        } else {
            format!(
                "Not eligible: score {:.2} vs language-pair threshold {:.2}, {} critical finding(s)",
                input.score, threshold, input.critical_count
            )
        };
        return AutoPassDecision {
            eligible,
            rationale,
            is_new_pair: false,
            file_count: input.scored_file_count,
        };
    }

    if input.scored_file_count < NEW_PAIR_REVIEW_WINDOW {
        return AutoPassDecision {
            eligible: false,
            rationale: format!(
                "Not eligible: new language pair in mandatory review window ({}/{} files scored)",
                input.scored_file_count, NEW_PAIR_REVIEW_WINDOW
            ),
            is_new_pair: true,
            file_count: input.scored_file_count,
        };
    }

    let threshold = input
        .project_threshold
        .unwrap_or(FALLBACK_AUTO_PASS_THRESHOLD);
    let threshold_source = if input.project_threshold.is_some() {
        "project"
    } else {
        "fallback"
    };
    let eligible = input.score >= threshold && input.critical_count == 0;
    let rationale = if eligible {
        format!(
            "Auto-passed: score {:.2} meets {} threshold {:.2} with 0 critical findings ({} files scored for pair)",
            input.score, threshold_source, threshold, input.scored_file_count
        )
    } else {
        format!(
            "Not eligible: score {:.2} vs {} threshold {:.2}, {} critical finding(s)",
            input.score, threshold_source, threshold, input.critical_count
        )
    };

    AutoPassDecision {
        eligible,
        rationale,
        is_new_pair: true,
        file_count: input.scored_file_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(score: f64, critical: i64) -> AutoPassInput {
        AutoPassInput {
            score,
            critical_count: critical,
            pair_threshold: None,
            project_threshold: None,
            scored_file_count: 0,
        }
    }

    #[test]
    fn pair_threshold_grants_eligibility() {
        let decision = evaluate_auto_pass(&AutoPassInput {
            pair_threshold: Some(95.0),
            scored_file_count: 3,
            ..input(97.5, 0)
        });
        assert!(decision.eligible);
        assert!(!decision.is_new_pair);
        assert!(decision.rationale.contains("97.50"));
        assert!(decision.rationale.contains("95.00"));
    }

    #[test]
    fn critical_findings_block_even_above_threshold() {
        let decision = evaluate_auto_pass(&AutoPassInput {
            pair_threshold: Some(90.0),
            ..input(99.9, 1)
        });
        assert!(!decision.eligible);
        assert!(decision.rationale.contains("1 critical finding"));
    }

    #[test]
    fn review_window_blocks_at_49_files() {
        let decision = evaluate_auto_pass(&AutoPassInput {
            scored_file_count: 49,
            ..input(100.0, 0)
        });
        assert!(!decision.eligible);
        assert!(decision.is_new_pair);
        assert_eq!(decision.file_count, 49);
        assert!(decision.rationale.contains("49/50"));
    }

    #[test]
    fn at_50_files_falls_through_to_project_threshold() {
        let decision = evaluate_auto_pass(&AutoPassInput {
            scored_file_count: 50,
            project_threshold: Some(95.0),
            ..input(96.0, 0)
        });
        assert!(decision.eligible);
        assert!(decision.is_new_pair);
        assert_eq!(decision.file_count, 50);
        assert!(decision.rationale.contains("project threshold 95.00"));
    }

    #[test]
    fn missing_project_uses_conservative_fallback() {
        let below = evaluate_auto_pass(&AutoPassInput {
            scored_file_count: 80,
            ..input(98.5, 0)
        });
        assert!(!below.eligible);
        assert!(below.rationale.contains("fallback threshold 99.00"));

        let above = evaluate_auto_pass(&AutoPassInput {
            scored_file_count: 80,
            ..input(99.2, 0)
        });
        assert!(above.eligible);
    }
}
