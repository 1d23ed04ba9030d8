//! Score model and penalty weights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a computed score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    /// Computed normally (total words > 0)
    Calculated,
    /// Not applicable: the file has zero words; never a perfect score
    Na,
    /// Computed and automatically accepted without manual review
    AutoPassed,
}

impl ScoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreStatus::Calculated => "calculated",
            ScoreStatus::Na => "na",
            ScoreStatus::AutoPassed => "auto_passed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "calculated" => ScoreStatus::Calculated,
            "na" => ScoreStatus::Na,
            "auto_passed" => ScoreStatus::AutoPassed,
            _ => return None,
        })
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-severity penalty weights used by the MQM calculation.
///
/// Resolved per tenant: tenant override, else system default row, else
/// these hardcoded values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    pub critical: f64,
    pub major: f64,
    pub minor: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            critical: 25.0,
            major: 5.0,
            minor: 1.0,
        }
    }
}

/// The current quality score of a file.
///
/// At most one row per file; fully recomputable from findings, segments
/// and the resolved weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub file_id: Uuid,
    /// Normalized 0-100 quality score
    pub score: f64,
    /// Normalized penalty total (per 1000 words)
    pub npt: f64,
    pub critical_count: i64,
    pub major_count: i64,
    pub minor_count: i64,
    pub total_words: i64,
    pub status: ScoreStatus,
    /// Human-readable auto-pass rationale, present when auto-passed
    pub auto_pass_rationale: Option<String>,
    /// Marker of which layer last completed before scoring; preserved
    /// from the prior row when the score is replaced
    pub layers_completed: Option<String>,
    pub created_at: DateTime<Utc>,
}
