//! Finding model: a detected quality issue

use crate::models::FileStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pipeline layer that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Deterministic rule pass
    L1,
    /// AI screening pass
    L2,
    /// Deep AI analysis pass
    L3,
    /// Cross-file consistency pass (batch-scoped, no owning file)
    Consistency,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L1 => "l1",
            Layer::L2 => "l2",
            Layer::L3 => "l3",
            Layer::Consistency => "consistency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "l1" => Layer::L1,
            "l2" => Layer::L2,
            "l3" => Layer::L3,
            "consistency" => Layer::Consistency,
            _ => return None,
        })
    }

    /// File status a runner for this layer expects to claim from.
    ///
    /// The consistency pass does not participate in the per-file state
    /// machine and has no predecessor.
    pub fn expected_predecessor(&self) -> Option<FileStatus> {
        match self {
            Layer::L1 => Some(FileStatus::Parsed),
            Layer::L2 => Some(FileStatus::L1Completed),
            Layer::L3 => Some(FileStatus::L2Completed),
            Layer::Consistency => None,
        }
    }

    /// Status while this layer's runner holds the file
    pub fn processing_status(&self) -> Option<FileStatus> {
        match self {
            Layer::L1 => Some(FileStatus::L1Processing),
            Layer::L2 => Some(FileStatus::L2Processing),
            Layer::L3 => Some(FileStatus::L3Processing),
            Layer::Consistency => None,
        }
    }

    /// Status after this layer's runner finishes
    pub fn completed_status(&self) -> Option<FileStatus> {
        match self {
            Layer::L1 => Some(FileStatus::L1Completed),
            Layer::L2 => Some(FileStatus::L2Completed),
            Layer::L3 => Some(FileStatus::L3Completed),
            Layer::Consistency => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "critical" => Severity::Critical,
            "major" => Severity::Major,
            "minor" => Severity::Minor,
            _ => return None,
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review lifecycle status of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Pending,
    Accepted,
    ReAccepted,
    Rejected,
    Flagged,
    Noted,
    SourceIssue,
    Manual,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Pending => "pending",
            FindingStatus::Accepted => "accepted",
            FindingStatus::ReAccepted => "re_accepted",
            FindingStatus::Rejected => "rejected",
            FindingStatus::Flagged => "flagged",
            FindingStatus::Noted => "noted",
            FindingStatus::SourceIssue => "source_issue",
            FindingStatus::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => FindingStatus::Pending,
            "accepted" => FindingStatus::Accepted,
            "re_accepted" => FindingStatus::ReAccepted,
            "rejected" => FindingStatus::Rejected,
            "flagged" => FindingStatus::Flagged,
            "noted" => FindingStatus::Noted,
            "source_issue" => FindingStatus::SourceIssue,
            "manual" => FindingStatus::Manual,
            _ => return None,
        })
    }

    /// Whether a finding in this status contributes to the MQM score.
    ///
    /// Only pending, accepted and re-accepted findings count toward the
    /// penalty sum and the per-severity counts.
    pub fn contributes_to_score(&self) -> bool {
        matches!(
            self,
            FindingStatus::Pending | FindingStatus::Accepted | FindingStatus::ReAccepted
        )
    }
}

/// A single detected quality issue.
///
/// Findings for a given (file, layer) are a fully-replaceable set: a layer
/// rerun deletes and reinserts them, never patches in place. Cross-file
/// consistency findings have no owning file or segment and instead carry
/// the set of contributing file ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub file_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    pub layer: Layer,
    pub severity: Severity,
    pub category: String,
    pub status: FindingStatus,
    /// Number of segments the finding spans. Scoring counts the finding
    /// exactly once regardless of this value.
    pub segment_count: i64,
    pub description: String,
    pub suggested_fix: Option<String>,
    /// Model confidence in [0, 100]; absent for rule findings
    pub confidence: Option<f64>,
    /// Contributing files for cross-file consistency findings
    pub source_file_ids: Option<Vec<Uuid>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_transitions() {
        assert_eq!(Layer::L1.expected_predecessor(), Some(FileStatus::Parsed));
        assert_eq!(Layer::L2.expected_predecessor(), Some(FileStatus::L1Completed));
        assert_eq!(Layer::L3.expected_predecessor(), Some(FileStatus::L2Completed));
        assert_eq!(Layer::L1.completed_status(), Some(FileStatus::L1Completed));
        assert_eq!(Layer::Consistency.expected_predecessor(), None);
    }

    #[test]
    fn contributing_statuses() {
        assert!(FindingStatus::Pending.contributes_to_score());
        assert!(FindingStatus::Accepted.contributes_to_score());
        assert!(FindingStatus::ReAccepted.contributes_to_score());
        assert!(!FindingStatus::Rejected.contributes_to_score());
        assert!(!FindingStatus::Flagged.contributes_to_score());
        assert!(!FindingStatus::Noted.contributes_to_score());
        assert!(!FindingStatus::SourceIssue.contributes_to_score());
        assert!(!FindingStatus::Manual.contributes_to_score());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            FindingStatus::Pending,
            FindingStatus::Accepted,
            FindingStatus::ReAccepted,
            FindingStatus::Rejected,
            FindingStatus::Flagged,
            FindingStatus::Noted,
            FindingStatus::SourceIssue,
            FindingStatus::Manual,
        ] {
            assert_eq!(FindingStatus::parse(status.as_str()), Some(status));
        }
    }
}
