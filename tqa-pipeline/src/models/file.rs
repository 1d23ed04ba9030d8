//! File record and pipeline status state machine

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pipeline status of a bilingual file.
///
/// Status transitions are the only way layer runners claim work: a runner
/// performs a compare-and-swap from the expected predecessor state to its
/// processing state, and anything else fails non-retriably. `Failed` is
/// reachable from every processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    Parsing,
    Parsed,
    L1Processing,
    L1Completed,
    L2Processing,
    L2Completed,
    L3Processing,
    L3Completed,
    Failed,
}

impl FileStatus {
    /// Database/string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Parsing => "parsing",
            FileStatus::Parsed => "parsed",
            FileStatus::L1Processing => "l1_processing",
            FileStatus::L1Completed => "l1_completed",
            FileStatus::L2Processing => "l2_processing",
            FileStatus::L2Completed => "l2_completed",
            FileStatus::L3Processing => "l3_processing",
            FileStatus::L3Completed => "l3_completed",
            FileStatus::Failed => "failed",
        }
    }

    /// Parse a database status string
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "uploaded" => FileStatus::Uploaded,
            "parsing" => FileStatus::Parsing,
            "parsed" => FileStatus::Parsed,
            "l1_processing" => FileStatus::L1Processing,
            "l1_completed" => FileStatus::L1Completed,
            "l2_processing" => FileStatus::L2Processing,
            "l2_completed" => FileStatus::L2Completed,
            "l3_processing" => FileStatus::L3Processing,
            "l3_completed" => FileStatus::L3Completed,
            "failed" => FileStatus::Failed,
            _ => return None,
        })
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bilingual file flowing through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaFile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub status: FileStatus,
    pub source_language: String,
    pub target_language: String,
}
