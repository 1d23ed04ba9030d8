//! Segment model: the immutable unit of bilingual text

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One bilingual segment of a parsed file.
///
/// Segments are immutable per parse and are read-only input to every
/// layer runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub file_id: Uuid,
    /// Zero-based ordinal position within the file
    pub position: i64,
    pub source_text: String,
    pub target_text: String,
    pub source_language: String,
    pub target_language: String,
    pub word_count: i64,
    /// Final sign-off confirmation state; signed-off segments are exempt
    /// from the cross-file consistency pass
    pub signed_off: bool,
}

impl Segment {
    /// Combined character length of source and target text.
    ///
    /// Used by the chunker against the per-chunk character budget.
    pub fn char_len(&self) -> usize {
        self.source_text.chars().count() + self.target_text.chars().count()
    }
}
