//! Chunking of ordered segments for language-model calls
//!
//! Pure, side-effect free grouping so a replayed layer run always sees
//! the same chunk boundaries.

use crate::models::Segment;

/// Default combined source+target character budget per chunk
pub const DEFAULT_CHUNK_CHAR_BUDGET: usize = 30_000;

/// A budget-bounded group of segments sent together in one AI request.
///
/// Ephemeral: never persisted.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based chunk index
    pub index: usize,
    /// Combined source+target character count of the chunk
    pub char_count: usize,
    pub segments: Vec<Segment>,
}

/// Split ordered segments into character-budget-bounded chunks.
///
/// Greedily accumulates segments; when adding the next segment would
/// exceed the budget and the current chunk is non-empty, the chunk is
/// closed. A single segment longer than the budget occupies its own
/// chunk; segments are never split. Empty input yields no chunks.
pub fn chunk_segments(segments: &[Segment], char_budget: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut current_chars = 0usize;

    for segment in segments {
        let len = segment.char_len();
        if !current.is_empty() && current_chars + len > char_budget {
            chunks.push(Chunk {
                index: chunks.len(),
                char_count: current_chars,
                segments: std::mem::take(&mut current),
            });
            current_chars = 0;
        }
        current_chars += len;
        current.push(segment.clone());
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            char_count: current_chars,
            segments: current,
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

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

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_segments(&[], 100).is_empty());
    }

    #[test]
    fn segments_accumulate_until_budget() {
        // 10 chars each, budget 25: [s0, s1], [s2]
        let segments = vec![
            segment("aaaaa", "bbbbb"),
            segment("ccccc", "ddddd"),
            segment("eeeee", "fffff"),
        ];
        let chunks = chunk_segments(&segments, 25);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].segments.len(), 2);
        assert_eq!(chunks[0].char_count, 20);
        assert_eq!(chunks[1].segments.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn oversized_segment_gets_its_own_chunk() {
        let segments = vec![
            segment("aa", "bb"),
            segment(&"x".repeat(200), &"y".repeat(200)),
            segment("cc", "dd"),
        ];
        let chunks = chunk_segments(&segments, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].segments.len(), 1);
        assert_eq!(chunks[1].char_count, 400);
    }

    #[test]
    fn oversized_first_segment_is_not_preceded_by_empty_chunk() {
        let segments = vec![segment(&"x".repeat(500), "")];
        let chunks = chunk_segments(&segments, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].segments.len(), 1);
    }

    #[test]
    fn chunk_char_sums_cover_each_segment_once() {
        let segments: Vec<Segment> = (0..10)
            .map(|i| segment(&"s".repeat(i + 1), &"t".repeat(i + 1)))
            .collect();
        let total: usize = segments.iter().map(|s| s.char_len()).sum();

        let chunks = chunk_segments(&segments, 12);
        let chunked_total: usize = chunks.iter().map(|c| c.char_count).sum();
        let chunked_count: usize = chunks.iter().map(|c| c.segments.len()).sum();

        assert_eq!(chunked_total, total);
        assert_eq!(chunked_count, segments.len());
    }
}
