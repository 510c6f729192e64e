//! Token-budgeted chunking with overlap

use super::TranscriptChunk;
use crate::transcript::Segment;
use unicode_segmentation::UnicodeSegmentation;

/// Rough characters-per-token ratio used for budgeting
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens for a piece of text
pub fn estimate_tokens(text: &str) -> usize {
    text.graphemes(true).count() / CHARS_PER_TOKEN
}

/// Build chunks of roughly `max_tokens`, each starting with the trailing
/// `overlap_tokens` of the previous chunk.
///
/// A chunk closes when adding the next segment would reach the budget; its
/// end time is the start of that next segment. The overlapped text is
/// repeated, so segments may appear in two consecutive chunks.
pub fn chunk_with_overlap(
    segments: &[Segment],
    max_tokens: usize,
    overlap_tokens: usize,
) -> Vec<TranscriptChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_start = 0.0;
    let mut segment_count = 0;

    for segment in segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }

        let candidate = if current.is_empty() {
            text.to_string()
        } else {
            format!("{} {}", current, text)
        };

        if !current.is_empty() && estimate_tokens(&candidate) >= max_tokens {
            chunks.push(TranscriptChunk::new(
                chunks.len(),
                current.clone(),
                current_start,
                segment.start,
                segment_count,
            ));

            let carried = overlap_tail(&current, overlap_tokens * CHARS_PER_TOKEN);
            current = if carried.is_empty() {
                text.to_string()
            } else {
                format!("{} {}", carried, text)
            };
            current_start = segment.start;
            segment_count = 1;
        } else {
            if current.is_empty() {
                current_start = segment.start;
            }
            current = candidate;
            segment_count += 1;
        }
    }

    if !current.is_empty() {
        let end = segments
            .iter()
            .rev()
            .find(|s| !s.text.trim().is_empty())
            .map(Segment::end)
            .unwrap_or(current_start);
        chunks.push(TranscriptChunk::new(
            chunks.len(),
            current,
            current_start,
            end,
            segment_count,
        ));
    }

    chunks
}

/// The last `max_chars` graphemes of `text`, trimmed forward to a word start
fn overlap_tail(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }

    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_chars {
        return text.to_string();
    }

    let tail: String = graphemes[graphemes.len() - max_chars..].concat();
    let trimmed = match tail.find(' ') {
        Some(idx) if idx > 0 => &tail[idx + 1..],
        _ => tail.as_str(),
    };
    trimmed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, start: f64) -> Vec<Segment> {
        (0..n)
            .map(|i| Segment::new(format!("word{:03}", i), start + i as f64, 1.0))
            .collect()
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_overlap_tail_cuts_at_word() {
        assert_eq!(overlap_tail("alpha beta gamma", 8), "gamma");
        assert_eq!(overlap_tail("short", 10), "short");
        assert_eq!(overlap_tail("anything", 0), "");
    }

    #[test]
    fn test_chunks_carry_overlap() {
        // Each segment is 7 chars + separator; budget of 10 tokens = 40 chars
        let segments = words(20, 0.0);
        let chunks = chunk_with_overlap(&segments, 10, 2);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_last_word = pair[0].text.split(' ').last().unwrap();
            assert!(pair[1].text.contains(prev_last_word));
            assert_eq!(pair[0].end_seconds, pair[1].start_seconds);
        }
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.start_seconds <= chunk.end_seconds);
        }
        assert_eq!(chunks.last().unwrap().end_seconds, 20.0);
    }

    #[test]
    fn test_single_segment_single_chunk() {
        let segments = vec![Segment::new("only", 3.0, 2.0)];
        let chunks = chunk_with_overlap(&segments, 500, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_seconds, 3.0);
        assert_eq!(chunks[0].end_seconds, 5.0);
    }
}
