//! Splitting documents into retrievable chunks.
//!
//! Offsets are character positions into the source text. Every chunk's
//! metadata is the caller's metadata plus `chunk_index`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RagError;
use crate::models::Metadata;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    FixedSize,
    Semantic,
    Paragraph,
    SlidingWindow,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixedSize => "fixed_size",
            Self::Semantic => "semantic",
            Self::Paragraph => "paragraph",
            Self::SlidingWindow => "sliding_window",
        }
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub start_index: usize,
    pub end_index: usize,
}

impl Chunk {
    pub fn index(&self) -> usize {
        self.metadata
            .get("chunk_index")
            .and_then(Value::as_u64)
            .unwrap_or_default() as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::InvalidChunking("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidChunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str, strategy: ChunkingStrategy, metadata: &Metadata) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = ChunkSink {
            chunks: Vec::new(),
            metadata,
        };
        match strategy {
            ChunkingStrategy::FixedSize => self.fixed_size(&chars, &mut out),
            ChunkingStrategy::Semantic => {
                let spans = sentence_spans(&chars);
                self.pack(&chars, &spans, " ", &mut out);
            }
            ChunkingStrategy::Paragraph => {
                let spans = paragraph_spans(&chars);
                self.pack(&chars, &spans, "\n\n", &mut out);
            }
            ChunkingStrategy::SlidingWindow => self.sliding_window(&chars, &mut out),
        }
        out.chunks
    }

    /// Windows of `chunk_size`, pulled back to the last space when one exists.
    fn fixed_size(&self, chars: &[char], out: &mut ChunkSink<'_>) {
        let len = chars.len();
        let mut start = 0;
        while start < len {
            let mut end = (start + self.chunk_size).min(len);
            if end < len {
                if let Some(pos) = chars[start..end].iter().rposition(|c| *c == ' ') {
                    if pos > 0 {
                        end = start + pos;
                    }
                }
            }
            out.push(collect(chars, start, end).trim().to_string(), start, end);
            if end >= len {
                break;
            }
            let next = end.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { end };
        }
    }

    fn sliding_window(&self, chars: &[char], out: &mut ChunkSink<'_>) {
        let len = chars.len();
        let step = self.chunk_size - self.chunk_overlap;
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            out.push(collect(chars, start, end).trim().to_string(), start, end);
            if end >= len {
                break;
            }
            start += step;
        }
    }

    /// Greedily join consecutive spans while the chunk stays within `chunk_size`.
    /// A single span longer than the limit becomes its own chunk.
    fn pack(&self, chars: &[char], spans: &[(usize, usize)], separator: &str, out: &mut ChunkSink<'_>) {
        let sep_len = separator.chars().count();
        let mut current: Vec<(usize, usize)> = Vec::new();
        let mut current_len = 0;

        for &(start, end) in spans {
            let span_len = end - start;
            let grown = if current.is_empty() {
                span_len
            } else {
                current_len + sep_len + span_len
            };
            if !current.is_empty() && grown > self.chunk_size {
                flush(chars, &current, separator, out);
                current.clear();
                current_len = span_len;
            } else {
                current_len = grown;
            }
            current.push((start, end));
        }
        if !current.is_empty() {
            flush(chars, &current, separator, out);
        }
    }
}

struct ChunkSink<'a> {
    chunks: Vec<Chunk>,
    metadata: &'a Metadata,
}

impl ChunkSink<'_> {
    fn push(&mut self, content: String, start: usize, end: usize) {
        if content.trim().is_empty() {
            return;
        }
        let mut metadata = self.metadata.clone();
        metadata.insert("chunk_index".into(), Value::from(self.chunks.len()));
        self.chunks.push(Chunk {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            metadata,
            start_index: start,
            end_index: end,
        });
    }
}

fn flush(chars: &[char], spans: &[(usize, usize)], separator: &str, out: &mut ChunkSink<'_>) {
    let content = spans
        .iter()
        .map(|&(s, e)| collect(chars, s, e))
        .collect::<Vec<_>>()
        .join(separator);
    let start = spans.first().map(|s| s.0).unwrap_or_default();
    let end = spans.last().map(|s| s.1).unwrap_or_default();
    out.push(content, start, end);
}

fn collect(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect()
}

/// Shrink `[start, end)` to exclude surrounding whitespace. `None` if nothing is left.
fn trim_span(chars: &[char], mut start: usize, mut end: usize) -> Option<(usize, usize)> {
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    (start < end).then_some((start, end))
}

/// Sentences end after `.`, `!` or `?` followed by whitespace.
fn sentence_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for i in 0..chars.len() {
        let boundary = matches!(chars[i], '.' | '!' | '?')
            && chars.get(i + 1).is_some_and(|c| c.is_whitespace());
        if boundary {
            spans.extend(trim_span(chars, start, i + 1));
            start = i + 1;
        }
    }
    spans.extend(trim_span(chars, start, chars.len()));
    spans
}

/// Paragraphs are separated by a blank line.
fn paragraph_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < len {
        if chars[i] == '\n' {
            let mut j = i + 1;
            let mut newlines = 1;
            while j < len && chars[j].is_whitespace() {
                if chars[j] == '\n' {
                    newlines += 1;
                }
                j += 1;
            }
            if newlines >= 2 {
                spans.extend(trim_span(chars, start, i));
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    spans.extend(trim_span(chars, start, len));
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_meta() -> Metadata {
        Metadata::new()
    }

    fn non_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    const TEXT: &str = "The moon waxes. It wanes again! Does it matter? Many planners think so. \
                        They set goals at the new moon and review them at the full moon.";

    #[test]
    fn test_rejects_invalid_configuration() {
        assert!(DocumentChunker::new(0, 0).is_err());
        assert!(DocumentChunker::new(10, 10).is_err());
        assert!(DocumentChunker::new(10, 9).is_ok());
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = DocumentChunker::new(50, 5).unwrap();
        for strategy in [
            ChunkingStrategy::FixedSize,
            ChunkingStrategy::Semantic,
            ChunkingStrategy::Paragraph,
            ChunkingStrategy::SlidingWindow,
        ] {
            assert!(chunker.chunk("", strategy, &no_meta()).is_empty());
            assert!(chunker.chunk("   \n\n  ", strategy, &no_meta()).is_empty());
        }
    }

    #[test]
    fn test_chunk_index_and_metadata() {
        let chunker = DocumentChunker::new(40, 0).unwrap();
        let mut meta = Metadata::new();
        meta.insert("source".into(), Value::from("moon.md"));
        let chunks = chunker.chunk(TEXT, ChunkingStrategy::Semantic, &meta);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index(), i);
            assert_eq!(chunk.metadata["source"], "moon.md");
        }
    }

    #[test]
    fn test_semantic_keeps_sentences_whole() {
        let chunker = DocumentChunker::new(40, 0).unwrap();
        let chunks = chunker.chunk(TEXT, ChunkingStrategy::Semantic, &no_meta());
        assert_eq!(chunks[0].content, "The moon waxes. It wanes again!");
        for chunk in &chunks {
            let last = chunk.content.chars().last().unwrap();
            assert!(matches!(last, '.' | '!' | '?'));
        }
        let joined: String = chunks.iter().map(|c| non_ws(&c.content)).collect();
        assert_eq!(joined, non_ws(TEXT));
    }

    #[test]
    fn test_oversized_sentence_becomes_own_chunk() {
        let chunker = DocumentChunker::new(10, 0).unwrap();
        let chunks = chunker.chunk("Short. This sentence is far too long. End.", ChunkingStrategy::Semantic, &no_meta());
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Short.", "This sentence is far too long.", "End."]);
    }

    #[test]
    fn test_paragraph_chunks() {
        let text = "First paragraph here.\n\nSecond one.\n  \nThird paragraph is longer than the rest.";
        let chunker = DocumentChunker::new(40, 0).unwrap();
        let chunks = chunker.chunk(text, ChunkingStrategy::Paragraph, &no_meta());
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "First paragraph here.\n\nSecond one.",
                "Third paragraph is longer than the rest."
            ]
        );
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[1].end_index, text.chars().count());
    }

    #[test]
    fn test_fixed_size_breaks_on_spaces_and_covers_text() {
        let chunker = DocumentChunker::new(30, 0).unwrap();
        let chunks = chunker.chunk(TEXT, ChunkingStrategy::FixedSize, &no_meta());
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 30);
        }
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_index, pair[1].start_index);
        }
        let joined: String = chunks.iter().map(|c| non_ws(&c.content)).collect();
        assert_eq!(joined, non_ws(TEXT));
    }

    #[test]
    fn test_fixed_size_overlap_steps_back() {
        let chunker = DocumentChunker::new(30, 10).unwrap();
        let chunks = chunker.chunk(TEXT, ChunkingStrategy::FixedSize, &no_meta());
        for pair in chunks.windows(2) {
            assert!(pair[1].start_index < pair[0].end_index);
            assert!(pair[1].start_index > pair[0].start_index);
        }
        assert_eq!(chunks.last().unwrap().end_index, TEXT.chars().count());
    }

    #[test]
    fn test_sliding_window_without_overlap_is_contiguous() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunker = DocumentChunker::new(10, 0).unwrap();
        let chunks = chunker.chunk(text, ChunkingStrategy::SlidingWindow, &no_meta());
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
        assert_eq!(contents.concat(), text);
    }

    #[test]
    fn test_sliding_window_with_overlap() {
        let chunker = DocumentChunker::new(10, 4).unwrap();
        let chunks = chunker.chunk("abcdefghijklmnop", ChunkingStrategy::SlidingWindow, &no_meta());
        let starts: Vec<_> = chunks.iter().map(|c| c.start_index).collect();
        assert_eq!(starts, vec![0, 6]);
        assert_eq!(chunks[1].content, "ghijklmnop");
    }

    #[test]
    fn test_sliding_window_trims_padding() {
        let chunker = DocumentChunker::new(5, 0).unwrap();
        let chunks = chunker.chunk("ab   cd   ", ChunkingStrategy::SlidingWindow, &no_meta());
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["ab", "cd"]);
        assert_eq!((chunks[1].start_index, chunks[1].end_index), (5, 10));
    }

    #[test]
    fn test_offsets_count_characters() {
        let text = "Lua cheia é ótima. Lua nova também.";
        let chunker = DocumentChunker::new(20, 0).unwrap();
        let chunks = chunker.chunk(text, ChunkingStrategy::Semantic, &no_meta());
        let chars: Vec<char> = text.chars().collect();
        for chunk in &chunks {
            let slice: String = chars[chunk.start_index..chunk.end_index].iter().collect();
            assert_eq!(slice, chunk.content);
        }
    }
}
