//! Size-bounded fallback splitter
//!
//! Splits text into character windows of at most `chunk_size` characters,
//! repeating the trailing `chunk_overlap` characters at the head of the next
//! window. Used directly for languages without a grammar and by the
//! syntax-aware splitter for oversized leaf nodes.

use crate::domain::types::{CodeChunk, Language};

/// Sliding-window splitter with bounded chunk size and overlap
///
/// Invariants:
/// - every produced chunk holds at most `chunk_size` characters;
/// - consecutive chunks share at most `chunk_overlap` characters;
/// - concatenating each chunk's non-overlapping prefix reproduces the input.
#[derive(Debug, Clone)]
pub struct SizeSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SizeSplitter {
    /// Create a splitter; the overlap is clamped below the chunk size so the
    /// window always advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Target chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters repeated between consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `code` into chunks tagged with `language` and `file_path`.
    pub fn split(&self, code: &str, language: Language, file_path: &str) -> Vec<CodeChunk> {
        self.split_text(code)
            .into_iter()
            .map(|piece| CodeChunk {
                content: piece.content,
                start_line: piece.start_line,
                end_line: piece.end_line,
                language,
                file_path: file_path.to_string(),
            })
            .collect()
    }

    /// Split raw text into windows with 1-based inclusive line bounds
    /// relative to the start of `text`.
    pub(crate) fn split_text(&self, text: &str) -> Vec<TextPiece> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        // Cumulative newline count up to (excluding) each char index.
        let mut newlines_before = Vec::with_capacity(chars.len() + 1);
        let mut count = 0u32;
        for &c in &chars {
            newlines_before.push(count);
            if c == '\n' {
                count += 1;
            }
        }
        newlines_before.push(count);

        let step = self.chunk_size - self.chunk_overlap;
        let mut pieces = Vec::new();
        let mut start = 0usize;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            pieces.push(TextPiece {
                content: chars[start..end].iter().collect(),
                start_line: newlines_before[start] + 1,
                end_line: newlines_before[end - 1] + 1,
            });
            if end == chars.len() {
                break;
            }
            start += step;
        }
        pieces
    }
}

/// A window of text with line bounds relative to the split input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextPiece {
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
}
