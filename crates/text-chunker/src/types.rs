use serde::{Deserialize, Serialize};

/// A contiguous span of a document with its token encoding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk text (including the re-appended separator when separators are kept)
    pub text: String,

    /// Tokens of the leaves merged into this chunk. When separators are dropped, the `" "`
    /// joiners in `text` are not counted, so this can be shorter than `encode(text)`.
    pub tokens: Vec<u32>,

    /// Start position (character offset, 0-indexed)
    pub start_pos: usize,

    /// End position (character offset, inclusive)
    pub end_pos: usize,

    /// Trailing tokens of the previous chunk
    #[serde(default)]
    pub start_overlap: Vec<u32>,

    /// Leading tokens of the next chunk
    #[serde(default)]
    pub end_overlap: Vec<u32>,
}

impl TextChunk {
    /// Create a chunk without overlap context
    #[must_use]
    pub const fn new(text: String, tokens: Vec<u32>, start_pos: usize, end_pos: usize) -> Self {
        Self {
            text,
            tokens,
            start_pos,
            end_pos,
            start_overlap: Vec::new(),
            end_overlap: Vec::new(),
        }
    }

    /// Number of characters of the source document this chunk covers
    #[must_use]
    pub const fn span_len(&self) -> usize {
        self.end_pos.saturating_sub(self.start_pos) + 1
    }

    /// Get token count
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Check if chunk covers a specific character position
    #[must_use]
    pub const fn contains_pos(&self, pos: usize) -> bool {
        pos >= self.start_pos && pos <= self.end_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_accounts_for_inclusive_end() {
        let chunk = TextChunk::new("hello".to_string(), vec![1, 2], 10, 14);
        assert_eq!(chunk.span_len(), 5);
        assert!(chunk.contains_pos(10));
        assert!(chunk.contains_pos(14));
        assert!(!chunk.contains_pos(15));
        assert_eq!(chunk.token_count(), 2);
    }
}
