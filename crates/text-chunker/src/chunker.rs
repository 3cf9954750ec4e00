use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::tokenizer::Tokenizer;
use crate::types::TextChunk;
use std::borrow::Cow;
use std::sync::Arc;

/// Parts longer than `chunk_size * LENGTH_TO_TOKEN_RATIO` characters are split again without
/// being encoded first.
const LENGTH_TO_TOKEN_RATIO: usize = 6;

/// Recursive, separator-driven splitter producing token-bounded chunks
pub struct TextChunker {
    config: ChunkerConfig,
    separators: Vec<String>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TextChunker {
    /// Create a new chunker, validating the size/overlap bounds
    pub fn new(config: ChunkerConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        let separators = config
            .effective_separators()
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            config,
            separators,
            tokenizer,
        })
    }

    /// Split `text` into chunks of at most `chunk_size` tokens
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let mut leaves = Vec::new();
        self.recursive_split(text, &self.separators, 0, &mut leaves);

        let mut chunks = self.merge_chunks(leaves);
        if self.config.chunk_overlap > 0 {
            self.apply_overlap(&mut chunks);
        }

        log::debug!(
            "Split {} chars into {} chunks (chunk_size={}, overlap={})",
            text.len(),
            chunks.len(),
            self.config.chunk_size,
            self.config.chunk_overlap
        );
        chunks
    }

    fn recursive_split(
        &self,
        text: &str,
        separators: &[String],
        start_pos: usize,
        out: &mut Vec<TextChunk>,
    ) {
        if text.is_empty() {
            return;
        }

        let (separator, parts, next_separators): (&str, Vec<&str>, &[String]) =
            match separators.split_first() {
                Some((separator, rest)) => {
                    (separator.as_str(), text.split(separator.as_str()).collect(), rest)
                }
                None => {
                    let char_len = text.chars().count();
                    if char_len <= 1 {
                        // Nothing left to bisect.
                        if contains_alphanumeric(text) {
                            let end_pos = start_pos + char_len.saturating_sub(1);
                            let tokens = self.tokenizer.encode(text);
                            out.push(TextChunk::new(text.to_string(), tokens, start_pos, end_pos));
                        }
                        return;
                    }
                    let mid = text
                        .char_indices()
                        .nth(char_len / 2)
                        .map_or(text.len(), |(idx, _)| idx);
                    ("", vec![&text[..mid], &text[mid..]], &[])
                }
            };

        let separator_len = separator.chars().count();
        let last_index = parts.len().saturating_sub(1);
        let mut pos = start_pos;

        for (i, part) in parts.into_iter().enumerate() {
            let is_last = i == last_index;
            let span = part.chars().count() + if is_last { 0 } else { separator_len };
            let part_start = pos;
            pos += span;

            let piece: Cow<'_, str> = if self.config.keep_separators && !is_last {
                Cow::Owned(format!("{part}{separator}"))
            } else {
                Cow::Borrowed(part)
            };
            if span == 0 || !contains_alphanumeric(&piece) {
                continue;
            }
            let end_pos = part_start + span - 1;

            let piece_chars = piece.chars().count();
            if piece_chars / LENGTH_TO_TOKEN_RATIO > self.config.chunk_size {
                self.recursive_split(&piece, next_separators, part_start, out);
                continue;
            }

            let tokens = self.tokenizer.encode(&piece);
            if tokens.len() > self.config.chunk_size {
                self.recursive_split(&piece, next_separators, part_start, out);
            } else {
                out.push(TextChunk::new(piece.into_owned(), tokens, part_start, end_pos));
            }
        }
    }

    /// Greedily combine consecutive leaves while the token total stays within `chunk_size`.
    fn merge_chunks(&self, leaves: Vec<TextChunk>) -> Vec<TextChunk> {
        let joiner = if self.config.keep_separators { "" } else { " " };
        let mut out = Vec::with_capacity(leaves.len());
        let mut current: Option<TextChunk> = None;

        for chunk in leaves {
            let fits = current.as_ref().is_some_and(|cur| {
                cur.tokens.len() + chunk.tokens.len() <= self.config.chunk_size
            });

            if fits {
                if let Some(cur) = current.as_mut() {
                    cur.text.push_str(joiner);
                    cur.text.push_str(&chunk.text);
                    cur.end_pos = chunk.end_pos;
                    cur.tokens.extend(chunk.tokens);
                }
            } else if let Some(done) = current.replace(chunk) {
                out.push(done);
            }
        }

        if let Some(done) = current {
            out.push(done);
        }
        out
    }

    fn apply_overlap(&self, chunks: &mut [TextChunk]) {
        let overlap = self.config.chunk_overlap;

        for idx in 0..chunks.len() {
            let start_overlap = match idx.checked_sub(1) {
                Some(prev) => {
                    let tokens = &chunks[prev].tokens;
                    tokens[tokens.len().saturating_sub(overlap)..].to_vec()
                }
                None => Vec::new(),
            };
            let end_overlap = chunks
                .get(idx + 1)
                .map(|next| next.tokens[..overlap.min(next.tokens.len())].to_vec())
                .unwrap_or_default();

            chunks[idx].start_overlap = start_overlap;
            chunks[idx].end_overlap = end_overlap;
        }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Separators in effect, highest priority first
    #[must_use]
    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn stats(chunks: &[TextChunk]) -> ChunkingStats {
        let total_tokens: usize = chunks.iter().map(TextChunk::token_count).sum();
        ChunkingStats {
            total_chunks: chunks.len(),
            total_chars: chunks.iter().map(TextChunk::span_len).sum(),
            total_tokens,
            avg_tokens_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_tokens / chunks.len()
            },
            min_tokens: chunks
                .iter()
                .map(TextChunk::token_count)
                .min()
                .unwrap_or(0),
            max_tokens: chunks
                .iter()
                .map(TextChunk::token_count)
                .max()
                .unwrap_or(0),
        }
    }
}

fn contains_alphanumeric(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

/// Statistics about chunking results
#[derive(Debug, Clone)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Chars: {} | Tokens: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.total_chars,
            self.total_tokens,
            self.avg_tokens_per_chunk,
            self.min_tokens,
            self.max_tokens
        )
    }
}
