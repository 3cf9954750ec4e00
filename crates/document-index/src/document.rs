use crate::error::{DocumentIndexError, Result};
use crate::sections::{ScoredSpan, Section, SectionBuilder};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vectra_text_chunker::Tokenizer;
use vectra_vector_store::{Item, Metadata};

pub(crate) const DOCUMENT_ID_KEY: &str = "documentId";
pub(crate) const START_POS_KEY: &str = "startPos";
pub(crate) const END_POS_KEY: &str = "endPos";

pub(crate) fn text_path(folder: &Path, id: &str) -> PathBuf {
    folder.join(format!("{id}.txt"))
}

pub(crate) fn metadata_path(folder: &Path, id: &str) -> PathBuf {
    folder.join(format!("{id}.json"))
}

/// Chars `start..=end` of `text`, clamped.
pub(crate) fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    let from = indices.nth(start).unwrap_or(text.len());
    let to = if end >= start {
        indices.nth(end - start).unwrap_or(text.len())
    } else {
        from
    };
    &text[from..to]
}

/// A stored document: its id, uri and side files on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    folder: PathBuf,
    id: String,
    uri: String,
}

impl DocumentHandle {
    pub(crate) fn new(folder: &Path, id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            folder: folder.to_path_buf(),
            id: id.into(),
            uri: uri.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub async fn load_text(&self) -> Result<String> {
        tokio::fs::read_to_string(text_path(&self.folder, &self.id))
            .await
            .map_err(|source| DocumentIndexError::TextReadFailed {
                uri: self.uri.clone(),
                source,
            })
    }

    pub async fn has_metadata(&self) -> bool {
        tokio::fs::try_exists(metadata_path(&self.folder, &self.id))
            .await
            .unwrap_or(false)
    }

    /// Document metadata, `None` if it was stored without any.
    pub async fn load_metadata(&self) -> Result<Option<Metadata>> {
        let bytes = match tokio::fs::read(metadata_path(&self.folder, &self.id)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DocumentIndexError::MetadataReadFailed {
                    uri: self.uri.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| DocumentIndexError::MetadataParseFailed {
                uri: self.uri.clone(),
                source,
            })
    }
}

/// A stored chunk retrieved for a document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub item: Item,
    pub score: f32,
    /// Found by keyword ranking rather than vector similarity
    pub is_bm25: bool,
}

impl DocumentChunk {
    pub fn document_id(&self) -> Option<&str> {
        self.item.metadata.get(DOCUMENT_ID_KEY)?.as_str()
    }

    pub fn start_pos(&self) -> Option<usize> {
        self.item.metadata.get(START_POS_KEY)?.as_usize()
    }

    pub fn end_pos(&self) -> Option<usize> {
        self.item.metadata.get(END_POS_KEY)?.as_usize()
    }

    pub(crate) fn span(&self) -> Option<ScoredSpan> {
        Some(ScoredSpan {
            start_pos: self.start_pos()?,
            end_pos: self.end_pos()?,
            score: self.score,
            is_bm25: self.is_bm25,
        })
    }
}

/// One document returned by a query or listing, with the chunks that matched.
#[derive(Clone)]
pub struct DocumentResult {
    document: DocumentHandle,
    chunks: Vec<DocumentChunk>,
    score: f32,
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for DocumentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentResult")
            .field("document", &self.document)
            .field("chunks", &self.chunks.len())
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

impl DocumentResult {
    pub(crate) fn new(
        document: DocumentHandle,
        chunks: Vec<DocumentChunk>,
        score: f32,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        Self {
            document,
            chunks,
            score,
            tokenizer,
        }
    }

    pub fn document_id(&self) -> &str {
        self.document.id()
    }

    pub fn uri(&self) -> &str {
        self.document.uri()
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub const fn score(&self) -> f32 {
        self.score
    }

    pub const fn document(&self) -> &DocumentHandle {
        &self.document
    }

    pub async fn load_text(&self) -> Result<String> {
        self.document.load_text().await
    }

    pub async fn load_metadata(&self) -> Result<Option<Metadata>> {
        self.document.load_metadata().await
    }

    pub async fn has_metadata(&self) -> bool {
        self.document.has_metadata().await
    }

    /// Token length of the full document text.
    pub async fn token_length(&self) -> Result<usize> {
        Ok(self.tokenizer.count(&self.load_text().await?))
    }

    fn spans(&self) -> Vec<ScoredSpan> {
        self.chunks.iter().filter_map(DocumentChunk::span).collect()
    }

    pub async fn render_all_sections(&self, max_tokens: usize) -> Result<Vec<Section>> {
        let text = self.load_text().await?;
        let builder = SectionBuilder::new(&text, self.tokenizer.as_ref());
        Ok(builder.render_all_sections(&self.spans(), max_tokens))
    }

    pub async fn render_sections(
        &self,
        max_tokens: usize,
        max_sections: usize,
        overlapping_chunks: bool,
    ) -> Result<Vec<Section>> {
        let text = self.load_text().await?;
        let builder = SectionBuilder::new(&text, self.tokenizer.as_ref());
        Ok(builder.render_sections(&self.spans(), max_tokens, max_sections, overlapping_chunks))
    }
}
