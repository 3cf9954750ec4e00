use crate::catalog::{Catalog, CATALOG_FILE_NAME};
use crate::config::DocumentIndexConfig;
use crate::document::{
    metadata_path, slice_chars, text_path, DocumentChunk, DocumentHandle, DocumentResult,
    DOCUMENT_ID_KEY, END_POS_KEY, START_POS_KEY,
};
use crate::embeddings::{EmbeddingsModel, EmbeddingsStatus};
use crate::error::{DocumentIndexError, Result};
use crate::ranker::KeywordRanker;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use vectra_text_chunker::{CharTokenizer, DocType, TextChunk, TextChunker, Tokenizer};
use vectra_vector_store::{
    rank_descending, read_json, remove_file_if_exists, write_json_atomic, CreateIndexOptions,
    Item, Metadata, MetadataConfig, MetadataFilter, MetadataValue, NewItem, StoreOptions,
    VectorStore, VectorStoreError,
};

/// Options for [`DocumentIndex::query_documents`]; unset limits fall back to the config.
#[derive(Debug, Clone, Default)]
pub struct DocumentQueryOptions {
    pub max_documents: Option<usize>,
    pub max_chunks: Option<usize>,
    pub filter: Option<MetadataFilter>,
    /// Add keyword-ranked chunks (requires a keyword ranker)
    pub is_bm25: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub version: u32,
    pub documents: usize,
    pub chunks: usize,
    pub metadata_config: MetadataConfig,
}

pub struct DocumentIndexBuilder {
    folder: PathBuf,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    embeddings: Option<Arc<dyn EmbeddingsModel>>,
    keyword_ranker: Option<Arc<dyn KeywordRanker>>,
    config: DocumentIndexConfig,
}

impl DocumentIndexBuilder {
    #[must_use]
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    #[must_use]
    pub fn embeddings(mut self, embeddings: Arc<dyn EmbeddingsModel>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    #[must_use]
    pub fn keyword_ranker(mut self, ranker: Arc<dyn KeywordRanker>) -> Self {
        self.keyword_ranker = Some(ranker);
        self
    }

    #[must_use]
    pub fn config(mut self, config: DocumentIndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<DocumentIndex> {
        self.config.validate()?;
        let store = VectorStore::with_options(
            &self.folder,
            StoreOptions {
                index_name: self.config.index_name.clone(),
            },
        );
        Ok(DocumentIndex {
            folder: self.folder,
            store,
            tokenizer: self.tokenizer.unwrap_or_else(|| Arc::new(CharTokenizer)),
            embeddings: self.embeddings,
            keyword_ranker: self.keyword_ranker,
            config: self.config,
            catalog: None,
            staged_catalog: None,
        })
    }
}

/// Documents stored as embedded chunks in a [`VectorStore`], plus a uri catalog and the
/// original text and metadata of every document.
///
/// ```text
/// <folder>/
///     ├──> index.json        chunk vectors (documentId, startPos, endPos, ...)
///     ├──> catalog.json      uri <-> document id
///     ├──> <doc-id>.txt      document text
///     └──> <doc-id>.json     document metadata (optional)
/// ```
pub struct DocumentIndex {
    folder: PathBuf,
    store: VectorStore,
    tokenizer: Arc<dyn Tokenizer>,
    embeddings: Option<Arc<dyn EmbeddingsModel>>,
    keyword_ranker: Option<Arc<dyn KeywordRanker>>,
    config: DocumentIndexConfig,
    catalog: Option<Catalog>,
    staged_catalog: Option<Catalog>,
}

impl DocumentIndex {
    pub fn builder(folder: impl AsRef<Path>) -> DocumentIndexBuilder {
        DocumentIndexBuilder {
            folder: folder.as_ref().to_path_buf(),
            tokenizer: None,
            embeddings: None,
            keyword_ranker: None,
            config: DocumentIndexConfig::default(),
        }
    }

    pub fn folder_path(&self) -> &Path {
        &self.folder
    }

    pub const fn config(&self) -> &DocumentIndexConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    fn catalog_path(&self) -> PathBuf {
        self.folder.join(CATALOG_FILE_NAME)
    }

    pub async fn is_index_created(&self) -> bool {
        self.store.is_index_created().await
    }

    /// Create the chunk index and an empty catalog.
    ///
    /// If the catalog cannot be written the whole index folder is removed again.
    pub async fn create_index(&mut self, options: CreateIndexOptions) -> Result<()> {
        self.store.create_index(options).await?;
        self.catalog = None;
        self.staged_catalog = None;

        let catalog = Catalog::default();
        let path = self.catalog_path();
        if let Err(source) = write_json_atomic(&path, &catalog).await {
            if let Err(err) = self.store.delete_index().await {
                log::warn!("Failed to clean up partial index at {:?}: {}", self.folder, err);
            }
            return Err(VectorStoreError::IndexCreationFailed { path, source }.into());
        }
        self.catalog = Some(catalog);
        Ok(())
    }

    pub async fn delete_index(&mut self) -> Result<()> {
        self.store.delete_index().await?;
        self.catalog = None;
        self.staged_catalog = None;
        Ok(())
    }

    async fn ensure_catalog(&mut self) -> Result<&Catalog> {
        if self.catalog.is_none() {
            let loaded: Option<Catalog> = read_json(&self.catalog_path()).await?;
            self.catalog = Some(loaded.unwrap_or_default());
        }
        Ok(self.catalog.get_or_insert_with(Catalog::default))
    }

    pub async fn get_document_id(&mut self, uri: &str) -> Result<Option<String>> {
        Ok(self.ensure_catalog().await?.document_id(uri).map(str::to_string))
    }

    pub async fn get_document_uri(&mut self, id: &str) -> Result<Option<String>> {
        Ok(self.ensure_catalog().await?.document_uri(id).map(str::to_string))
    }

    pub async fn get_catalog_stats(&mut self) -> Result<CatalogStats> {
        let stats = self.store.get_stats().await?;
        let catalog = self.ensure_catalog().await?;
        Ok(CatalogStats {
            version: catalog.version,
            documents: catalog.count,
            chunks: stats.items,
            metadata_config: stats.metadata_config,
        })
    }

    async fn handle_for(&mut self, id: &str) -> Result<DocumentHandle> {
        let uri = self
            .get_document_uri(id)
            .await?
            .unwrap_or_else(|| id.to_string());
        Ok(DocumentHandle::new(&self.folder, id, uri))
    }

    pub async fn load_document_text(&mut self, id: &str) -> Result<String> {
        self.handle_for(id).await?.load_text().await
    }

    pub async fn load_document_metadata(&mut self, id: &str) -> Result<Option<Metadata>> {
        self.handle_for(id).await?.load_metadata().await
    }

    // ------------------------------------------------------------------
    // Transactions (store and catalog together)
    // ------------------------------------------------------------------

    pub async fn begin_update(&mut self) -> Result<()> {
        self.store.begin_update().await?;
        match self.ensure_catalog().await.map(Catalog::clone) {
            Ok(catalog) => {
                self.staged_catalog = Some(catalog);
                Ok(())
            }
            Err(err) => {
                self.store.cancel_update().await;
                Err(err)
            }
        }
    }

    pub async fn cancel_update(&mut self) {
        self.store.cancel_update().await;
        self.staged_catalog = None;
    }

    /// Commit the chunk index, then persist the catalog.
    pub async fn end_update(&mut self) -> Result<()> {
        let staged = self.staged_catalog.take();
        self.store.end_update().await?;
        if let Some(catalog) = staged {
            let path = self.catalog_path();
            if let Err(source) = write_json_atomic(&path, &catalog).await {
                // The chunk index is already committed; its new chunks have no catalog entry.
                log::warn!(
                    "Chunk index committed but catalog {:?} was not saved: {}",
                    path,
                    source
                );
                return Err(DocumentIndexError::CatalogPersistenceFailed { path, source });
            }
            self.catalog = Some(catalog);
        }
        Ok(())
    }

    fn staged_catalog(&mut self) -> Result<&mut Catalog> {
        self.staged_catalog
            .as_mut()
            .ok_or(DocumentIndexError::VectorStoreError(
                VectorStoreError::NoUpdateInProgress,
            ))
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Chunk, embed and store `text` under `uri`, replacing any previous version.
    ///
    /// Embedding happens before the update opens, so an embeddings failure leaves the
    /// index untouched. The document type defaults to the one implied by the uri extension.
    pub async fn upsert_document(
        &mut self,
        uri: &str,
        text: &str,
        doc_type: Option<DocType>,
        metadata: Option<Metadata>,
    ) -> Result<DocumentHandle> {
        let model = self
            .embeddings
            .clone()
            .ok_or(DocumentIndexError::EmbeddingsNotConfigured)?;

        let doc_type = doc_type
            .or(self.config.chunking.doc_type)
            .unwrap_or_else(|| DocType::from_path(uri));
        let chunker = TextChunker::new(
            self.config.chunking.clone().with_doc_type(doc_type),
            Arc::clone(&self.tokenizer),
        )
        .map_err(|err| DocumentIndexError::upsert_failed(uri, err.into()))?;
        let chunks = chunker.split(text);
        let vectors = embed_chunks(model.as_ref(), &chunks, uri)
            .await
            .map_err(|err| DocumentIndexError::upsert_failed(uri, err))?;

        let document_id = Uuid::new_v4().to_string();
        let previous_id = self.get_document_id(uri).await?;

        self.begin_update()
            .await
            .map_err(|err| DocumentIndexError::upsert_failed(uri, err))?;
        let staged = self
            .stage_document(
                uri,
                &document_id,
                text,
                &chunks,
                vectors,
                metadata,
                previous_id.as_deref(),
            )
            .await;
        if let Err(err) = staged {
            self.cancel_update().await;
            return Err(DocumentIndexError::upsert_failed(uri, err));
        }
        self.end_update()
            .await
            .map_err(|err| DocumentIndexError::upsert_failed(uri, err))?;

        if let Some(previous) = previous_id {
            self.remove_document_files(&previous).await;
        }
        log::info!(
            "Upserted document {} ({} chunks, id {})",
            uri,
            chunks.len(),
            document_id
        );
        Ok(DocumentHandle::new(&self.folder, document_id, uri))
    }

    #[allow(clippy::too_many_arguments)]
    async fn stage_document(
        &mut self,
        uri: &str,
        document_id: &str,
        text: &str,
        chunks: &[TextChunk],
        vectors: Vec<Vec<f32>>,
        metadata: Option<Metadata>,
        previous_id: Option<&str>,
    ) -> Result<()> {
        if let Some(previous) = previous_id {
            self.stage_chunk_removal(previous).await?;
            self.staged_catalog()?.remove(uri);
        }

        for (chunk, vector) in chunks.iter().zip(vectors) {
            let mut chunk_metadata = metadata.clone().unwrap_or_default();
            chunk_metadata.insert(DOCUMENT_ID_KEY.to_string(), document_id.into());
            chunk_metadata.insert(START_POS_KEY.to_string(), chunk.start_pos.into());
            chunk_metadata.insert(END_POS_KEY.to_string(), chunk.end_pos.into());
            self.store
                .insert_item(NewItem::new(vector).metadata(chunk_metadata))
                .await?;
        }

        if let Some(metadata) = &metadata {
            let bytes = serde_json::to_vec(metadata)?;
            tokio::fs::write(metadata_path(&self.folder, document_id), bytes).await?;
        }
        tokio::fs::write(text_path(&self.folder, document_id), text).await?;

        self.staged_catalog()?.insert(uri, document_id);
        Ok(())
    }

    async fn stage_chunk_removal(&mut self, document_id: &str) -> Result<()> {
        let filter = MetadataFilter::eq(DOCUMENT_ID_KEY, document_id);
        let chunks = self.store.list_items_by_metadata(&filter).await?;
        for chunk in chunks {
            self.store.delete_item(&chunk.id).await?;
        }
        Ok(())
    }

    async fn remove_document_files(&self, document_id: &str) {
        for path in [
            text_path(&self.folder, document_id),
            metadata_path(&self.folder, document_id),
        ] {
            if let Err(err) = remove_file_if_exists(&path).await {
                log::warn!("Failed to remove {:?}: {}", path, err);
            }
        }
    }

    /// Remove a document and its chunks. Unknown uris are a no-op.
    pub async fn delete_document(&mut self, uri: &str) -> Result<()> {
        let Some(document_id) = self.get_document_id(uri).await? else {
            return Ok(());
        };

        self.begin_update()
            .await
            .map_err(|err| DocumentIndexError::delete_failed(uri, err))?;
        let staged = async {
            self.stage_chunk_removal(&document_id).await?;
            self.staged_catalog()?.remove(uri);
            Ok::<(), DocumentIndexError>(())
        }
        .await;
        if let Err(err) = staged {
            self.cancel_update().await;
            return Err(DocumentIndexError::delete_failed(uri, err));
        }
        self.end_update()
            .await
            .map_err(|err| DocumentIndexError::delete_failed(uri, err))?;

        tokio::fs::remove_file(text_path(&self.folder, &document_id))
            .await
            .map_err(|source| DocumentIndexError::TextDeleteFailed {
                uri: uri.to_string(),
                source,
            })?;
        let metadata = metadata_path(&self.folder, &document_id);
        if let Err(err) = remove_file_if_exists(&metadata).await {
            log::warn!("Failed to remove {:?}: {}", metadata, err);
        }

        log::info!("Deleted document {} (id {})", uri, document_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Documents ranked by the mean similarity of their matching chunks, best first.
    pub async fn query_documents(
        &mut self,
        query: &str,
        options: DocumentQueryOptions,
    ) -> Result<Vec<DocumentResult>> {
        let model = self
            .embeddings
            .clone()
            .ok_or(DocumentIndexError::EmbeddingsNotConfigured)?;
        let max_documents = options
            .max_documents
            .unwrap_or(self.config.query.max_documents);
        let max_chunks = options.max_chunks.unwrap_or(self.config.query.max_chunks);

        let query_text = query.replace('\n', " ");
        let vector = create_embeddings(model.as_ref(), &[query_text.clone()], "query")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DocumentIndexError::EmbeddingGenerationFailed {
                context: "query".to_string(),
                reason: "no embedding returned".to_string(),
            })?;

        let results = self
            .store
            .query_items(&vector, max_chunks, options.filter.as_ref())
            .await?;
        let mut chunks: Vec<DocumentChunk> = results
            .into_iter()
            .map(|result| DocumentChunk {
                item: result.item,
                score: result.score,
                is_bm25: false,
            })
            .collect();

        if options.is_bm25 {
            let keyword = self
                .keyword_chunks(&query_text, &chunks, max_chunks, options.filter.as_ref())
                .await?;
            chunks.extend(keyword);
        }

        log::debug!(
            "Query matched {} chunks (max_chunks {}, bm25 {})",
            chunks.len(),
            max_chunks,
            options.is_bm25
        );

        let mut documents = self.group_by_document(chunks).await?;
        documents.sort_by(|a, b| rank_descending(a.score(), b.score()));
        documents.truncate(max_documents);
        Ok(documents)
    }

    /// Rank stored chunks not already returned by similarity with the keyword ranker.
    async fn keyword_chunks(
        &mut self,
        query: &str,
        semantic: &[DocumentChunk],
        max_chunks: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<DocumentChunk>> {
        let Some(ranker) = self.keyword_ranker.clone() else {
            return Ok(Vec::new());
        };

        let returned: HashSet<&str> = semantic.iter().map(|c| c.item.id.as_str()).collect();
        let pool: Vec<Item> = match filter {
            Some(filter) => self.store.list_items_by_metadata(filter).await?,
            None => self.store.list_items().await?,
        }
        .into_iter()
        .filter(|item| !returned.contains(item.id.as_str()))
        .collect();

        let mut texts: HashMap<String, String> = HashMap::new();
        for item in &pool {
            let Some(id) = item.metadata.get(DOCUMENT_ID_KEY).and_then(MetadataValue::as_str)
            else {
                continue;
            };
            if !texts.contains_key(id) {
                let text = self.load_document_text(id).await?;
                texts.insert(id.to_string(), text);
            }
        }

        let mut chunk_texts: Vec<&str> = Vec::with_capacity(pool.len());
        for item in &pool {
            let text = item
                .metadata
                .get(DOCUMENT_ID_KEY)
                .and_then(MetadataValue::as_str)
                .and_then(|id| texts.get(id));
            let start = item.metadata.get(START_POS_KEY).and_then(MetadataValue::as_usize);
            let end = item.metadata.get(END_POS_KEY).and_then(MetadataValue::as_usize);
            chunk_texts.push(match (text, start, end) {
                (Some(text), Some(start), Some(end)) => slice_chars(text, start, end),
                _ => "",
            });
        }

        Ok(ranker
            .rank(query, &chunk_texts, max_chunks)
            .into_iter()
            .filter_map(|hit| {
                pool.get(hit.index).map(|item| DocumentChunk {
                    item: item.clone(),
                    score: hit.score,
                    is_bm25: true,
                })
            })
            .collect())
    }

    /// Every stored document with all of its chunks, each scored `1.0`.
    pub async fn list_documents(&mut self) -> Result<Vec<DocumentResult>> {
        let chunks = self
            .store
            .list_items()
            .await?
            .into_iter()
            .map(|item| DocumentChunk {
                item,
                score: 1.0,
                is_bm25: false,
            })
            .collect();
        self.group_by_document(chunks).await
    }

    /// Group chunks by document in first-seen order; the document score is the chunk mean.
    async fn group_by_document(&mut self, chunks: Vec<DocumentChunk>) -> Result<Vec<DocumentResult>> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<DocumentChunk>> = HashMap::new();
        for chunk in chunks {
            let Some(id) = chunk.document_id().map(str::to_string) else {
                log::warn!("Chunk {} has no {} metadata", chunk.item.id, DOCUMENT_ID_KEY);
                continue;
            };
            if !groups.contains_key(&id) {
                order.push(id.clone());
            }
            groups.entry(id).or_default().push(chunk);
        }

        let catalog = self.ensure_catalog().await?.clone();
        let mut documents = Vec::with_capacity(order.len());
        for id in order {
            let Some(uri) = catalog.document_uri(&id) else {
                log::warn!("Document {} is missing from the catalog", id);
                continue;
            };
            let chunks = groups.remove(&id).unwrap_or_default();
            let score = chunks.iter().map(|c| c.score).sum::<f32>() / chunks.len().max(1) as f32;
            documents.push(DocumentResult::new(
                DocumentHandle::new(&self.folder, id.as_str(), uri),
                chunks,
                score,
                Arc::clone(&self.tokenizer),
            ));
        }
        Ok(documents)
    }
}

/// Embed chunk texts in batches whose summed token count stays within the model limit.
async fn embed_chunks(
    model: &dyn EmbeddingsModel,
    chunks: &[TextChunk],
    uri: &str,
) -> Result<Vec<Vec<f32>>> {
    let max_tokens = model.max_tokens();
    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0;
    for chunk in chunks {
        let tokens = chunk.token_count();
        if !current.is_empty() && current_tokens + tokens > max_tokens {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push(chunk.text.clone());
        current_tokens += tokens;
    }
    if !current.is_empty() {
        batches.push(current);
    }

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in batches {
        vectors.extend(create_embeddings(model, &batch, uri).await?);
    }
    Ok(vectors)
}

async fn create_embeddings(
    model: &dyn EmbeddingsModel,
    inputs: &[String],
    context: &str,
) -> Result<Vec<Vec<f32>>> {
    let failed = |reason: String| DocumentIndexError::EmbeddingGenerationFailed {
        context: context.to_string(),
        reason,
    };
    let response = model.create_embeddings(inputs).await;
    match response.status {
        EmbeddingsStatus::Success => {
            let output = response
                .output
                .ok_or_else(|| failed("response has no output".to_string()))?;
            if output.len() != inputs.len() {
                return Err(failed(format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    output.len()
                )));
            }
            Ok(output)
        }
        EmbeddingsStatus::RateLimited => Err(failed(
            response
                .message
                .unwrap_or_else(|| "rate limited".to_string()),
        )),
        EmbeddingsStatus::Error => Err(failed(
            response
                .message
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}
