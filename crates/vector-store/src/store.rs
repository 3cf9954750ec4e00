use crate::error::{Result, VectorStoreError};
use crate::filter::MetadataFilter;
use crate::persist::{read_json, remove_file_if_exists, write_json_atomic};
use crate::similarity::{normalize, normalized_cosine_similarity, rank_descending};
use crate::types::{
    IndexStats, Item, Metadata, MetadataConfig, NewItem, QueryResult, StoreState,
};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_INDEX_NAME: &str = "index.json";

/// Where the store keeps its index file inside the folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub index_name: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

/// Parameters for [`VectorStore::create_index`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexOptions {
    pub version: u32,
    /// Keys kept inline in the index file; the rest go to a per-item side file
    pub indexed_keys: Vec<String>,
    pub delete_if_exists: bool,
}

impl Default for CreateIndexOptions {
    fn default() -> Self {
        Self {
            version: 1,
            indexed_keys: Vec::new(),
            delete_if_exists: false,
        }
    }
}

impl CreateIndexOptions {
    #[must_use]
    pub fn indexed_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexed_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn delete_if_exists(mut self, delete: bool) -> Self {
        self.delete_if_exists = delete;
        self
    }
}

#[derive(Debug)]
struct StagedUpdate {
    state: StoreState,
    /// Side files written while staging, removed again if the update is abandoned
    written_files: Vec<String>,
}

#[derive(Debug)]
enum UpdateState {
    Idle,
    Updating(StagedUpdate),
}

/// File-backed vector store with single-writer transactions.
///
/// Reads always see the last committed state. Writes go to a staged copy created by
/// [`begin_update`](Self::begin_update) and become visible on
/// [`end_update`](Self::end_update). `insert_item`, `upsert_item` and `delete_item`
/// called outside an update wrap themselves in one.
#[derive(Debug)]
pub struct VectorStore {
    folder: PathBuf,
    options: StoreOptions,
    committed: Option<StoreState>,
    update: UpdateState,
}

impl VectorStore {
    pub fn open(folder: impl AsRef<Path>) -> Self {
        Self::with_options(folder, StoreOptions::default())
    }

    pub fn with_options(folder: impl AsRef<Path>, options: StoreOptions) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            options,
            committed: None,
            update: UpdateState::Idle,
        }
    }

    pub fn folder_path(&self) -> &Path {
        &self.folder
    }

    pub fn index_path(&self) -> PathBuf {
        self.folder.join(&self.options.index_name)
    }

    pub const fn is_updating(&self) -> bool {
        matches!(self.update, UpdateState::Updating(_))
    }

    pub async fn is_index_created(&self) -> bool {
        tokio::fs::try_exists(self.index_path())
            .await
            .unwrap_or(false)
    }

    /// Create an empty index, replacing an existing one only when asked to.
    pub async fn create_index(&mut self, options: CreateIndexOptions) -> Result<()> {
        if self.is_updating() {
            return Err(VectorStoreError::UpdateAlreadyInProgress);
        }
        let path = self.index_path();
        if self.is_index_created().await {
            if !options.delete_if_exists {
                return Err(VectorStoreError::IndexAlreadyExists(path));
            }
            self.delete_index().await?;
        }

        let state = StoreState {
            version: options.version,
            metadata_config: MetadataConfig {
                indexed: (!options.indexed_keys.is_empty()).then_some(options.indexed_keys),
            },
            items: Vec::new(),
        };

        let written = async {
            tokio::fs::create_dir_all(&self.folder).await?;
            write_json_atomic(&path, &state).await
        }
        .await;
        if let Err(source) = written {
            if let Err(err) = self.remove_folder().await {
                log::warn!("Failed to clean up partial index at {:?}: {}", self.folder, err);
            }
            return Err(VectorStoreError::IndexCreationFailed { path, source });
        }

        log::info!(
            "Created index at {:?} (version {}, {} indexed keys)",
            path,
            state.version,
            state.metadata_config.indexed_keys().len()
        );
        self.committed = Some(state);
        Ok(())
    }

    /// Remove the index folder and everything in it.
    pub async fn delete_index(&mut self) -> Result<()> {
        if self.is_updating() {
            return Err(VectorStoreError::UpdateAlreadyInProgress);
        }
        self.remove_folder().await?;
        self.committed = None;
        log::info!("Deleted index at {:?}", self.folder);
        Ok(())
    }

    async fn remove_folder(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.folder).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }

    /// Reload the committed state from disk, discarding the cached copy.
    pub async fn load_index_data(&mut self) -> Result<&StoreState> {
        let path = self.index_path();
        let state: StoreState = read_json(&path)
            .await?
            .ok_or_else(|| VectorStoreError::IndexNotFound(path.clone()))?;
        log::debug!("Loaded {} items from {:?}", state.items.len(), path);
        Ok(self.committed.insert(state))
    }

    async fn ensure_loaded(&mut self) -> Result<()> {
        if self.committed.is_none() {
            self.load_index_data().await?;
        }
        Ok(())
    }

    fn committed(&self) -> Result<&StoreState> {
        self.committed
            .as_ref()
            .ok_or_else(|| VectorStoreError::IndexNotFound(self.index_path()))
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub async fn begin_update(&mut self) -> Result<()> {
        if self.is_updating() {
            return Err(VectorStoreError::UpdateAlreadyInProgress);
        }
        self.ensure_loaded().await?;
        let state = self.committed()?.clone();
        self.update = UpdateState::Updating(StagedUpdate {
            state,
            written_files: Vec::new(),
        });
        Ok(())
    }

    /// Drop the staged state. A no-op when no update is open.
    pub async fn cancel_update(&mut self) {
        if let UpdateState::Updating(staged) = std::mem::replace(&mut self.update, UpdateState::Idle)
        {
            self.remove_side_files(staged.written_files.iter()).await;
        }
    }

    /// Persist the staged state and make it the committed one.
    ///
    /// On failure the staged changes are discarded and the previous committed state stays.
    pub async fn end_update(&mut self) -> Result<()> {
        let staged = match std::mem::replace(&mut self.update, UpdateState::Idle) {
            UpdateState::Updating(staged) => staged,
            UpdateState::Idle => return Err(VectorStoreError::NoUpdateInProgress),
        };

        let path = self.index_path();
        if let Err(source) = write_json_atomic(&path, &staged.state).await {
            self.remove_side_files(staged.written_files.iter()).await;
            return Err(VectorStoreError::PersistenceFailed { path, source });
        }

        let referenced: BTreeSet<&str> = side_files(&staged.state).collect();
        let mut stale: BTreeSet<String> = staged
            .written_files
            .iter()
            .filter(|f| !referenced.contains(f.as_str()))
            .cloned()
            .collect();
        if let Some(previous) = &self.committed {
            stale.extend(
                side_files(previous)
                    .filter(|f| !referenced.contains(f))
                    .map(str::to_string),
            );
        }

        log::info!(
            "Committed {} items to {:?}",
            staged.state.items.len(),
            path
        );
        self.committed = Some(staged.state);
        self.remove_side_files(stale.iter()).await;
        Ok(())
    }

    async fn remove_side_files<'a>(&self, files: impl Iterator<Item = &'a String>) {
        for file in files {
            let path = self.folder.join(file);
            if let Err(err) = remove_file_if_exists(&path).await {
                log::warn!("Failed to remove metadata file {:?}: {}", path, err);
            }
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Add a new item; fails if an item with the same id exists.
    pub async fn insert_item(&mut self, item: NewItem) -> Result<Item> {
        self.add_item(item, false).await
    }

    /// Add an item, replacing any existing item with the same id in place.
    pub async fn upsert_item(&mut self, item: NewItem) -> Result<Item> {
        self.add_item(item, true).await
    }

    async fn add_item(&mut self, item: NewItem, replace: bool) -> Result<Item> {
        if self.is_updating() {
            return self.stage_item(item, replace).await;
        }
        self.begin_update().await?;
        match self.stage_item(item, replace).await {
            Ok(stored) => {
                self.end_update().await?;
                Ok(stored)
            }
            Err(err) => {
                self.cancel_update().await;
                Err(err)
            }
        }
    }

    async fn stage_item(&mut self, item: NewItem, replace: bool) -> Result<Item> {
        if item.vector.is_empty() {
            return Err(VectorStoreError::VectorRequired);
        }
        let folder = &self.folder;
        let UpdateState::Updating(staged) = &mut self.update else {
            return Err(VectorStoreError::NoUpdateInProgress);
        };

        let id = item.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let existing = staged.state.items.iter().position(|i| i.id == id);
        if existing.is_some() && !replace {
            return Err(VectorStoreError::ItemAlreadyExists(id));
        }

        let config = &staged.state.metadata_config;
        let split = !config.indexed_keys().is_empty()
            && item.metadata.keys().any(|k| !config.is_indexed(k));
        let (metadata, metadata_file) = if split {
            let inline: Metadata = item
                .metadata
                .iter()
                .filter(|(k, _)| config.is_indexed(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let file = format!("{}.json", Uuid::new_v4());
            let path = folder.join(&file);
            let bytes = serde_json::to_vec(&item.metadata)?;
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|source| VectorStoreError::PersistenceFailed { path, source })?;
            staged.written_files.push(file.clone());
            (inline, Some(file))
        } else {
            (item.metadata, None)
        };

        let stored = Item {
            id,
            metadata,
            norm: normalize(&item.vector),
            vector: item.vector,
            metadata_file,
        };
        match existing {
            Some(idx) => staged.state.items[idx] = stored.clone(),
            None => staged.state.items.push(stored.clone()),
        }
        Ok(stored)
    }

    /// Remove an item by id. Unknown ids are not an error.
    pub async fn delete_item(&mut self, id: &str) -> Result<()> {
        if let UpdateState::Updating(staged) = &mut self.update {
            staged.state.items.retain(|item| item.id != id);
            return Ok(());
        }
        self.begin_update().await?;
        if let UpdateState::Updating(staged) = &mut self.update {
            staged.state.items.retain(|item| item.id != id);
        }
        self.end_update().await
    }

    // ------------------------------------------------------------------
    // Reads (committed state only)
    // ------------------------------------------------------------------

    pub async fn get_item(&mut self, id: &str) -> Result<Option<Item>> {
        self.ensure_loaded().await?;
        let state = self.committed()?;
        match state.items.iter().find(|item| item.id == id) {
            Some(item) => Ok(Some(self.resolve(item).await?)),
            None => Ok(None),
        }
    }

    /// Every committed item with its full metadata.
    pub async fn list_items(&mut self) -> Result<Vec<Item>> {
        self.ensure_loaded().await?;
        let state = self.committed()?;
        let mut items = Vec::with_capacity(state.items.len());
        for item in &state.items {
            items.push(self.resolve(item).await?);
        }
        Ok(items)
    }

    pub async fn list_items_by_metadata(&mut self, filter: &MetadataFilter) -> Result<Vec<Item>> {
        self.ensure_loaded().await?;
        let state = self.committed()?;
        let external = needs_external(filter, &state.metadata_config);
        let mut items = Vec::new();
        for item in &state.items {
            if self.passes(item, Some(filter), external).await? {
                items.push(self.resolve(item).await?);
            }
        }
        Ok(items)
    }

    /// Rank committed items by cosine similarity to `vector`, highest first.
    ///
    /// Ties keep insertion order and items with an undefined score rank last.
    pub async fn query_items(
        &mut self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryResult>> {
        self.ensure_loaded().await?;
        let state = self.committed()?;
        let external = filter.is_some_and(|f| needs_external(f, &state.metadata_config));
        let query_norm = normalize(vector);

        let mut scored: Vec<(&Item, f32)> = Vec::new();
        for item in &state.items {
            if !self.passes(item, filter, external).await? {
                continue;
            }
            let score = normalized_cosine_similarity(vector, query_norm, &item.vector, item.norm);
            scored.push((item, score));
        }
        scored.sort_by(|a, b| rank_descending(a.1, b.1));
        scored.truncate(top_k);

        log::debug!(
            "Query over {} items returned {} results",
            state.items.len(),
            scored.len()
        );

        let mut results = Vec::with_capacity(scored.len());
        for (item, score) in scored {
            results.push(QueryResult {
                item: self.resolve(item).await?,
                score,
            });
        }
        Ok(results)
    }

    pub async fn get_stats(&mut self) -> Result<IndexStats> {
        self.ensure_loaded().await?;
        let state = self.committed()?;
        Ok(IndexStats {
            version: state.version,
            metadata_config: state.metadata_config.clone(),
            items: state.items.len(),
        })
    }

    async fn passes(
        &self,
        item: &Item,
        filter: Option<&MetadataFilter>,
        external: bool,
    ) -> Result<bool> {
        let Some(filter) = filter else {
            return Ok(true);
        };
        if external && item.metadata_file.is_some() {
            let full = self.read_metadata_file(item).await?;
            return Ok(filter.matches(&full));
        }
        Ok(filter.matches(&item.metadata))
    }

    async fn resolve(&self, item: &Item) -> Result<Item> {
        let mut resolved = item.clone();
        if item.metadata_file.is_some() {
            resolved.metadata = self.read_metadata_file(item).await?;
        }
        Ok(resolved)
    }

    async fn read_metadata_file(&self, item: &Item) -> Result<Metadata> {
        let Some(file) = &item.metadata_file else {
            return Ok(item.metadata.clone());
        };
        let path = self.folder.join(file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| VectorStoreError::MetadataReadFailed {
                id: item.id.clone(),
                path: path.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| VectorStoreError::MetadataParseFailed {
            id: item.id.clone(),
            path,
            source,
        })
    }
}

fn side_files(state: &StoreState) -> impl Iterator<Item = &str> {
    state.items.iter().filter_map(|item| item.metadata_file.as_deref())
}

/// Whether evaluating `filter` needs keys that are only in side files.
fn needs_external(filter: &MetadataFilter, config: &MetadataConfig) -> bool {
    !config.indexed_keys().is_empty()
        && filter
            .referenced_keys()
            .into_iter()
            .any(|key| !config.is_indexed(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    async fn new_store(tmp: &TempDir) -> VectorStore {
        let mut store = VectorStore::open(tmp.path().join("index"));
        store
            .create_index(CreateIndexOptions::default())
            .await
            .unwrap();
        store
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn create_index_twice_requires_delete_flag() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        assert!(store.is_index_created().await);

        let err = store
            .create_index(CreateIndexOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::IndexAlreadyExists(_)));

        store
            .insert_item(NewItem::new(vec![1.0]).id("a"))
            .await
            .unwrap();
        store
            .create_index(CreateIndexOptions::default().delete_if_exists(true))
            .await
            .unwrap();
        assert!(store.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_without_index_fail() {
        let tmp = TempDir::new().unwrap();
        let mut store = VectorStore::open(tmp.path().join("missing"));
        assert!(!store.is_index_created().await);
        let err = store.query_items(&[1.0], 3, None).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::IndexNotFound(_)));
        let err = store.begin_update().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::IndexNotFound(_)));
    }

    #[tokio::test]
    async fn double_begin_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store.begin_update().await.unwrap();
        let err = store.begin_update().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::UpdateAlreadyInProgress));
    }

    #[tokio::test]
    async fn end_without_begin_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        let err = store.end_update().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::NoUpdateInProgress));
    }

    #[tokio::test]
    async fn staged_changes_are_invisible_until_commit() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store
            .insert_item(NewItem::new(vec![1.0, 0.0]).id("a"))
            .await
            .unwrap();

        store.begin_update().await.unwrap();
        store
            .insert_item(NewItem::new(vec![0.0, 1.0]).id("b"))
            .await
            .unwrap();
        store.delete_item("a").await.unwrap();
        assert_eq!(ids(&store.list_items().await.unwrap()), vec!["a"]);

        store.end_update().await.unwrap();
        assert_eq!(ids(&store.list_items().await.unwrap()), vec!["b"]);
    }

    #[tokio::test]
    async fn cancel_discards_staged_changes() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store.begin_update().await.unwrap();
        store
            .insert_item(NewItem::new(vec![1.0]).id("a"))
            .await
            .unwrap();
        store.cancel_update().await;
        assert!(!store.is_updating());
        assert!(store.list_items().await.unwrap().is_empty());

        // A cancelled update leaves the store ready for the next one.
        store.begin_update().await.unwrap();
        store.cancel_update().await;
    }

    #[tokio::test]
    async fn insert_rejects_duplicates_and_upsert_replaces() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store
            .insert_item(NewItem::new(vec![3.0, 4.0]).id("a"))
            .await
            .unwrap();
        store
            .insert_item(NewItem::new(vec![1.0, 0.0]).id("b"))
            .await
            .unwrap();

        let err = store
            .insert_item(NewItem::new(vec![1.0, 1.0]).id("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::ItemAlreadyExists(ref id) if id == "a"));
        assert!(!store.is_updating());

        let replaced = store
            .upsert_item(NewItem::new(vec![6.0, 8.0]).id("a").meta("v", 2))
            .await
            .unwrap();
        assert_eq!(replaced.norm, 10.0);

        let items = store.list_items().await.unwrap();
        assert_eq!(ids(&items), vec!["a", "b"]);
        assert_eq!(items[0].vector, vec![6.0, 8.0]);
    }

    #[tokio::test]
    async fn empty_vector_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        let err = store.insert_item(NewItem::new(vec![])).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::VectorRequired));
        assert!(!store.is_updating());
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        let a = store.insert_item(NewItem::new(vec![1.0])).await.unwrap();
        let b = store.insert_item(NewItem::new(vec![1.0])).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_ok() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store.delete_item("nope").await.unwrap();
    }

    #[tokio::test]
    async fn query_ranks_descending_with_nan_last() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store.begin_update().await.unwrap();
        for (id, v) in [
            ("zero", vec![0.0, 0.0]),
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("exact", vec![2.0, 0.0]),
            ("exact2", vec![5.0, 0.0]),
        ] {
            store.insert_item(NewItem::new(v).id(id)).await.unwrap();
        }
        store.end_update().await.unwrap();

        let results = store.query_items(&[1.0, 0.0], 10, None).await.unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(order, vec!["exact", "exact2", "near", "far", "zero"]);
        assert!(results[4].score.is_nan());

        let top = store.query_items(&[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(top.len(), 2);
    }

    #[tokio::test]
    async fn query_with_filter() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store
            .insert_item(NewItem::new(vec![1.0, 0.0]).id("a").meta("tag", "x"))
            .await
            .unwrap();
        store
            .insert_item(NewItem::new(vec![1.0, 0.0]).id("b").meta("tag", "y"))
            .await
            .unwrap();

        let filter = MetadataFilter::from_json(&json!({"tag": "y"})).unwrap();
        let results = store
            .query_items(&[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item.id, "b");
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("index");
        {
            let mut store = new_store(&tmp).await;
            store
                .insert_item(NewItem::new(vec![1.0, 2.0]).id("a").meta("n", 1))
                .await
                .unwrap();
        }
        let mut reopened = VectorStore::open(&folder);
        let item = reopened.get_item("a").await.unwrap().unwrap();
        assert_eq!(item.vector, vec![1.0, 2.0]);
        assert_eq!(item.metadata["n"].as_f64(), Some(1.0));
        assert_eq!(reopened.get_stats().await.unwrap().items, 1);
    }

    #[tokio::test]
    async fn non_indexed_metadata_goes_to_side_file() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("index");
        let mut store = VectorStore::open(&folder);
        store
            .create_index(CreateIndexOptions::default().indexed_keys(["kind"]))
            .await
            .unwrap();

        let stored = store
            .insert_item(
                NewItem::new(vec![1.0])
                    .id("a")
                    .meta("kind", "doc")
                    .meta("title", "hello"),
            )
            .await
            .unwrap();
        let file = stored.metadata_file.clone().unwrap();
        assert!(folder.join(&file).exists());
        assert_eq!(stored.metadata.len(), 1);

        // Payload metadata is resolved from the side file.
        let item = store.get_item("a").await.unwrap().unwrap();
        assert_eq!(item.metadata["title"].as_str(), Some("hello"));

        // Filtering on a non-indexed key reads the side file.
        let filter = MetadataFilter::eq("title", "hello");
        assert_eq!(store.list_items_by_metadata(&filter).await.unwrap().len(), 1);

        store.delete_item("a").await.unwrap();
        assert!(!folder.join(&file).exists());
    }

    #[tokio::test]
    async fn cancel_removes_staged_side_files() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("index");
        let mut store = VectorStore::open(&folder);
        store
            .create_index(CreateIndexOptions::default().indexed_keys(["kind"]))
            .await
            .unwrap();

        store.begin_update().await.unwrap();
        let stored = store
            .insert_item(NewItem::new(vec![1.0]).meta("body", "x"))
            .await
            .unwrap();
        let file = folder.join(stored.metadata_file.unwrap());
        assert!(file.exists());
        store.cancel_update().await;
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn failed_commit_keeps_previous_state() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("index");
        let mut store = new_store(&tmp).await;
        store
            .insert_item(NewItem::new(vec![1.0]).id("a"))
            .await
            .unwrap();

        store.begin_update().await.unwrap();
        store
            .insert_item(NewItem::new(vec![1.0]).id("b"))
            .await
            .unwrap();

        // Replace the folder with a plain file so the index write cannot succeed.
        std::fs::remove_dir_all(&folder).unwrap();
        std::fs::write(&folder, b"not a directory").unwrap();

        let err = store.end_update().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::PersistenceFailed { .. }));
        assert!(!store.is_updating());
        assert_eq!(ids(&store.list_items().await.unwrap()), vec!["a"]);
    }

    #[tokio::test]
    async fn delete_index_is_blocked_during_update() {
        let tmp = TempDir::new().unwrap();
        let mut store = new_store(&tmp).await;
        store.begin_update().await.unwrap();
        assert!(matches!(
            store.delete_index().await.unwrap_err(),
            VectorStoreError::UpdateAlreadyInProgress
        ));
        store.cancel_update().await;
        store.delete_index().await.unwrap();
        assert!(!store.is_index_created().await);
    }
}
