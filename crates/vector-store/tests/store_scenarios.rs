use serde_json::json;
use tempfile::TempDir;
use vectra_vector_store::{
    CreateIndexOptions, MetadataFilter, NewItem, StoreOptions, VectorStore, VectorStoreError,
};

async fn fresh_store(temp: &TempDir, indexed: &[&str]) -> VectorStore {
    let mut store = VectorStore::open(temp.path().join("store"));
    store
        .create_index(CreateIndexOptions::default().indexed_keys(indexed.iter().copied()))
        .await
        .expect("create index");
    store
}

#[tokio::test]
async fn category_filter_returns_matching_ids_in_order() {
    let temp = TempDir::new().expect("tempdir");
    let mut store = fresh_store(&temp, &[]).await;

    store.begin_update().await.expect("begin");
    for (id, category) in [
        ("1", "food"),
        ("2", "food"),
        ("3", "electronics"),
        ("4", "drink"),
        ("5", "food"),
    ] {
        store
            .insert_item(NewItem::new(vec![1.0, 0.5]).id(id).meta("category", category))
            .await
            .expect("insert");
    }
    store.end_update().await.expect("commit");

    let filter =
        MetadataFilter::from_json(&json!({"category": {"$eq": "food"}})).expect("parse filter");
    let ids: Vec<String> = store
        .list_items_by_metadata(&filter)
        .await
        .expect("list")
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(ids, vec!["1", "2", "5"]);

    // Equal scores keep insertion order in ranked queries too.
    let ranked: Vec<String> = store
        .query_items(&[1.0, 0.5], 10, Some(&filter))
        .await
        .expect("query")
        .into_iter()
        .map(|result| result.item.id)
        .collect();
    assert_eq!(ranked, vec!["1", "2", "5"]);
}

#[tokio::test]
async fn filter_on_side_file_keys_resolves_full_metadata() {
    let temp = TempDir::new().expect("tempdir");
    let mut store = fresh_store(&temp, &["category"]).await;

    store
        .insert_item(
            NewItem::new(vec![0.0, 1.0])
                .id("apple")
                .meta("category", "food")
                .meta("price", 3),
        )
        .await
        .expect("insert apple");
    store
        .insert_item(
            NewItem::new(vec![1.0, 0.0])
                .id("laptop")
                .meta("category", "electronics")
                .meta("price", 900),
        )
        .await
        .expect("insert laptop");

    let cheap = MetadataFilter::from_json(&json!({"price": {"$lt": 10}})).expect("parse");
    let results = store
        .query_items(&[1.0, 1.0], 5, Some(&cheap))
        .await
        .expect("query");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].item.id, "apple");
    assert_eq!(results[0].item.metadata["price"].as_f64(), Some(3.0));

    // The index file itself only carries the indexed key.
    let raw = tokio::fs::read_to_string(temp.path().join("store").join("index.json"))
        .await
        .expect("read index");
    let index: serde_json::Value = serde_json::from_str(&raw).expect("parse index");
    let inline = &index["items"][0]["metadata"];
    assert_eq!(inline["category"], "food");
    assert!(inline.get("price").is_none());
    assert!(index["items"][0]["metadataFile"].is_string());
}

#[tokio::test]
async fn upsert_replaces_side_file_and_removes_the_old_one() {
    let temp = TempDir::new().expect("tempdir");
    let folder = temp.path().join("store");
    let mut store = fresh_store(&temp, &["category"]).await;

    let first = store
        .upsert_item(NewItem::new(vec![1.0]).id("a").meta("note", "v1"))
        .await
        .expect("first upsert");
    let second = store
        .upsert_item(NewItem::new(vec![2.0]).id("a").meta("note", "v2"))
        .await
        .expect("second upsert");

    let old_file = folder.join(first.metadata_file.expect("first side file"));
    let new_file = folder.join(second.metadata_file.expect("second side file"));
    assert!(!old_file.exists(), "stale side file should be removed");
    assert!(new_file.exists());

    let item = store.get_item("a").await.expect("get").expect("present");
    assert_eq!(item.metadata["note"].as_str(), Some("v2"));
    assert_eq!(store.get_stats().await.expect("stats").items, 1);
}

#[tokio::test]
async fn custom_index_name_and_reload() {
    let temp = TempDir::new().expect("tempdir");
    let folder = temp.path().join("custom");
    let options = StoreOptions {
        index_name: "vectors.json".to_string(),
    };

    let mut store = VectorStore::with_options(&folder, options.clone());
    store
        .create_index(CreateIndexOptions {
            version: 3,
            ..Default::default()
        })
        .await
        .expect("create");
    store
        .insert_item(NewItem::new(vec![0.5, 0.5]).id("x"))
        .await
        .expect("insert");
    assert!(folder.join("vectors.json").exists());

    let mut other = VectorStore::with_options(&folder, options);
    let stats = other.get_stats().await.expect("stats");
    assert_eq!(stats.version, 3);
    assert_eq!(stats.items, 1);

    // Changes made through another handle show up after an explicit reload.
    store.delete_item("x").await.expect("delete");
    assert_eq!(other.list_items().await.expect("list").len(), 1);
    other.load_index_data().await.expect("reload");
    assert!(other.list_items().await.expect("list").is_empty());
}

#[tokio::test]
async fn second_begin_update_fails_and_first_stays_usable() {
    let temp = TempDir::new().expect("tempdir");
    let mut store = fresh_store(&temp, &[]).await;

    store.begin_update().await.expect("begin");
    store
        .insert_item(NewItem::new(vec![1.0]).id("kept"))
        .await
        .expect("insert");
    let err = store.begin_update().await.expect_err("second begin");
    assert!(matches!(err, VectorStoreError::UpdateAlreadyInProgress));

    store.end_update().await.expect("commit");
    assert_eq!(store.list_items().await.expect("list").len(), 1);
}
