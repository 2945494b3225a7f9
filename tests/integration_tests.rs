//! End-to-end tests exercising the retriever against the in-memory store.

use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use trifuse::test_utils::{FlakyConnector, HashingEmbedder};
use trifuse::{
    Filter, HybridRetriever, InMemoryConnector, InMemoryVectorStore, Payload, RetrievalError,
    SearchMode, StoreConfig, StoreConnector, StoreError,
};

const DIM: usize = 8;

fn test_config(multivector: bool) -> StoreConfig {
    StoreConfig {
        collection: "kb".to_string(),
        dense_dim: DIM,
        multivector_dim: DIM,
        enable_multivector: multivector,
        retry_delay: Duration::from_millis(5),
        ..StoreConfig::default()
    }
}

fn retriever(
    store: &InMemoryVectorStore,
    multivector: bool,
) -> HybridRetriever<InMemoryConnector, HashingEmbedder> {
    HybridRetriever::new(
        InMemoryConnector::new(store.clone()),
        HashingEmbedder::new(DIM),
        test_config(multivector),
    )
}

/// Builds parallel ingestion inputs from (chunk text, source file) pairs.
fn inputs(items: &[(&str, &str)]) -> (Vec<String>, Vec<Vec<f32>>, Vec<Payload>) {
    let embedder = HashingEmbedder::new(DIM);
    let chunks: Vec<String> = items.iter().map(|(text, _)| text.to_string()).collect();
    let dense: Vec<Vec<f32>> = chunks.iter().map(|text| embedder.dense(text)).collect();
    let metadatas: Vec<Payload> = items
        .iter()
        .map(|(_, source)| {
            let mut payload = Payload::new();
            payload.insert("source_file".into(), json!(source));
            payload
        })
        .collect();
    (chunks, dense, metadatas)
}

const CORPUS: &[(&str, &str)] = &[
    ("the rust borrow checker enforces ownership", "rust.txt"),
    ("tokio schedules asynchronous tasks", "tokio.txt"),
    ("sourdough bread needs a mature starter", "baking.txt"),
];

#[tokio::test]
async fn upsert_returns_distinct_ids_in_order() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);

    let ids = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();
    assert_eq!(ids.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_eq!(store.record_count("kb"), 3);
}

#[tokio::test]
async fn mismatched_input_lengths_write_nothing() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, mut metadatas) = inputs(CORPUS);
    metadatas.pop();

    let err = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidArgument(_)));
    assert!(store.upsert_batch_sizes().is_empty());
    assert_eq!(store.record_count("kb"), 0);
}

#[tokio::test]
async fn empty_input_is_a_successful_noop() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);

    let ids = retriever.upsert(&[], &[], &[]).await.unwrap();
    assert!(ids.is_empty());
    assert!(store.upsert_batch_sizes().is_empty());
}

#[tokio::test]
async fn batch_sizes_follow_multivector_setting() {
    let items: Vec<(String, String)> = (0..12)
        .map(|i| (format!("chunk number {}", i), "big.txt".to_string()))
        .collect();
    let borrowed: Vec<(&str, &str)> = items
        .iter()
        .map(|(text, source)| (text.as_str(), source.as_str()))
        .collect();
    let (chunks, dense, metadatas) = inputs(&borrowed);

    let with_multi = InMemoryVectorStore::new();
    let mut retriever_multi = retriever(&with_multi, true);
    retriever_multi.upsert(&chunks, &dense, &metadatas).await.unwrap();
    assert_eq!(with_multi.upsert_batch_sizes(), vec![5, 5, 2]);

    let without_multi = InMemoryVectorStore::new();
    let mut retriever_plain = retriever(&without_multi, false);
    retriever_plain.upsert(&chunks, &dense, &metadatas).await.unwrap();
    assert_eq!(without_multi.upsert_batch_sizes(), vec![12]);
}

#[tokio::test]
async fn batch_failure_reports_committed_prefix() {
    let items: Vec<(String, String)> = (0..12)
        .map(|i| (format!("chunk number {}", i), "big.txt".to_string()))
        .collect();
    let borrowed: Vec<(&str, &str)> = items
        .iter()
        .map(|(text, source)| (text.as_str(), source.as_str()))
        .collect();
    let (chunks, dense, metadatas) = inputs(&borrowed);

    let store = InMemoryVectorStore::new();
    store.fail_upserts_from(1);
    let mut retriever = retriever(&store, true);

    let err = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap_err();
    match err {
        RetrievalError::Ingestion {
            batch, committed, ..
        } => {
            assert_eq!(batch, 1);
            assert_eq!(committed, 5);
        }
        other => panic!("expected ingestion error, got {:?}", other),
    }
    // The committed prefix stays in the store.
    assert_eq!(store.record_count("kb"), 5);
}

#[tokio::test]
async fn each_mode_validates_its_inputs() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);

    let missing_vector = retriever
        .search(None, Some("text"), 5, SearchMode::Dense, None)
        .await
        .unwrap_err();
    assert!(matches!(missing_vector, RetrievalError::InvalidArgument(_)));

    let missing_text = retriever
        .search(Some(&[0.0; DIM]), None, 5, SearchMode::Sparse, None)
        .await
        .unwrap_err();
    assert!(matches!(missing_text, RetrievalError::InvalidArgument(_)));

    let missing_colbert_text = retriever
        .search(None, None, 5, SearchMode::Colbert, None)
        .await
        .unwrap_err();
    assert!(matches!(
        missing_colbert_text,
        RetrievalError::InvalidArgument(_)
    ));

    let hybrid_without_text = retriever
        .search(Some(&[0.0; DIM]), None, 5, SearchMode::Hybrid, None)
        .await
        .unwrap_err();
    assert!(matches!(
        hybrid_without_text,
        RetrievalError::InvalidArgument(_)
    ));

    let zero_top_k = retriever
        .search(Some(&[0.0; DIM]), Some("text"), 0, SearchMode::Hybrid, None)
        .await
        .unwrap_err();
    assert!(matches!(zero_top_k, RetrievalError::InvalidArgument(_)));

    let wrong_dim = retriever
        .search(Some(&[0.0; DIM + 1]), None, 5, SearchMode::Dense, None)
        .await
        .unwrap_err();
    assert!(matches!(wrong_dim, RetrievalError::InvalidArgument(_)));
}

#[tokio::test]
async fn dense_search_ranks_the_matching_chunk_first() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    let ids = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    let hits = retriever
        .search(Some(&dense[1]), None, 2, SearchMode::Dense, None)
        .await
        .unwrap();
    assert_eq!(hits[0].id, ids[1]);
    assert!(hits[0].score > 0.99);
    assert!(hits.len() <= 2);
}

#[tokio::test]
async fn sparse_search_matches_on_shared_terms() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    let ids = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    let hits = retriever
        .search(None, Some("sourdough starter"), 3, SearchMode::Sparse, None)
        .await
        .unwrap();
    assert_eq!(hits[0].id, ids[2]);
    assert!(hits[0].score > 0.0);
}

#[tokio::test]
async fn colbert_search_uses_token_level_matching() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, true);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    let ids = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    let hits = retriever
        .search(None, Some("borrow checker"), 3, SearchMode::Colbert, None)
        .await
        .unwrap();
    assert_eq!(hits[0].id, ids[0]);
}

#[tokio::test]
async fn colbert_disabled_returns_no_hits() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    let hits = retriever
        .search(None, Some("borrow checker"), 3, SearchMode::Colbert, None)
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn hybrid_search_fuses_dense_and_sparse_evidence() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    let ids = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    // Query vector and text both point at the rust chunk, so it wins in
    // both spaces and must lead the fused ranking.
    let embedder = HashingEmbedder::new(DIM);
    let query = embedder.dense("rust borrow checker ownership");
    let hits = retriever
        .search(
            Some(&query),
            Some("rust borrow checker ownership"),
            2,
            SearchMode::Hybrid,
            None,
        )
        .await
        .unwrap();

    assert!(hits.len() <= 2);
    assert_eq!(hits[0].id, ids[0]);
    // Normalized hit: content split out, reserved key absent from metadata.
    assert_eq!(hits[0].content, CORPUS[0].0);
    assert!(hits[0].metadata.get("content").is_none());
    assert_eq!(hits[0].metadata.get("source_file"), Some(&json!("rust.txt")));
}

#[tokio::test]
async fn filtered_search_only_sees_matching_records() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    let embedder = HashingEmbedder::new(DIM);
    let query = embedder.dense("rust borrow checker");
    let filter = Filter::source_file("baking.txt");
    let hits = retriever
        .search(Some(&query), None, 10, SearchMode::Dense, Some(filter))
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].metadata.get("source_file"),
        Some(&json!("baking.txt"))
    );
}

#[tokio::test]
async fn delete_by_source_removes_exactly_that_file() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    retriever.delete_by_source("rust.txt").await.unwrap();

    // Re-query everything: the deleted file is gone and the other two
    // survive untouched.
    let embedder = HashingEmbedder::new(DIM);
    let query = embedder.dense("anything at all");
    let hits = retriever
        .search(Some(&query), None, 10, SearchMode::Dense, None)
        .await
        .unwrap();
    let mut survivors: Vec<&str> = hits
        .iter()
        .filter_map(|hit| hit.metadata.get("source_file").and_then(|v| v.as_str()))
        .collect();
    survivors.sort_unstable();
    assert_eq!(survivors, vec!["baking.txt", "tokio.txt"]);

    // Deleting an unknown file is a successful no-op.
    retriever.delete_by_source("missing.txt").await.unwrap();
    assert_eq!(store.record_count("kb"), 2);
}

/// Hands out a brand-new empty store on every connect, like reconnecting
/// to an instance that restarted without its data.
struct RestartingConnector {
    current: Rc<RefCell<InMemoryVectorStore>>,
}

#[async_trait::async_trait(?Send)]
impl StoreConnector for RestartingConnector {
    type Store = InMemoryVectorStore;

    async fn connect(&self, _timeout: Duration) -> Result<Self::Store, StoreError> {
        let store = InMemoryVectorStore::new();
        *self.current.borrow_mut() = store.clone();
        Ok(store)
    }
}

#[tokio::test]
async fn reconnect_reverifies_the_collection() {
    let current = Rc::new(RefCell::new(InMemoryVectorStore::new()));
    let connector = RestartingConnector {
        current: Rc::clone(&current),
    };
    let mut retriever =
        HybridRetriever::new(connector, HashingEmbedder::new(DIM), test_config(false));

    let (chunks, dense, metadatas) = inputs(CORPUS);
    retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    // The store "restarts": the cached handle fails its next probe and the
    // replacement connection starts with no collections at all.
    current.borrow().fail_probes(1);

    let embedder = HashingEmbedder::new(DIM);
    let query = embedder.dense("rust borrow checker");
    let hits = retriever
        .search(Some(&query), None, 3, SearchMode::Dense, None)
        .await
        .unwrap();
    // The collection was re-created on the fresh store, so the search
    // succeeds and simply finds nothing.
    assert!(hits.is_empty());
    assert_eq!(current.borrow().record_count("kb"), 0);
}

#[tokio::test]
async fn connection_retries_then_succeeds() {
    let store = InMemoryVectorStore::new();
    let connector = FlakyConnector::new(store.clone(), 1);
    let attempts = connector.attempt_counter();
    let mut retriever = HybridRetriever::new(
        connector,
        HashingEmbedder::new(DIM),
        test_config(false),
    );

    let (chunks, dense, metadatas) = inputs(CORPUS);
    retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_connection_attempts_fail_the_call() {
    let store = InMemoryVectorStore::new();
    let connector = FlakyConnector::new(store, 3);
    let mut retriever = HybridRetriever::new(
        connector,
        HashingEmbedder::new(DIM),
        test_config(false),
    );

    let (chunks, dense, metadatas) = inputs(CORPUS);
    let err = retriever.upsert(&chunks, &dense, &metadatas).await.unwrap_err();
    assert!(matches!(
        err,
        RetrievalError::Connectivity { attempts: 3, .. }
    ));
}

#[tokio::test]
async fn reset_reconnects_and_reverifies_the_collection() {
    let store = InMemoryVectorStore::new();
    let mut retriever = retriever(&store, false);
    let (chunks, dense, metadatas) = inputs(CORPUS);
    retriever.upsert(&chunks, &dense, &metadatas).await.unwrap();

    retriever.reset();

    // The collection already exists, so re-verification must not recreate
    // it or disturb its records.
    let embedder = HashingEmbedder::new(DIM);
    let query = embedder.dense("tokio asynchronous tasks");
    let hits = retriever
        .search(Some(&query), None, 3, SearchMode::Dense, None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(store.record_count("kb"), 3);
}
