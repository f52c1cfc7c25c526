use std::path::PathBuf;
use std::sync::Arc;

use fasih_core::config::{RetrievalSettings, Settings};
use fasih_core::traits::{SemanticOutcome, SemanticSearch};
use fasih_core::types::{RetrievalSource, ScoredRecord};
use fasih_core::{Corpus, Error};
use fasih_embed::FakeEmbedder;
use fasih_hybrid::{HybridRetriever, SharedRetriever};
use fasih_text::LexicalIndex;
use tempfile::TempDir;

/// Semantic side that always answers the same way.
#[derive(Clone)]
struct FixedSemantic(SemanticOutcome);

impl SemanticSearch for FixedSemantic {
    async fn search(&self, _query: &str, _k: usize) -> SemanticOutcome {
        self.0.clone()
    }
}

fn corpus_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().join("test_data/corpus.json")
}

fn retriever(semantic: SemanticOutcome) -> HybridRetriever<FixedSemantic> {
    let corpus = Corpus::load(&corpus_path()).expect("corpus");
    let mut lexical = LexicalIndex::default();
    lexical.build(&corpus).expect("lexical");
    HybridRetriever::with_indices(RetrievalSettings::default(), corpus, lexical, Some(FixedSemantic(semantic)))
}

fn semantic_hits(corpus: &Corpus, hits: &[(u64, f32)]) -> SemanticOutcome {
    SemanticOutcome::Hits(
        hits.iter()
            .map(|(id, score)| ScoredRecord::new(corpus.get(*id).unwrap().clone(), *score))
            .collect(),
    )
}

#[tokio::test]
async fn exact_verse_returns_single_exact_result() {
    let r = retriever(SemanticOutcome::Unavailable("offline".into()));
    let results = r.search("قفا نبك من ذكرى حبيب ومنزل", 5, 0.0).await.expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].retrieval_source, RetrievalSource::Exact);
    assert_eq!(results[0].score, 1.0);
    assert_eq!(results[0].record.poet_name, "امرؤ القيس");
    assert!(results[0].explanation.starts_with("يخاطب الشاعر"));
    assert!(results[0].breakdown.is_none());
}

#[tokio::test]
async fn unavailable_semantic_falls_back_to_lexical() {
    let r = retriever(SemanticOutcome::Unavailable("model missing".into()));
    let results = r.search("أطلال منزل", 3, 0.0).await.expect("search");
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|res| res.retrieval_source == RetrievalSource::Lexical));
    assert_eq!(results[0].record.chunk_id, 1);
    assert_eq!(results[1].record.chunk_id, 3);
}

#[tokio::test]
async fn semantic_hits_are_fused() {
    let corpus = Corpus::load(&corpus_path()).unwrap();
    let r = retriever(semantic_hits(&corpus, &[(5, 0.9), (3, 0.8)]));
    let results = r.search("أطلال منزل", 3, 0.0).await.expect("search");
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].record.chunk_id, 1);
    assert!(results.iter().any(|res| res.record.chunk_id == 5));
    for res in &results {
        assert_eq!(res.retrieval_source, RetrievalSource::Hybrid);
        assert!(res.breakdown.is_some());
    }
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn no_match_above_threshold_is_empty() {
    let r = retriever(SemanticOutcome::Empty);
    let results = r.search("حاسوب شبكة", 5, 0.1).await.expect("search");
    assert!(results.is_empty());
}

#[tokio::test]
async fn threshold_applies_to_every_path() {
    let corpus = Corpus::load(&corpus_path()).unwrap();
    let r = retriever(semantic_hits(&corpus, &[(7, 0.7), (2, 0.3)]));
    for t in [0.0f32, 0.2, 0.5] {
        let results = r.search("الديار منزل", 6, t).await.expect("search");
        assert!(results.iter().all(|res| res.score >= t));
    }
    let exact = r.search("قفا نبك", 5, 1.5).await.expect("search");
    assert!(exact.is_empty());
}

#[tokio::test]
async fn search_before_build_is_not_initialized() {
    let r: HybridRetriever<FixedSemantic> = HybridRetriever::new(RetrievalSettings::default());
    let err = r.search("قفا", 5, 0.0).await.expect_err("unbuilt");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotInitialized(_))));
    assert!(!r.stats().lexical_ready);
}

#[tokio::test]
async fn catalogue_operations() {
    let r = retriever(SemanticOutcome::Empty);
    let stats = r.stats();
    assert_eq!(stats.records, 9);
    assert_eq!(stats.poets, 7);
    assert!(stats.lexical_ready && stats.semantic_ready);
    assert_eq!(r.poets()[1].name, "طرفة بن العبد");
    assert_eq!(r.record(4).map(|v| v.poet_name.clone()).as_deref(), Some("زهير بن أبي سلمى"));
    assert!(r.record(404).is_none());
    assert!(r.search("قفا", 0, 0.0).await.expect("k=0").is_empty());
}

#[tokio::test]
async fn shared_handle_swaps_whole_retrievers() {
    let shared = SharedRetriever::new(retriever(SemanticOutcome::Empty));
    let before = shared.snapshot();
    let empty: HybridRetriever<FixedSemantic> = HybridRetriever::new(RetrievalSettings::default());
    let previous = shared.replace(empty);
    assert!(Arc::ptr_eq(&before, &previous));
    // the old snapshot keeps working after the swap
    assert_eq!(before.search("أطلال منزل", 2, 0.0).await.expect("search").len(), 2);
    assert!(!shared.snapshot().stats().lexical_ready);
}

#[tokio::test]
async fn build_and_load_with_fake_embeddings() {
    let tmp = TempDir::new().expect("tmp");
    let index_dir = tmp.path().join("vectordb");
    let settings = Settings::default();

    let built = fasih_hybrid::build(&corpus_path(), &index_dir, &settings, Arc::new(FakeEmbedder::new(64)))
        .await
        .expect("build");
    assert!(built.stats().semantic_ready);
    let results = built.search("ديار الحبيبة", 4, 0.0).await.expect("search");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|res| res.retrieval_source == RetrievalSource::Hybrid));

    let loaded = fasih_hybrid::load(&corpus_path(), &index_dir, &settings, Arc::new(FakeEmbedder::new(64)))
        .await
        .expect("load");
    assert!(loaded.stats().semantic_ready);

    let lexical_only = fasih_hybrid::load(&corpus_path(), &tmp.path().join("missing"), &settings, Arc::new(FakeEmbedder::new(64)))
        .await
        .expect("degraded load");
    assert!(!lexical_only.stats().semantic_ready);
    let results = lexical_only.search("ديار الحبيبة", 4, 0.0).await.expect("search");
    assert!(results.iter().all(|res| res.retrieval_source == RetrievalSource::Lexical));
}

#[tokio::test]
async fn rebuild_leaves_a_live_snapshot_hybrid() {
    let tmp = TempDir::new().expect("tmp");
    let index_dir = tmp.path().join("vectordb");
    let settings = Settings::default();

    let first = fasih_hybrid::build(&corpus_path(), &index_dir, &settings, Arc::new(FakeEmbedder::new(64)))
        .await
        .expect("build");
    let shared = SharedRetriever::new(first);
    let live = shared.snapshot();

    let rebuilt = fasih_hybrid::build(&corpus_path(), &index_dir, &settings, Arc::new(FakeEmbedder::new(32)))
        .await
        .expect("rebuild");
    shared.replace(rebuilt);

    let results = live.search("ديار الحبيبة", 4, 0.0).await.expect("search");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|res| res.retrieval_source == RetrievalSource::Hybrid));

    drop(live);
    assert_eq!(fasih_hybrid::prune_versions(&index_dir).expect("prune"), 1);
    let results = shared.snapshot().search("ديار الحبيبة", 4, 0.0).await.expect("search");
    assert!(results.iter().all(|res| res.retrieval_source == RetrievalSource::Hybrid));
}
