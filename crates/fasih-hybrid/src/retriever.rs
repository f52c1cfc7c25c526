use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use fasih_core::config::RetrievalSettings;
use fasih_core::error::Error;
use fasih_core::normalize::ArabicNormalizer;
use fasih_core::traits::{Embedder, SemanticOutcome, SemanticSearch};
use fasih_core::types::{ChunkId, IndexStats, PoetSummary, RetrievalSource, ScoredRecord, SearchResult, VerseRecord};
use fasih_core::Corpus;
use fasih_text::LexicalIndex;
use fasih_vector::SemanticIndex;

use crate::merge::{FusionParams, HybridMerger, MergedHit};

/// Retrieval facade: exact verse lookup, then lexical and semantic search
/// fused into one ranked list.
pub struct HybridRetriever<S = SemanticIndex> {
    settings: RetrievalSettings,
    merger: HybridMerger,
    corpus: Corpus,
    lexical: LexicalIndex,
    semantic: Option<S>,
}

impl<S: SemanticSearch> HybridRetriever<S> {
    /// A retriever with no indices. Searching fails until the lexical index is built.
    pub fn new(settings: RetrievalSettings) -> Self {
        let normalizer = ArabicNormalizer::new(settings.unify_letters);
        Self {
            merger: HybridMerger::new(FusionParams::from(&settings)),
            settings,
            corpus: Corpus::default(),
            lexical: LexicalIndex::new(normalizer),
            semantic: None,
        }
    }

    pub fn with_indices(settings: RetrievalSettings, corpus: Corpus, lexical: LexicalIndex, semantic: Option<S>) -> Self {
        Self {
            merger: HybridMerger::new(FusionParams::from(&settings)),
            settings,
            corpus,
            lexical,
            semantic,
        }
    }

    /// (Re)build the in-memory lexical index from `corpus` and adopt it.
    pub fn build_lexical(&mut self, corpus: Corpus) -> Result<usize> {
        let count = self.lexical.build(&corpus)?;
        self.corpus = corpus;
        Ok(count)
    }

    pub fn poets(&self) -> Vec<PoetSummary> {
        self.corpus.poets()
    }

    pub fn record(&self, chunk_id: ChunkId) -> Option<Arc<VerseRecord>> {
        self.corpus.get(chunk_id).cloned()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            records: self.corpus.len(),
            poets: self.corpus.poets().len(),
            lexical_ready: self.lexical.is_ready(),
            semantic_ready: self.semantic.is_some(),
        }
    }

    /// Top-`k` results for `query` with `score >= score_threshold`, best first.
    ///
    /// A confident exact verse match short-circuits everything else. Otherwise
    /// both engines are over-fetched and fused; when the semantic side has
    /// nothing to offer the lexical ranking is returned as is.
    pub async fn search(&self, query: &str, k: usize, score_threshold: f32) -> Result<Vec<SearchResult>> {
        if !self.lexical.is_ready() {
            return Err(Error::NotInitialized("lexical").into());
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        if let Some(exact) = self.lexical.exact_match(query)? {
            if exact.score >= self.settings.exact_confidence {
                tracing::debug!(chunk_id = exact.chunk_id(), "returning exact match");
                return Ok(threshold(vec![to_result(exact, RetrievalSource::Exact)], score_threshold));
            }
        }

        let fetch = k.saturating_mul(self.settings.over_fetch);
        let lexical = self.lexical.search(query, fetch, 0.0);
        let semantic = match &self.semantic {
            Some(index) => index.search(query, fetch).await,
            None => SemanticOutcome::Unavailable("semantic index not loaded".to_string()),
        };
        if let SemanticOutcome::Unavailable(reason) = &semantic {
            tracing::debug!(%reason, "continuing without semantic results");
        }
        let semantic = semantic.into_hits();

        let results = match (lexical, semantic.is_empty()) {
            (Ok(lexical), true) => lexical
                .into_iter()
                .take(k)
                .map(|hit| to_result(hit, RetrievalSource::Lexical))
                .collect(),
            (Ok(lexical), false) => self
                .merger
                .merge(&lexical, &semantic, k)
                .into_iter()
                .map(|hit| merged_result(hit, RetrievalSource::Hybrid))
                .collect(),
            (Err(e), false) => {
                tracing::warn!(error = %e, "lexical search failed; using semantic results only");
                self.merger
                    .merge(&[], &semantic, k)
                    .into_iter()
                    .map(|hit| merged_result(hit, RetrievalSource::Semantic))
                    .collect()
            }
            (Err(e), true) => return Err(e),
        };
        let results = threshold(results, score_threshold);
        tracing::debug!(query, results = results.len(), "search finished");
        Ok(results)
    }
}

impl HybridRetriever<SemanticIndex> {
    /// Rebuild both indices from `corpus`, persisting the semantic one to `index_dir`.
    pub async fn build_indices(&mut self, corpus: Corpus, index_dir: &Path, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<()> {
        let semantic = SemanticIndex::build(&corpus, index_dir, embedder, batch_size).await?;
        self.build_lexical(corpus)?;
        self.semantic = Some(semantic);
        Ok(())
    }

    /// Rebuild the lexical index and open the persisted semantic one. A
    /// semantic index that cannot be opened leaves the retriever lexical-only.
    pub async fn load_indices(&mut self, corpus: Corpus, index_dir: &Path, embedder: Arc<dyn Embedder>) -> Result<()> {
        let semantic = match SemanticIndex::load(&corpus, index_dir, embedder).await {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(error = %e, "semantic index unavailable; lexical search only");
                None
            }
        };
        self.build_lexical(corpus)?;
        self.semantic = semantic;
        Ok(())
    }
}

fn to_result(hit: ScoredRecord, source: RetrievalSource) -> SearchResult {
    SearchResult {
        explanation: hit.record.explanation.clone(),
        record: hit.record,
        score: hit.score,
        retrieval_source: source,
        breakdown: None,
    }
}

fn merged_result(hit: MergedHit, source: RetrievalSource) -> SearchResult {
    SearchResult {
        explanation: hit.record.explanation.clone(),
        record: hit.record,
        score: hit.score,
        retrieval_source: source,
        breakdown: Some(hit.breakdown),
    }
}

fn threshold(results: Vec<SearchResult>, score_threshold: f32) -> Vec<SearchResult> {
    results.into_iter().filter(|r| r.score >= score_threshold).collect()
}
