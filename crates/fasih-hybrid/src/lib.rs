//! fasih-hybrid
//!
//! The retrieval facade over the lexical and semantic indices: exact verse
//! lookup, score fusion, threshold filtering and a shared handle for
//! concurrent readers.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use fasih_core::config::Settings;
use fasih_core::traits::Embedder;
use fasih_core::Corpus;
use fasih_vector::SemanticIndex;

pub mod merge;
pub mod retriever;
pub mod shared;

pub use merge::{min_max_normalize, FusionParams, HybridMerger, MergedHit};
pub use retriever::HybridRetriever;
pub use shared::SharedRetriever;
pub use fasih_vector::prune_versions;

/// Load the corpus and rebuild both indices, publishing a new semantic index
/// version under `index_path`. Older versions stay until [`prune_versions`].
pub async fn build(corpus_path: &Path, index_path: &Path, settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<HybridRetriever<SemanticIndex>> {
    let corpus = Corpus::load(corpus_path).with_context(|| format!("loading corpus {}", corpus_path.display()))?;
    let mut retriever: HybridRetriever<SemanticIndex> = HybridRetriever::new(settings.retrieval.clone());
    retriever
        .build_indices(corpus, index_path, embedder, settings.embedding.batch_size)
        .await?;
    tracing::info!(corpus = %corpus_path.display(), index = %index_path.display(), "indices built");
    Ok(retriever)
}

/// Load the corpus, rebuild the lexical index and open the persisted semantic
/// index, degrading to lexical-only if it cannot be opened.
pub async fn load(corpus_path: &Path, index_path: &Path, settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<HybridRetriever<SemanticIndex>> {
    let corpus = Corpus::load(corpus_path).with_context(|| format!("loading corpus {}", corpus_path.display()))?;
    let mut retriever: HybridRetriever<SemanticIndex> = HybridRetriever::new(settings.retrieval.clone());
    retriever.load_indices(corpus, index_path, embedder).await?;
    Ok(retriever)
}
