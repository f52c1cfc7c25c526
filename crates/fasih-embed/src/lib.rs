//! fasih-embed
//!
//! Sentence embeddings for verses and queries: the multilingual E5 encoder
//! through candle, or a hash-based fake for offline use.

use anyhow::Result;
use std::sync::Arc;

use fasih_core::config::EmbeddingSettings;
use fasih_core::traits::Embedder;

pub mod device;
pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use fake::FakeEmbedder;
pub use model::EmbeddingModel;
pub use pool::masked_mean_l2;

/// `true` when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_embeddings_forced() {
        tracing::info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    Ok(Arc::new(EmbeddingModel::new(settings)?))
}
