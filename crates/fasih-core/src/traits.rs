use std::future::Future;

use crate::types::ScoredRecord;

/// Prefix the E5 family expects on search queries.
pub const QUERY_PREFIX: &str = "query: ";
/// Prefix the E5 family expects on indexed passages.
pub const PASSAGE_PREFIX: &str = "passage: ";

pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, persisted next to vectors it produced.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Embed raw texts as given, one L2-normalized vector per input.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, query: &str) -> anyhow::Result<Vec<f32>> {
        let mut out = self.embed_batch(&[format!("{QUERY_PREFIX}{query}")])?;
        out.pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))
    }

    fn embed_passages(&self, passages: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let framed: Vec<String> = passages
            .iter()
            .map(|p| format!("{PASSAGE_PREFIX}{p}"))
            .collect();
        self.embed_batch(&framed)
    }
}

/// What a semantic lookup produced. Degraded modes are values, not errors:
/// the caller decides how to continue.
#[derive(Debug, Clone)]
pub enum SemanticOutcome {
    Hits(Vec<ScoredRecord>),
    Empty,
    Unavailable(String),
}

impl SemanticOutcome {
    pub fn from_hits(hits: Vec<ScoredRecord>) -> Self {
        if hits.is_empty() {
            Self::Empty
        } else {
            Self::Hits(hits)
        }
    }

    /// Hits, treating `Empty` and `Unavailable` alike.
    pub fn into_hits(self) -> Vec<ScoredRecord> {
        match self {
            Self::Hits(hits) => hits,
            Self::Empty | Self::Unavailable(_) => Vec::new(),
        }
    }
}

/// Dense retrieval seam used by the hybrid facade.
pub trait SemanticSearch: Send + Sync {
    fn search(&self, query: &str, k: usize) -> impl Future<Output = SemanticOutcome> + Send;
}
