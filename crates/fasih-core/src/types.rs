//! Domain types shared by the lexical, semantic and hybrid engines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type ChunkId = u64;

/// One verse of the corpus together with its commentary.
///
/// - `chunk_id`: corpus-wide unique identifier
/// - `verse_text`: the poetic line as written in the source (may be empty)
/// - `explanation`: commentary extracted from `combined_text`
/// - `combined_text`: the display string holding verse and commentary
/// - `poet_name`/`poem_name`: which ode the verse belongs to
/// - `verse_number`: position within the poem, `0` when unknown
/// - `source_book`: provenance of the commentary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub chunk_id: ChunkId,
    pub verse_text: String,
    pub explanation: String,
    pub combined_text: String,
    pub poet_name: String,
    pub poem_name: String,
    pub verse_number: u32,
    pub source_book: String,
    pub has_explanation: bool,
}

/// Indicates which stage of the pipeline produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    Lexical,
    Semantic,
    Hybrid,
    Exact,
}

impl RetrievalSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
            Self::Exact => "exact",
        }
    }
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry of an engine's ranked list. `score` is engine-specific but
/// higher is always better.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: Arc<VerseRecord>,
    pub score: f32,
}

impl ScoredRecord {
    pub fn new(record: Arc<VerseRecord>, score: f32) -> Self {
        Self { record, score }
    }

    pub fn chunk_id(&self) -> ChunkId {
        self.record.chunk_id
    }
}

/// Per-mode contribution to a merged score.
///
/// Scores are min-max normalized within their own list; ranks are 1-based,
/// and a record missing from a list carries `len + 1` and score 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionScore {
    pub lexical: f32,
    pub semantic: f32,
    pub rank_lexical: usize,
    pub rank_semantic: usize,
}

/// Typed result handed to callers of the retrieval facade.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub record: Arc<VerseRecord>,
    pub explanation: String,
    pub score: f32,
    pub retrieval_source: RetrievalSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<FusionScore>,
}

/// Catalogue entry for one poet: the odes attributed to them and how many
/// verses the corpus holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoetSummary {
    pub name: String,
    pub poems: Vec<String>,
    pub verse_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub records: usize,
    pub poets: usize,
    pub lexical_ready: bool,
    pub semantic_ready: bool,
}
