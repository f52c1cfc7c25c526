//! Verse corpus loading.
//!
//! The corpus is a JSON array produced by the ingestion step. Each entry keeps
//! the combined display text (`البيت: ...\n\nالشرح: ...`) alongside the bare
//! verse and its attribution. Loading validates identity invariants and fails
//! with a descriptive error; there is no partial corpus.

use anyhow::Result;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::types::{ChunkId, PoetSummary, VerseRecord};

/// Label separating the verse from its commentary in the combined text.
pub const EXPLANATION_DELIMITER: &str = "الشرح:";

/// Minimum commentary length for an entry to count as explained, used when
/// the corpus does not carry the flag itself.
const MIN_EXPLANATION_CHARS: usize = 20;

#[derive(Debug, Deserialize)]
struct RawChunk {
    chunk_id: ChunkId,
    #[serde(default)]
    text: String,
    #[serde(default)]
    verse_text: String,
    #[serde(default)]
    verse_number: Option<u32>,
    #[serde(default)]
    poet_name: String,
    #[serde(default)]
    poem_name: String,
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSource {
    #[serde(default)]
    book: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    has_explanation: Option<bool>,
}

/// Text after the commentary label, or the whole combined text when the
/// label is absent.
pub fn extract_explanation(combined_text: &str) -> String {
    match combined_text.split_once(EXPLANATION_DELIMITER) {
        Some((_, explanation)) => explanation.trim().to_string(),
        None => combined_text.to_string(),
    }
}

impl From<RawChunk> for VerseRecord {
    fn from(raw: RawChunk) -> Self {
        let explanation = extract_explanation(&raw.text);
        let has_explanation = raw
            .metadata
            .and_then(|m| m.has_explanation)
            .unwrap_or_else(|| explanation.chars().count() > MIN_EXPLANATION_CHARS);
        Self {
            chunk_id: raw.chunk_id,
            verse_text: raw.verse_text,
            explanation,
            combined_text: raw.text,
            poet_name: raw.poet_name.trim().to_string(),
            poem_name: raw.poem_name.trim().to_string(),
            verse_number: raw.verse_number.unwrap_or(0),
            source_book: raw.source.map(|s| s.book).unwrap_or_default(),
            has_explanation,
        }
    }
}

/// The immutable verse collection every index is derived from.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<Arc<VerseRecord>>,
    by_id: HashMap<ChunkId, usize>,
}

impl Corpus {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| Error::CorpusRead {
            path: path.to_path_buf(),
            source,
        })?;
        let chunks: Vec<RawChunk> =
            serde_json::from_str(&raw).map_err(|source| Error::CorpusParse {
                path: path.to_path_buf(),
                source,
            })?;
        let corpus = Self::from_records(chunks.into_iter().map(VerseRecord::from).collect())?;
        tracing::info!(path = %path.display(), records = corpus.len(), "corpus loaded");
        Ok(corpus)
    }

    pub fn from_records(records: Vec<VerseRecord>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut shared = Vec::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            if record.poet_name.is_empty() {
                return Err(Error::InvalidCorpus(format!(
                    "chunk {} has no poet_name",
                    record.chunk_id
                ))
                .into());
            }
            if by_id.insert(record.chunk_id, position).is_some() {
                return Err(Error::InvalidCorpus(format!(
                    "duplicate chunk_id {}",
                    record.chunk_id
                ))
                .into());
            }
            if record.verse_text.trim().is_empty() {
                tracing::debug!(chunk_id = record.chunk_id, "record without verse_text");
            }
            shared.push(Arc::new(record));
        }
        Ok(Self { records: shared, by_id })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Arc<VerseRecord>] {
        &self.records
    }

    pub fn get(&self, chunk_id: ChunkId) -> Option<&Arc<VerseRecord>> {
        self.by_id.get(&chunk_id).map(|&i| &self.records[i])
    }

    /// Corpus position of a chunk, i.e. its insertion order.
    pub fn position(&self, chunk_id: ChunkId) -> Option<usize> {
        self.by_id.get(&chunk_id).copied()
    }

    /// Poets in order of first appearance with their odes and verse counts.
    pub fn poets(&self) -> Vec<PoetSummary> {
        let mut order: Vec<PoetSummary> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut seen_poems: HashSet<(&str, &str)> = HashSet::new();
        for record in &self.records {
            let slot = *index.entry(record.poet_name.as_str()).or_insert_with(|| {
                order.push(PoetSummary {
                    name: record.poet_name.clone(),
                    poems: Vec::new(),
                    verse_count: 0,
                });
                order.len() - 1
            });
            let summary = &mut order[slot];
            summary.verse_count += 1;
            if !record.poem_name.is_empty()
                && seen_poems.insert((record.poet_name.as_str(), record.poem_name.as_str()))
            {
                summary.poems.push(record.poem_name.clone());
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: ChunkId, poet: &str) -> VerseRecord {
        VerseRecord {
            chunk_id: id,
            verse_text: format!("بيت {id}"),
            explanation: String::new(),
            combined_text: format!("البيت: بيت {id}"),
            poet_name: poet.to_string(),
            poem_name: format!("معلقة {poet}"),
            verse_number: 1,
            source_book: String::new(),
            has_explanation: false,
        }
    }

    #[test]
    fn explanation_follows_the_delimiter() {
        let text = "البيت: قفا نبك\n\nالشرح: يخاطب صاحبيه ";
        assert_eq!(extract_explanation(text), "يخاطب صاحبيه");
    }

    #[test]
    fn explanation_without_delimiter_is_the_whole_text() {
        assert_eq!(extract_explanation("نص بلا تسمية"), "نص بلا تسمية");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Corpus::from_records(vec![record(1, "طرفة"), record(1, "لبيد")])
            .expect_err("duplicate");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidCorpus(_))
        ));
    }

    #[test]
    fn records_need_a_poet() {
        assert!(Corpus::from_records(vec![record(1, "  ".trim())]).is_err());
    }

    #[test]
    fn poets_keep_first_appearance_order() {
        let corpus = Corpus::from_records(vec![
            record(1, "لبيد"),
            record(2, "طرفة"),
            record(3, "لبيد"),
        ])
        .expect("corpus");
        let poets = corpus.poets();
        assert_eq!(poets.len(), 2);
        assert_eq!(poets[0].name, "لبيد");
        assert_eq!(poets[0].verse_count, 2);
        assert_eq!(poets[0].poems, vec!["معلقة لبيد".to_string()]);
        assert_eq!(poets[1].verse_count, 1);
        assert_eq!(corpus.position(3), Some(2));
    }
}
