//! Score fusion of the lexical and semantic ranked lists.
//!
//! Each list is min-max normalized on its own, then the two are combined by a
//! weighted sum blended with reciprocal rank fusion:
//!
//! `final = blend * (w_lex * lex + w_sem * sem) + (1 - blend) * rrf_scale * rrf`
//!
//! where `rrf = 1/(K + rank_lex) + 1/(K + rank_sem)` and a record absent from a
//! list takes rank `len + 1` and score 0 there.

use std::collections::HashMap;
use std::sync::Arc;

use fasih_core::config::RetrievalSettings;
use fasih_core::types::{ChunkId, FusionScore, ScoredRecord, VerseRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub rrf_k: f32,
    pub score_blend: f32,
    pub rrf_scale: f32,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self::from(&RetrievalSettings::default())
    }
}

impl From<&RetrievalSettings> for FusionParams {
    fn from(s: &RetrievalSettings) -> Self {
        Self {
            lexical_weight: s.lexical_weight,
            semantic_weight: s.semantic_weight,
            rrf_k: s.rrf_k,
            score_blend: s.score_blend,
            rrf_scale: s.rrf_scale,
        }
    }
}

impl FusionParams {
    /// Weights scaled to sum to 1. Falls back to an even split when both are 0.
    pub fn normalized_weights(&self) -> (f32, f32) {
        let total = self.lexical_weight + self.semantic_weight;
        if total > 0.0 {
            (self.lexical_weight / total, self.semantic_weight / total)
        } else {
            (0.5, 0.5)
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergedHit {
    pub record: Arc<VerseRecord>,
    pub score: f32,
    pub breakdown: FusionScore,
}

/// Min-max normalize to [0, 1]. Equal scores all become 1.0.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range == 0.0 {
        vec![1.0; scores.len()]
    } else {
        scores.iter().map(|s| (s - min) / range).collect()
    }
}

struct Entry {
    record: Arc<VerseRecord>,
    lexical: Option<(f32, usize)>,
    semantic: Option<(f32, usize)>,
}

#[derive(Debug, Clone, Default)]
pub struct HybridMerger {
    params: FusionParams,
}

impl HybridMerger {
    pub fn new(params: FusionParams) -> Self {
        Self { params }
    }

    pub fn merge(&self, lexical: &[ScoredRecord], semantic: &[ScoredRecord], k: usize) -> Vec<MergedHit> {
        let mut order: Vec<Entry> = Vec::with_capacity(lexical.len() + semantic.len());
        let mut slots: HashMap<ChunkId, usize> = HashMap::new();

        let lex_norm = min_max_normalize(&lexical.iter().map(|h| h.score).collect::<Vec<_>>());
        for (rank, (hit, score)) in lexical.iter().zip(lex_norm).enumerate() {
            if slots.contains_key(&hit.chunk_id()) {
                continue;
            }
            slots.insert(hit.chunk_id(), order.len());
            order.push(Entry { record: hit.record.clone(), lexical: Some((score, rank + 1)), semantic: None });
        }

        let sem_norm = min_max_normalize(&semantic.iter().map(|h| h.score).collect::<Vec<_>>());
        for (rank, (hit, score)) in semantic.iter().zip(sem_norm).enumerate() {
            match slots.get(&hit.chunk_id()) {
                Some(&slot) => {
                    let entry = &mut order[slot];
                    if entry.semantic.is_none() {
                        entry.semantic = Some((score, rank + 1));
                    }
                }
                None => {
                    slots.insert(hit.chunk_id(), order.len());
                    order.push(Entry { record: hit.record.clone(), lexical: None, semantic: Some((score, rank + 1)) });
                }
            }
        }

        let (w_lex, w_sem) = self.params.normalized_weights();
        let blend = self.params.score_blend;
        let mut merged: Vec<MergedHit> = order
            .into_iter()
            .map(|entry| {
                let (lex, rank_lex) = entry.lexical.unwrap_or((0.0, lexical.len() + 1));
                let (sem, rank_sem) = entry.semantic.unwrap_or((0.0, semantic.len() + 1));
                let weighted = w_lex * lex + w_sem * sem;
                let rrf = 1.0 / (self.params.rrf_k + rank_lex as f32) + 1.0 / (self.params.rrf_k + rank_sem as f32);
                let score = blend * weighted + (1.0 - blend) * (rrf * self.params.rrf_scale);
                MergedHit {
                    record: entry.record,
                    score,
                    breakdown: FusionScore { lexical: lex, semantic: sem, rank_lexical: rank_lex, rank_semantic: rank_sem },
                }
            })
            .collect();

        // stable: equal scores keep lexical-first insertion order
        merged.sort_by(|a, b| b.score.total_cmp(&a.score));
        merged.truncate(k);
        tracing::debug!(lexical = lexical.len(), semantic = semantic.len(), merged = merged.len(), "fused result lists");
        merged
    }
}
