use anyhow::Result;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{TantivyDocument, Term};

use fasih_core::error::Error;
use fasih_core::normalize::strip_ellipsis;
use fasih_core::types::ScoredRecord;

use crate::index::{LexicalIndex, LexicalState};

/// Score of an exact verse hit.
pub const EXACT_MATCH_SCORE: f32 = 1.0;

impl LexicalIndex {
	fn state(&self) -> Result<&LexicalState> {
		self.state
			.as_ref()
			.ok_or_else(|| Error::NotInitialized("lexical").into())
	}

	/// BM25 top-`k` over the whole corpus.
	///
	/// Every record gets a score (0 when no query term occurs in it), so with a
	/// non-positive `score_threshold` the result is padded with non-matching
	/// records in corpus order. Ties keep corpus order.
	pub fn search(&self, query: &str, k: usize, score_threshold: f32) -> Result<Vec<ScoredRecord>> {
		let state = self.state()?;
		let total = state.records.len();
		if k == 0 || total == 0 {
			return Ok(Vec::new());
		}

		let mut scores = vec![0.0f32; total];
		let normalized = self.normalizer.normalize(query);
		let terms = state.query_terms(&normalized)?;
		if !terms.is_empty() {
			let clauses: Vec<(Occur, Box<dyn Query>)> = terms
				.into_iter()
				.map(|term| {
					let q: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
					(Occur::Should, q)
				})
				.collect();
			let query = BooleanQuery::new(clauses);
			let searcher = state.reader.searcher();
			let top_docs = searcher.search(&query, &TopDocs::with_limit(total))?;
			for (score, address) in top_docs {
				let doc: TantivyDocument = searcher.doc(address)?;
				let position = doc
					.get_first(state.position_field)
					.and_then(|v| v.as_u64())
					.ok_or_else(|| Error::Index("document without position".to_string()))?;
				if let Some(slot) = scores.get_mut(position as usize) {
					*slot = score;
				}
			}
		}

		let mut ranked: Vec<usize> = (0..total).filter(|&i| scores[i] >= score_threshold).collect();
		ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
		ranked.truncate(k);
		tracing::debug!(query = %normalized, hits = ranked.len(), "lexical search");
		Ok(ranked
			.into_iter()
			.map(|i| ScoredRecord::new(state.records[i].clone(), scores[i]))
			.collect())
	}

	/// First record, in corpus order, whose normalized verse contains the
	/// normalized query.
	pub fn exact_match(&self, query: &str) -> Result<Option<ScoredRecord>> {
		let state = self.state()?;
		let needle = strip_ellipsis(&self.normalizer.normalize(query));
		if needle.is_empty() {
			return Ok(None);
		}
		let hit = state
			.verse_keys
			.iter()
			.position(|verse| !verse.is_empty() && verse.contains(&needle))
			.map(|i| ScoredRecord::new(state.records[i].clone(), EXACT_MATCH_SCORE));
		if let Some(hit) = &hit {
			tracing::debug!(chunk_id = hit.chunk_id(), "exact verse match");
		}
		Ok(hit)
	}
}

impl LexicalState {
	/// Tokens of an already normalized query, through the body field's analyzer.
	fn query_terms(&self, normalized: &str) -> Result<Vec<Term>> {
		let mut analyzer = self.index.tokenizer_for_field(self.body_field)?;
		let mut terms = Vec::new();
		let mut stream = analyzer.token_stream(normalized);
		stream.process(&mut |token| terms.push(Term::from_field_text(self.body_field, &token.text)));
		Ok(terms)
	}
}
