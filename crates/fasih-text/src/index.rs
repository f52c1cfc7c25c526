use anyhow::{Context, Result};
use std::sync::Arc;
use tantivy::schema::Field;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy};

use fasih_core::normalize::{strip_ellipsis, ArabicNormalizer};
use fasih_core::types::VerseRecord;
use fasih_core::Corpus;

use crate::tantivy_utils::{build_schema, register_tokenizer, BODY_FIELD, CHUNK_ID_FIELD, POSITION_FIELD};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Built state of the lexical index. Replaced as a whole on rebuild.
pub(crate) struct LexicalState {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	pub(crate) body_field: Field,
	pub(crate) position_field: Field,
	pub(crate) records: Vec<Arc<VerseRecord>>,
	/// Normalized verse text per corpus position, ellipsis stripped.
	pub(crate) verse_keys: Vec<String>,
}

pub struct LexicalIndex {
	pub(crate) normalizer: ArabicNormalizer,
	pub(crate) state: Option<LexicalState>,
}

impl Default for LexicalIndex {
	fn default() -> Self {
		Self::new(ArabicNormalizer::default())
	}
}

impl LexicalIndex {
	/// An unbuilt index; queries fail with `NotInitialized` until [`LexicalIndex::build`].
	pub fn new(normalizer: ArabicNormalizer) -> Self {
		Self { normalizer, state: None }
	}

	pub fn is_ready(&self) -> bool {
		self.state.is_some()
	}

	pub fn len(&self) -> usize {
		self.state.as_ref().map_or(0, |s| s.records.len())
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Index every record of `corpus` and return how many were indexed.
	pub fn build(&mut self, corpus: &Corpus) -> Result<usize> {
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let position_field = schema.get_field(POSITION_FIELD)?;
		let chunk_id_field = schema.get_field(CHUNK_ID_FIELD)?;
		let body_field = schema.get_field(BODY_FIELD)?;

		let mut index_writer: IndexWriter = index
			.writer_with_num_threads(1, WRITER_MEMORY_BYTES)
			.context("creating tantivy writer")?;
		let mut verse_keys = Vec::with_capacity(corpus.len());
		for (position, record) in corpus.records().iter().enumerate() {
			let body = self
				.normalizer
				.normalize(&format!("{} {}", record.verse_text, record.combined_text));
			index_writer.add_document(doc!(
				position_field => position as u64,
				chunk_id_field => record.chunk_id,
				body_field => body,
			))?;
			verse_keys.push(strip_ellipsis(&self.normalizer.normalize(&record.verse_text)));
		}
		index_writer.commit().context("committing lexical index")?;

		let reader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()?;
		let count = corpus.len();
		self.state = Some(LexicalState {
			index,
			reader,
			body_field,
			position_field,
			records: corpus.records().to_vec(),
			verse_keys,
		});
		tracing::info!(records = count, "lexical index built");
		Ok(count)
	}
}
