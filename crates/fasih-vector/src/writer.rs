use anyhow::{ensure, Context, Result};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array, UInt64Array};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::sync::Arc;

use fasih_core::error::Error;
use fasih_core::traits::Embedder;
use fasih_core::types::VerseRecord;

use crate::schema::{build_verses_schema, VERSES_TABLE};
use crate::table::create_table;

pub struct VerseWriter<'a> {
	db: &'a Connection,
	embedder: &'a dyn Embedder,
	batch_size: usize,
}

impl<'a> VerseWriter<'a> {
	pub fn new(db: &'a Connection, embedder: &'a dyn Embedder, batch_size: usize) -> Self {
		Self { db, embedder, batch_size: batch_size.max(1) }
	}

	/// Embed every record's combined text as a passage and store it in the
	/// verses table, in corpus order. Returns the number of rows written.
	pub async fn write(&self, records: &[Arc<VerseRecord>]) -> Result<usize> {
		let dim = i32::try_from(self.embedder.dim()).context("embedding dimension out of range")?;
		if records.is_empty() {
			tracing::info!("no verses to embed; creating empty table");
			create_table(self.db, VERSES_TABLE, build_verses_schema(dim), Vec::new()).await?;
			return Ok(0);
		}

		tracing::info!(records = records.len(), table = VERSES_TABLE, embedder = self.embedder.id(), "embedding verses");
		let pb = ProgressBar::new(records.len() as u64);
		pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} verses ({percent}%) {msg}")?.progress_chars("#>-"));
		let mut written = 0usize;
		for (batch_no, chunk) in records.chunks(self.batch_size).enumerate() {
			let passages: Vec<String> = chunk.iter().map(|r| r.combined_text.clone()).collect();
			let vectors = self
				.embedder
				.embed_passages(&passages)
				.map_err(|e| Error::Embedding(e.to_string()))?;
			ensure!(vectors.len() == chunk.len(), Error::Embedding(format!("expected {} vectors, got {}", chunk.len(), vectors.len())));
			let batch = to_record_batch(chunk, written, &vectors, dim)?;
			self.insert_batch(batch, dim, batch_no == 0).await?;
			written += chunk.len();
			pb.set_position(written as u64);
			pb.set_message(format!("batch {}", batch_no + 1));
		}
		pb.finish_with_message("done");
		tracing::info!(written, "semantic index written");
		Ok(written)
	}

	async fn insert_batch(&self, batch: RecordBatch, dim: i32, first: bool) -> Result<()> {
		if first {
			return create_table(self.db, VERSES_TABLE, build_verses_schema(dim), vec![batch]).await;
		}
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), build_verses_schema(dim)));
		self.db.open_table(VERSES_TABLE).execute().await?.add(reader).execute().await?;
		Ok(())
	}
}

fn to_record_batch(records: &[Arc<VerseRecord>], offset: usize, vectors: &[Vec<f32>], dim: i32) -> Result<RecordBatch> {
	let mut chunk_ids = Vec::with_capacity(records.len());
	let mut positions = Vec::with_capacity(records.len());
	let mut contents = Vec::with_capacity(records.len());
	let mut rows: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
	for (i, (record, vector)) in records.iter().zip(vectors).enumerate() {
		ensure!(vector.len() == dim as usize, Error::Embedding(format!("chunk {} has dimension {}, expected {dim}", record.chunk_id, vector.len())));
		chunk_ids.push(record.chunk_id);
		positions.push((offset + i) as u32);
		contents.push(record.combined_text.as_str());
		rows.push(Some(vector.iter().map(|&x| Some(x)).collect()));
	}
	let record_batch = RecordBatch::try_new(build_verses_schema(dim), vec![
		Arc::new(UInt64Array::from(chunk_ids)),
		Arc::new(UInt32Array::from(positions)),
		Arc::new(StringArray::from(contents)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(rows.into_iter(), dim)),
	])?;
	Ok(record_batch)
}
