use anyhow::Result;
use arrow_array::{Float32Array, UInt32Array, UInt64Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fasih_core::error::Error;
use fasih_core::traits::{Embedder, SemanticOutcome, SemanticSearch};
use fasih_core::types::{ChunkId, ScoredRecord, VerseRecord};
use fasih_core::Corpus;

use crate::schema::VERSES_TABLE;
use crate::table::{open_db, read_meta, table_exists, write_meta, META_CORPUS_HASH, META_DIM, META_EMBEDDER_ID, META_RECORDS};
use crate::versions::{create_version_dir, current_version, prepare_index_dir, publish_version};
use crate::writer::VerseWriter;

/// Dense index over the corpus, persisted in LanceDB.
pub struct SemanticIndex {
	table: Table,
	embedder: Arc<dyn Embedder>,
	records: HashMap<ChunkId, Arc<VerseRecord>>,
	path: PathBuf,
}

/// Blake3 over ids and combined texts, in corpus order.
pub fn corpus_fingerprint(corpus: &Corpus) -> String {
	let mut hasher = blake3::Hasher::new();
	for record in corpus.records() {
		hasher.update(&record.chunk_id.to_le_bytes());
		hasher.update(record.combined_text.as_bytes());
	}
	hasher.finalize().to_hex().to_string()
}

/// Cosine distance in `[0, 2]` mapped onto a relevance in `[0, 1]`.
pub fn relevance_from_distance(distance: f32) -> f32 {
	(1.0 - distance / 2.0).clamp(0.0, 1.0)
}

impl SemanticIndex {
	/// Embed the whole corpus into a new version under `index_dir`, publish it
	/// and open it. Earlier versions stay on disk for retrievers still reading
	/// them; a failed build removes only its own partial version.
	pub async fn build(corpus: &Corpus, index_dir: &Path, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
		prepare_index_dir(index_dir)?;
		let version_dir = create_version_dir(index_dir)?;
		let built = Self::write_version(corpus, &version_dir, embedder, batch_size).await;
		match built {
			Ok(index) => {
				publish_version(index_dir, &version_dir)?;
				tracing::info!(version = %version_dir.display(), "semantic index published");
				Ok(index)
			}
			Err(e) => {
				if let Err(cleanup) = std::fs::remove_dir_all(&version_dir) {
					tracing::warn!(error = %cleanup, path = %version_dir.display(), "could not remove partial index");
				}
				Err(e)
			}
		}
	}

	async fn write_version(corpus: &Corpus, version_dir: &Path, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
		let db = open_db(&version_dir.to_string_lossy()).await?;
		let written = VerseWriter::new(&db, embedder.as_ref(), batch_size).write(corpus.records()).await?;
		write_meta(&db, &[
			(META_EMBEDDER_ID, embedder.id().to_string()),
			(META_DIM, embedder.dim().to_string()),
			(META_CORPUS_HASH, corpus_fingerprint(corpus)),
			(META_RECORDS, written.to_string()),
		]).await?;
		Self::open(db, corpus, version_dir, embedder).await
	}

	/// Open the published version written by [`SemanticIndex::build`] with the same embedder.
	pub async fn load(corpus: &Corpus, index_dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
		let version_dir = current_version(index_dir)?
			.ok_or_else(|| Error::VectorStore(format!("no semantic index at {}", index_dir.display())))?;
		let db = open_db(&version_dir.to_string_lossy()).await?;
		if !table_exists(&db, VERSES_TABLE).await? {
			return Err(Error::VectorStore(format!("table '{VERSES_TABLE}' missing in {}", version_dir.display())).into());
		}
		let meta = read_meta(&db).await?;
		let stored_id = meta.get(META_EMBEDDER_ID).map(String::as_str).unwrap_or_default();
		if stored_id != embedder.id() {
			return Err(Error::VectorStore(format!("index built with embedder '{stored_id}', configured '{}'", embedder.id())).into());
		}
		let stored_dim: usize = meta.get(META_DIM).and_then(|d| d.parse().ok()).unwrap_or_default();
		if stored_dim != embedder.dim() {
			return Err(Error::VectorStore(format!("index dimension {stored_dim} != embedder dimension {}", embedder.dim())).into());
		}
		if meta.get(META_CORPUS_HASH).map(String::as_str) != Some(corpus_fingerprint(corpus).as_str()) {
			tracing::warn!(path = %version_dir.display(), "semantic index was built from a different corpus; rebuild recommended");
		}
		Self::open(db, corpus, &version_dir, embedder).await
	}

	async fn open(db: Connection, corpus: &Corpus, index_dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
		let table = db.open_table(VERSES_TABLE).execute().await?;
		let records = corpus.records().iter().map(|r| (r.chunk_id, r.clone())).collect();
		tracing::info!(path = %index_dir.display(), embedder = embedder.id(), "semantic index ready");
		Ok(Self { table, embedder, records, path: index_dir.to_path_buf() })
	}

	/// Version directory this index reads from.
	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn embedder_id(&self) -> &str {
		self.embedder.id()
	}

	/// Nearest verses by cosine similarity, best first.
	pub async fn try_search(&self, query: &str, k: usize) -> Result<Vec<ScoredRecord>> {
		if k == 0 || self.records.is_empty() {
			return Ok(Vec::new());
		}
		let query_vector = self.embedder.embed_query(query).map_err(|e| Error::Embedding(e.to_string()))?;
		let mut stream = self
			.table
			.vector_search(query_vector)?
			.distance_type(DistanceType::Cosine)
			.select(Select::columns(&["chunk_id", "position"]))
			.limit(k)
			.execute()
			.await?;

		let mut ranked: Vec<(u32, ChunkId, f32)> = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			let ids = batch.column_by_name("chunk_id").and_then(|c| c.as_any().downcast_ref::<UInt64Array>()).ok_or_else(|| Error::VectorStore("chunk_id column missing".into()))?;
			let positions = batch.column_by_name("position").and_then(|c| c.as_any().downcast_ref::<UInt32Array>()).ok_or_else(|| Error::VectorStore("position column missing".into()))?;
			let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>()).ok_or_else(|| Error::VectorStore("_distance column missing".into()))?;
			for i in 0..batch.num_rows() {
				ranked.push((positions.value(i), ids.value(i), relevance_from_distance(distances.value(i))));
			}
		}
		ranked.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));

		let mut hits = Vec::with_capacity(ranked.len());
		for (_, chunk_id, relevance) in ranked.into_iter().take(k) {
			match self.records.get(&chunk_id) {
				Some(record) => hits.push(ScoredRecord::new(record.clone(), relevance)),
				None => tracing::warn!(chunk_id, "semantic hit not in corpus; dropped"),
			}
		}
		Ok(hits)
	}
}

impl SemanticSearch for SemanticIndex {
	async fn search(&self, query: &str, k: usize) -> SemanticOutcome {
		match self.try_search(query, k).await {
			Ok(hits) => {
				tracing::debug!(hits = hits.len(), "semantic search");
				SemanticOutcome::from_hits(hits)
			}
			Err(e) => {
				tracing::warn!(error = %e, "semantic search unavailable");
				SemanticOutcome::Unavailable(e.to_string())
			}
		}
	}
}
