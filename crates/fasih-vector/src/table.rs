//! LanceDB connection and housekeeping helpers.
//!
//! Opens the database, creates tables, and keeps a small key/value `meta`
//! table describing how the stored vectors were produced.
use anyhow::Result;
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::{build_meta_schema, META_TABLE};

pub const META_EMBEDDER_ID: &str = "embedder_id";
pub const META_DIM: &str = "dim";
pub const META_CORPUS_HASH: &str = "corpus_hash";
pub const META_RECORDS: &str = "records";

pub async fn open_db(uri: &str) -> Result<Connection> {
	Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	let names = conn.table_names().execute().await?;
	Ok(names.iter().any(|n| n == name))
}

/// Create `name` with the given rows; an empty `batches` creates an empty table.
pub async fn create_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>, batches: Vec<RecordBatch>) -> Result<()> {
	let iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
	conn.create_table(name, Box::new(iter)).execute().await?;
	Ok(())
}

/// Write all metadata entries in one go. The table is created on first use.
pub async fn write_meta(conn: &Connection, entries: &[(&str, String)]) -> Result<()> {
	let now = Utc::now().timestamp_millis();
	let rb = RecordBatch::try_new(
		build_meta_schema(),
		vec![
			Arc::new(StringArray::from_iter_values(entries.iter().map(|(k, _)| *k))),
			Arc::new(StringArray::from_iter_values(entries.iter().map(|(_, v)| v.as_str()))),
			Arc::new(TimestampMillisecondArray::from(vec![now; entries.len()])),
		],
	)?;
	if table_exists(conn, META_TABLE).await? {
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
		conn.open_table(META_TABLE).execute().await?.add(reader).execute().await?;
	} else {
		create_table(conn, META_TABLE, build_meta_schema(), vec![rb]).await?;
	}
	Ok(())
}

/// All metadata entries; later rows win for repeated keys.
pub async fn read_meta(conn: &Connection) -> Result<HashMap<String, String>> {
	let mut meta = HashMap::new();
	if !table_exists(conn, META_TABLE).await? {
		return Ok(meta);
	}
	let t = conn.open_table(META_TABLE).execute().await?;
	let mut stream = t.query().execute().await?;
	while let Some(batch) = stream.try_next().await? {
		let keys = batch.column_by_name("key").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow::anyhow!("meta.key column missing"))?;
		let values = batch.column_by_name("value").and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow::anyhow!("meta.value column missing"))?;
		for i in 0..batch.num_rows() {
			meta.insert(keys.value(i).to_string(), values.value(i).to_string());
		}
	}
	Ok(meta)
}
