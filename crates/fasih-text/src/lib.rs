//! fasih-text
//!
//! In-memory BM25 index over the verse corpus (tantivy) and the normalized
//! substring check used for exact verse lookups. See `index` for building and
//! `search` for querying.

pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::LexicalIndex;
