//! fasih-vector
//!
//! Dense verse retrieval on LanceDB: schema, table housekeeping, the batched
//! embedding writer, cosine search and the versioned on-disk layout.

pub mod schema;
pub mod search;
pub mod table;
pub mod versions;
pub mod writer;

pub use search::{corpus_fingerprint, relevance_from_distance, SemanticIndex};
pub use versions::prune_versions;
pub use writer::VerseWriter;
