use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

/// Analyzer name for verse bodies. Text reaching it is already normalized,
/// so splitting on whitespace and lowercasing Latin residue is all it does.
pub const VERSE_TOKENIZER: &str = "verse_whitespace";

pub const POSITION_FIELD: &str = "position";
pub const CHUNK_ID_FIELD: &str = "chunk_id";
pub const BODY_FIELD: &str = "body";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_u64_field(POSITION_FIELD, STORED);
	schema_builder.add_u64_field(CHUNK_ID_FIELD, STORED);
	let body_indexing = TextFieldIndexing::default()
		.set_tokenizer(VERSE_TOKENIZER)
		.set_index_option(IndexRecordOption::WithFreqs);
	schema_builder.add_text_field(BODY_FIELD, TextOptions::default().set_indexing_options(body_indexing));
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(WhitespaceTokenizer::default())
		.filter(LowerCaser)
		.build();
	index.tokenizers().register(VERSE_TOKENIZER, tokenizer);
}
