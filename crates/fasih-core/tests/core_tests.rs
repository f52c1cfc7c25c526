use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use fasih_core::{Corpus, Error};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("workspace root")
        .join("test_data/corpus.json")
}

#[test]
fn load_fixture_corpus() {
    let corpus = Corpus::load(&fixture()).expect("load corpus");
    assert_eq!(corpus.len(), 9);

    let first = corpus.get(1).expect("first verse");
    assert_eq!(first.poet_name, "امرؤ القيس");
    assert_eq!(first.verse_number, 1);
    assert_eq!(first.source_book, "شرح المعلقات السبع للزوزني");
    assert!(first.explanation.starts_with("يخاطب الشاعر صاحبيه"));
    assert!(first.has_explanation);

    // verse_number null falls back to 0
    assert_eq!(corpus.get(8).expect("harith").verse_number, 0);
    assert_eq!(corpus.position(9), Some(8));
}

#[test]
fn explanation_is_whole_text_without_label() {
    let corpus = Corpus::load(&fixture()).expect("load corpus");
    let intro = corpus.get(9).expect("intro chunk");
    assert!(intro.verse_text.is_empty());
    assert_eq!(intro.explanation, intro.combined_text);
}

#[test]
fn poets_summary_counts_verses() {
    let corpus = Corpus::load(&fixture()).expect("load corpus");
    let poets = corpus.poets();
    assert_eq!(poets.len(), 7);
    assert_eq!(poets[0].name, "امرؤ القيس");
    assert_eq!(poets[0].verse_count, 3);
    assert_eq!(poets[0].poems, vec!["معلقة امرؤ القيس".to_string()]);
    assert!(poets.iter().all(|p| p.verse_count >= 1));
}

#[test]
fn missing_file_is_a_read_error() {
    let tmp = TempDir::new().unwrap();
    let err = Corpus::load(&tmp.path().join("nope.json")).expect_err("missing");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::CorpusRead { .. })));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.json");
    fs::write(&path, "[{\"chunk_id\": 1, ").unwrap();
    let err = Corpus::load(&path).expect_err("malformed");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::CorpusParse { .. })));
}

#[test]
fn empty_array_loads_as_empty_corpus() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.json");
    fs::write(&path, "[]").unwrap();
    let corpus = Corpus::load(&path).expect("empty corpus");
    assert!(corpus.is_empty());
    assert!(corpus.poets().is_empty());
}
