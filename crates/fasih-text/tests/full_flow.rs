use std::path::PathBuf;

use fasih_core::normalize::ArabicNormalizer;
use fasih_core::types::VerseRecord;
use fasih_core::{Corpus, Error};
use fasih_text::LexicalIndex;

fn fixture_corpus() -> Corpus {
    // crates/fasih-text -> crates -> repo root
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf();
    Corpus::load(&root.join("test_data/corpus.json")).expect("fixture corpus")
}

fn built(corpus: &Corpus) -> LexicalIndex {
    let mut index = LexicalIndex::new(ArabicNormalizer::default());
    let count = index.build(corpus).expect("build");
    assert_eq!(count, corpus.len());
    index
}

fn verse(id: u64, text: &str) -> VerseRecord {
    VerseRecord {
        chunk_id: id,
        verse_text: text.to_string(),
        explanation: String::new(),
        combined_text: String::new(),
        poet_name: "لبيد بن ربيعة".to_string(),
        poem_name: "معلقة لبيد بن ربيعة".to_string(),
        verse_number: id as u32,
        source_book: String::new(),
        has_explanation: false,
    }
}

#[test]
fn fragment_ranks_record_with_both_words_first() {
    let corpus = fixture_corpus();
    let index = built(&corpus);
    let results = index.search("أطلال منزل", 5, 0.0).expect("search");
    assert_eq!(results.len(), 5);
    assert_eq!(results[0].chunk_id(), 1);
    assert_eq!(results[1].chunk_id(), 3);
    assert!(results[0].score > results[1].score);
    assert!(results[1].score > 0.0);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn non_matching_records_pad_with_zero_in_corpus_order() {
    let corpus = fixture_corpus();
    let index = built(&corpus);
    let results = index.search("أطلال منزل", 9, 0.0).expect("search");
    let padding: Vec<u64> = results[2..].iter().map(|r| r.chunk_id()).collect();
    assert_eq!(padding, vec![2, 4, 5, 6, 7, 8, 9]);
    assert!(results[2..].iter().all(|r| r.score == 0.0));
}

#[test]
fn threshold_filters_every_result() {
    let corpus = fixture_corpus();
    let index = built(&corpus);
    let results = index.search("الديار", 9, 0.1).expect("search");
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.score >= 0.1));

    let none = index.search("حاسوب شبكة", 5, 0.1).expect("search");
    assert!(none.is_empty());
}

#[test]
fn more_occurrences_do_not_lower_the_score() {
    let corpus = Corpus::from_records(vec![
        verse(1, "نبك حبيب منزل"),
        verse(2, "نبك نبك منزل"),
        verse(3, "عفت الديار محلها"),
    ])
    .unwrap();
    let index = built(&corpus);
    let results = index.search("نبك", 3, 0.0).expect("search");
    assert_eq!(results[0].chunk_id(), 2);
    assert_eq!(results[1].chunk_id(), 1);
    assert!(results[0].score >= results[1].score);
}

#[test]
fn exact_match_ignores_diacritics_and_hamza() {
    let corpus = fixture_corpus();
    let index = built(&corpus);
    let hit = index
        .exact_match("قفا نبك من ذكرى حبيب ومنزل")
        .expect("exact")
        .expect("verse found");
    assert_eq!(hit.chunk_id(), 1);
    assert_eq!(hit.score, 1.0);
    assert_eq!(hit.record.poet_name, "امرؤ القيس");

    let second_hemistich = index.exact_match("بسقط اللوى بين الدخول").expect("exact");
    assert_eq!(second_hemistich.map(|h| h.chunk_id()), Some(1));

    let hamza = index.exact_match("امن ام اوفى دمنة").expect("exact");
    assert_eq!(hamza.map(|h| h.chunk_id()), Some(4));
}

#[test]
fn exact_match_misses_are_none() {
    let corpus = fixture_corpus();
    let index = built(&corpus);
    assert!(index.exact_match("قصيدة لا وجود لها").expect("exact").is_none());
    assert!(index.exact_match("   ...  ").expect("exact").is_none());
    // commentary text is not part of the verse
    assert!(index.exact_match("يخاطب الشاعر صاحبيه").expect("exact").is_none());
}

#[test]
fn search_before_build_is_not_initialized() {
    let index = LexicalIndex::default();
    assert!(!index.is_ready());
    let err = index.search("قفا", 5, 0.0).expect_err("unbuilt");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotInitialized(_))));
    let err = index.exact_match("قفا").expect_err("unbuilt");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotInitialized(_))));
}

#[test]
fn empty_corpus_builds_and_finds_nothing() {
    let corpus = Corpus::from_records(Vec::new()).unwrap();
    let index = built(&corpus);
    assert!(index.is_ready());
    assert!(index.search("قفا", 5, 0.0).expect("search").is_empty());
    assert!(index.exact_match("قفا").expect("exact").is_none());
}

#[test]
fn rebuild_replaces_previous_state() {
    let mut index = built(&fixture_corpus());
    let small = Corpus::from_records(vec![verse(42, "عفت الديار محلها فمقامها")]).unwrap();
    assert_eq!(index.build(&small).expect("rebuild"), 1);
    assert_eq!(index.len(), 1);
    let results = index.search("قفا", 5, 0.0).expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_id(), 42);
}
