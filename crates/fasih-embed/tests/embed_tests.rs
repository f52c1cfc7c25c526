use fasih_core::config::EmbeddingSettings;
use fasih_embed::{get_default_embedder, FakeEmbedder};
use fasih_core::traits::Embedder;

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 384, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.id(), "fake:384");
    let texts = vec!["قفا نبك من ذكرى".to_string(), "قفا نبك من ذكرى".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim follows settings");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_ignores_diacritics() {
    let embedder = FakeEmbedder::new(256);
    let plain = embedder.embed_query("قفا نبك").unwrap();
    let vocalized = embedder.embed_query("قِفا نَبكِ").unwrap();
    assert!((cosine(&plain, &vocalized) - 1.0).abs() < 1e-5);
}

#[test]
fn shared_words_are_closer_than_unrelated_text() {
    let embedder = FakeEmbedder::new(512);
    let query = embedder.embed_query("أطلال الديار").unwrap();
    let passages = embedder
        .embed_passages(&["عفت الديار محلها فمقامها".to_string(), "ألا هبي بصحنك فاصبحينا".to_string()])
        .unwrap();
    assert!(cosine(&query, &passages[0]) > cosine(&query, &passages[1]));
}
