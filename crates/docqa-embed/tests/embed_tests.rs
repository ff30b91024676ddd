use docqa_core::config::EmbeddingSettings;
use docqa_core::mmr::cosine_similarity;
use docqa_core::traits::Embedder;
use docqa_embed::{load_embedding, FakeEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, ..EmbeddingSettings::default() };
    let backend = load_embedding(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = backend.embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_ranks_shared_words_higher() {
    let e = FakeEmbedder::new(256);
    let q = e.embed("Which sourdough starter?").unwrap();
    let related = e.embed("A sourdough starter needs flour and water.").unwrap();
    let unrelated = e.embed("Aurora borealis over the fjord.").unwrap();
    assert!(cosine_similarity(&q, &related) > cosine_similarity(&q, &unrelated));
}

/// Needs real weights: `APP_MODEL_DIR=/path/to/model cargo test -p docqa-embed -- --ignored`
#[ignore]
#[test]
fn bert_embedder_is_normalized() {
    let backend = load_embedding(&EmbeddingSettings::default()).expect("model");
    let v = backend.embedder.embed("hello world").expect("embed");
    assert_eq!(v.len(), backend.embedder.dim());
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3);
    assert!(backend.counter.count_tokens("hello world") >= 2);
}
