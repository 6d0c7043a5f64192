use coldata_core::config::ModelConfig;
use coldata_core::traits::Embedder;
use coldata_embed::{load_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb).max(1e-9)
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let config = ModelConfig { fake: true, fake_dim: 256, ..ModelConfig::default() };
    let embedder = load_embedder(&config).expect("embedder");
    assert_eq!(embedder.dim(), 256);
    assert!(embedder.normalized());

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), 256);

    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn empty_batch_yields_empty_output() {
    let embedder = HashEmbedder::new(32, true);
    assert!(embedder.embed_batch(&[]).unwrap().is_empty());
}

#[test]
fn shared_words_score_higher() {
    let embedder = HashEmbedder::new(512, true);
    let texts: Vec<String> = ["ocean salinity temperature", "ocean temperature buoys", "stock market prices"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let v = embedder.embed_batch(&texts).unwrap();
    assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
}

#[test]
fn unnormalized_mode_keeps_raw_counts() {
    let embedder = HashEmbedder::new(64, false);
    assert!(!embedder.normalized());
    let v = embedder.embed_batch(&["a a a a".to_string()]).unwrap();
    let norm: f32 = v[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!(norm > 1.5);
}

#[test]
fn missing_local_model_is_reported_as_unavailable() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = ModelConfig { model_name: dir.path().display().to_string(), ..ModelConfig::default() };
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() || std::env::var("APP_MODEL_DIR").is_ok() {
        return;
    }
    let err = load_embedder(&config).err().expect("empty model dir must fail");
    assert!(matches!(err, coldata_core::Error::ModelUnavailable(_)), "got {err}");
}
