//! Embedding providers: a candle transformer encoder with mean pooling and a
//! deterministic hashing embedder for tests.
//!
//! `APP_USE_FAKE_EMBEDDINGS=1` (or `model.fake = true`) selects the hashing
//! embedder without touching any model files.

pub mod device;
pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use fake::HashEmbedder;
pub use model::{resolve_model_dir, resolve_model_files, CandleEmbedder, ModelFiles};
pub use pool::{l2_normalize, masked_mean};
pub use tokenize::{tokenize_batch, TokenBatch};

use coldata_core::config::ModelConfig;
use coldata_core::traits::Embedder;

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the embedder described by `config`.
pub fn load_embedder(config: &ModelConfig) -> coldata_core::Result<Box<dyn Embedder>> {
    if config.fake || fake_requested() {
        tracing::info!(dim = config.fake_dim, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(config.fake_dim, config.normalize_embeddings)));
    }
    Ok(Box::new(CandleEmbedder::load(config)?))
}
