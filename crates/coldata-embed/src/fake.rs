use std::hash::{Hash, Hasher};

use coldata_core::traits::Embedder;
use twox_hash::XxHash64;

/// Deterministic bag-of-words embedder for tests and offline runs.
///
/// Texts sharing tokens share buckets, so similar texts score higher.
pub struct HashEmbedder {
    id: String,
    dim: usize,
    normalize: bool,
}

impl HashEmbedder {
    pub fn new(dim: usize, normalize: bool) -> Self {
        Self { id: format!("hash-{dim}"), dim: dim.max(1), normalize }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 1.0 + val + (i % 3) as f32 * 0.01;
        }
        if self.normalize {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn normalized(&self) -> bool { self.normalize }

    fn embed_batch(&self, texts: &[String]) -> coldata_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
