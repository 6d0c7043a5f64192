//! Exact in-process vector index with the same lifecycle rules as the Lance
//! backend.

use async_trait::async_trait;
use tokio::sync::RwLock;

use coldata_core::traits::VectorIndex;
use coldata_core::types::{IndexSpec, ScoredChunk, SearchParams, MAX_CHUNK_ID_LEN};
use coldata_core::{Error, Result};

struct Collection {
    spec: IndexSpec,
    rows: Vec<(String, Vec<f32>)>,
    pending: Vec<(String, Vec<f32>)>,
    loaded: bool,
}

pub struct MemoryVectorIndex {
    name: String,
    collection: RwLock<Option<Collection>>,
}

impl MemoryVectorIndex {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), collection: RwLock::new(None) } }

    fn missing(&self) -> Error { Error::CollectionMissing(self.name.clone()) }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn collection_name(&self) -> &str { &self.name }

    async fn create_or_replace(&self, spec: &IndexSpec, renew: bool) -> Result<()> {
        let mut guard = self.collection.write().await;
        match guard.as_mut() {
            Some(existing) if !renew => {
                if existing.spec.dimension != spec.dimension {
                    return Err(Error::InvalidConfig(format!(
                        "collection '{}' stores {}-d vectors but the embedder produces {}-d",
                        self.name, existing.spec.dimension, spec.dimension
                    )));
                }
                existing.spec = spec.clone();
                existing.loaded = false;
            }
            _ => {
                *guard = Some(Collection { spec: spec.clone(), rows: Vec::new(), pending: Vec::new(), loaded: false });
            }
        }
        Ok(())
    }

    async fn exists(&self) -> Result<bool> { Ok(self.collection.read().await.is_some()) }

    async fn drop_collection(&self) -> Result<()> {
        *self.collection.write().await = None;
        Ok(())
    }

    async fn insert(&self, chunk_ids: &[String], vectors: &[Vec<f32>]) -> Result<()> {
        let mut guard = self.collection.write().await;
        let coll = guard.as_mut().ok_or_else(|| self.missing())?;
        if chunk_ids.len() != vectors.len() {
            return Err(Error::LengthMismatch { ids: chunk_ids.len(), vectors: vectors.len() });
        }
        let dim = coll.spec.dimension;
        for (id, v) in chunk_ids.iter().zip(vectors) {
            if id.chars().count() > MAX_CHUNK_ID_LEN {
                return Err(Error::ChunkIdTooLong { chunk_id: id.clone(), max: MAX_CHUNK_ID_LEN });
            }
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len(), chunk_id: id.clone() });
            }
        }
        coll.pending.extend(chunk_ids.iter().cloned().zip(vectors.iter().cloned()));
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let mut guard = self.collection.write().await;
        let coll = guard.as_mut().ok_or_else(|| self.missing())?;
        let pending = std::mem::take(&mut coll.pending);
        for (id, vector) in pending {
            match coll.rows.iter_mut().find(|(existing, _)| *existing == id) {
                Some(row) => row.1 = vector,
                None => coll.rows.push((id, vector)),
            }
        }
        Ok(())
    }

    async fn build_ann_index(&self) -> Result<()> {
        // exact search only
        if self.collection.read().await.is_none() {
            return Err(self.missing());
        }
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        let mut guard = self.collection.write().await;
        guard.as_mut().ok_or_else(|| self.missing())?.loaded = true;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        if let Some(coll) = self.collection.write().await.as_mut() {
            coll.loaded = false;
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.collection.read().await;
        Ok(guard.as_ref().ok_or_else(|| self.missing())?.rows.len())
    }

    async fn search(&self, queries: &[Vec<f32>], k: usize, _params: &SearchParams) -> Result<Vec<Vec<ScoredChunk>>> {
        let guard = self.collection.read().await;
        let coll = guard.as_ref().ok_or_else(|| self.missing())?;
        if !coll.loaded {
            return Err(Error::NotLoaded(self.name.clone()));
        }
        let metric = coll.spec.metric;
        let mut out = Vec::with_capacity(queries.len());
        for (qi, q) in queries.iter().enumerate() {
            if q.len() != coll.spec.dimension {
                return Err(Error::DimensionMismatch {
                    expected: coll.spec.dimension,
                    actual: q.len(),
                    chunk_id: format!("<query {qi}>"),
                });
            }
            let mut hits: Vec<ScoredChunk> = coll
                .rows
                .iter()
                .map(|(id, v)| ScoredChunk { chunk_id: id.clone(), score: metric.score(q, v) })
                .collect();
            hits.sort_by(|a, b| metric.rank(a.score, b.score));
            hits.truncate(k);
            out.push(hits);
        }
        Ok(out)
    }
}
