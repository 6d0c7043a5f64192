use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{Filter, IndexSpec, Record, ScoredChunk, SearchParams};

/// Maps text to fixed-size dense vectors.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model behind this embedder.
    fn embedder_id(&self) -> &str;
    /// Output dimensionality, known before any call to `embed_batch`.
    fn dim(&self) -> usize;
    /// Maximum token length fed to the model.
    fn max_len(&self) -> usize;
    /// Whether every returned vector is L2-normalized.
    fn normalized(&self) -> bool;
    /// One vector per input text, in input order. Empty input yields empty output.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Chunk-level vector collection.
///
/// `create_or_replace` must complete before any other call touches the
/// collection. Scores returned by `search` follow the metric of the `IndexSpec` the
/// collection was created with.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn collection_name(&self) -> &str;
    async fn create_or_replace(&self, spec: &IndexSpec, renew: bool) -> Result<()>;
    /// Whether the collection is present, without creating it.
    async fn exists(&self) -> Result<bool>;
    async fn drop_collection(&self) -> Result<()>;
    async fn insert(&self, chunk_ids: &[String], vectors: &[Vec<f32>]) -> Result<()>;
    async fn flush(&self) -> Result<()>;
    /// Train the configured ANN index over the flushed contents.
    async fn build_ann_index(&self) -> Result<()>;
    async fn load(&self) -> Result<()>;
    async fn release(&self) -> Result<()>;
    async fn count(&self) -> Result<usize>;
    async fn search(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<Vec<ScoredChunk>>>;
}

/// Key-indexed record collection fed by the website adapters.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Matching records in a stable order (insertion order where the engine has one).
    async fn find(&self, filter: &Filter) -> Result<BoxStream<'static, Result<Record>>>;
    async fn find_one(&self, filter: &Filter) -> Result<Option<Record>>;
    async fn count(&self) -> Result<usize>;
    /// Returns `false` when a record with the same index already exists.
    async fn insert_if_absent(&self, record: &Record) -> Result<bool>;
}
