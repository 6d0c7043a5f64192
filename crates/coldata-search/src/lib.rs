//! Index builder, query engine and the `Retriever` facade that wires them to
//! a configured embedder and vector index.

pub mod builder;
pub mod engine;

pub use builder::{IndexBuilder, UpdateOptions, UpdateReport};
pub use engine::{collapse_hits, QueryEngine};

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use coldata_core::chunker::TextChunker;
use coldata_core::config::Settings;
use coldata_core::traits::{DocumentStore, Embedder, VectorIndex};
use coldata_core::types::{IndexSpec, Metric, ResultSet};
use coldata_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub collection: String,
    pub records: usize,
    pub chunks: usize,
}

pub struct Retriever {
    settings: Settings,
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    chunker: TextChunker,
    loaded: AtomicBool,
}

impl Retriever {
    /// Rejects an inner-product index over embeddings that are not normalized.
    pub fn new(settings: Settings, embedder: Box<dyn Embedder>, index: Box<dyn VectorIndex>) -> Result<Self> {
        settings.validate()?;
        if settings.vector.metric_type == Metric::InnerProduct && !embedder.normalized() {
            return Err(Error::InvalidConfig(format!(
                "metric IP needs normalized embeddings but '{}' is not normalized",
                embedder.embedder_id()
            )));
        }
        let chunker = TextChunker::new(settings.text.clone())?;
        Ok(Self { settings, embedder, index, chunker, loaded: AtomicBool::new(false) })
    }

    /// Loads the configured embedder and connects the configured vector backend.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let embedder = coldata_embed::load_embedder(&settings.model)?;
        let index = coldata_vector::open_vector_index(&settings.vector).await?;
        Self::new(settings, embedder, index)
    }

    pub fn index_spec(&self) -> IndexSpec { self.settings.vector.index_spec(self.embedder.dim()) }

    /// Re-embeds every record of `store` into the vector index and loads it.
    pub async fn build_index(&self, store: &dyn DocumentStore) -> Result<UpdateReport> {
        let vector = &self.settings.vector;
        let options = UpdateOptions {
            spec: self.index_spec(),
            renew: vector.renew,
            batch_size: vector.batch_size,
            show_progress: vector.show_progress,
        };
        self.loaded.store(false, Ordering::SeqCst);
        let report = IndexBuilder::new(self.embedder.as_ref(), self.index.as_ref(), &self.chunker, options)
            .update(store)
            .await?;
        self.index.load().await?;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(report)
    }

    /// Ranked, de-duplicated records per query text.
    pub async fn query(&self, store: &dyn DocumentStore, texts: &[String]) -> Result<Vec<Result<ResultSet>>> {
        if texts.is_empty() {
            return Err(Error::EmptyQuery);
        }
        self.ensure_loaded().await?;
        let vector = &self.settings.vector;
        QueryEngine::new(self.embedder.as_ref(), self.index.as_ref(), vector.metric_type, vector.limit, vector.search_params())
            .search(store, texts)
            .await
    }

    /// Releases and drops the vector collection.
    pub async fn reset_index(&self) -> Result<()> {
        self.index.release().await?;
        self.index.drop_collection().await?;
        self.loaded.store(false, Ordering::SeqCst);
        tracing::info!(collection = self.index.collection_name(), "vector index reset");
        Ok(())
    }

    /// Record and chunk counts. A missing collection reports zero chunks and
    /// is not created.
    pub async fn status(&self, store: &dyn DocumentStore) -> Result<Status> {
        let chunks = if self.index.exists().await? {
            self.ensure_loaded().await?;
            self.index.count().await?
        } else {
            0
        };
        Ok(Status { collection: self.index.collection_name().to_string(), records: store.count().await?, chunks })
    }

    async fn ensure_loaded(&self) -> Result<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }
        // attach to whatever a previous run built
        self.index.create_or_replace(&self.index_spec(), false).await?;
        self.index.load().await?;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }
}
