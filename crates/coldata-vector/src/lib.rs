//! LanceDB-backed vector index and document store, plus an exact in-memory
//! vector index.

pub mod index_build;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use index_build::{compute_ivf_params, IvfParams, MIN_TRAINING_ROWS};
pub use lance::LanceVectorIndex;
pub use memory::MemoryVectorIndex;
pub use store::LanceDocumentStore;

use coldata_core::config::{VectorBackend, VectorConfig};
use coldata_core::traits::VectorIndex;
use coldata_core::Result;

/// Vector index for the configured backend.
pub async fn open_vector_index(config: &VectorConfig) -> Result<Box<dyn VectorIndex>> {
    Ok(match config.backend {
        VectorBackend::Lance => Box::new(LanceVectorIndex::from_config(config).await?),
        VectorBackend::Memory => Box::new(MemoryVectorIndex::new(config.collection.clone())),
    })
}
