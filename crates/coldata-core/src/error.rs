use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Dimension mismatch for '{chunk_id}': expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize, chunk_id: String },

    #[error("Length mismatch: {ids} chunk ids but {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    #[error("Query list is empty")]
    EmptyQuery,

    #[error("Chunk id longer than {max} characters: {chunk_id}")]
    ChunkIdTooLong { chunk_id: String, max: usize },

    #[error("Collection '{0}' does not exist")]
    CollectionMissing(String),

    #[error("Collection '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Update aborted at batch {batch} (first chunk '{first_chunk_id}'): {source}")]
    BatchFailed {
        batch: usize,
        first_chunk_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
