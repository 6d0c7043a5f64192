use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const CHUNK_ID_COL: &str = "chunk_id";
pub const VECTOR_COL: &str = "vector";
pub const DISTANCE_COL: &str = "_distance";

/// Chunk collection: primary key plus a fixed-size float vector.
pub fn chunk_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(CHUNK_ID_COL, DataType::Utf8, false),
        Field::new(
            VECTOR_COL,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32),
            true,
        ),
    ]))
}

/// Dimension of the vector column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COL).ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

/// Record collection: the queryable keys as columns, the full record as JSON.
pub fn record_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("index", DataType::Utf8, false),
        Field::new("url", DataType::Utf8, false),
        Field::new("website", DataType::Utf8, false),
        Field::new("payload", DataType::Utf8, false),
    ]))
}
