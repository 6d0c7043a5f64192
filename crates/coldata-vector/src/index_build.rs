//! IVF parameter selection and ANN index build over the vector column.

use coldata_core::types::{IndexKind, IndexSpec, Metric};
use coldata_core::Result;
use lancedb::index::vector::{IvfFlatIndexBuilder, IvfPqIndexBuilder};
use lancedb::index::Index;
use lancedb::{DistanceType, Table};

use crate::schema::VECTOR_COL;
use crate::table::index_err;

/// Below this many rows the collection is searched exactly.
pub const MIN_TRAINING_ROWS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfParams {
    pub nlist: usize,
    pub num_sub_vectors: usize,
}

pub fn distance_type(metric: Metric) -> DistanceType {
    match metric {
        Metric::InnerProduct => DistanceType::Dot,
        Metric::Cosine => DistanceType::Cosine,
        Metric::L2 => DistanceType::L2,
    }
}

/// Configured `nlist` clamped below the row count, and the configured PQ
/// sub-vector count lowered to the nearest divisor of `dim`.
pub fn compute_ivf_params(rows: usize, spec: &IndexSpec) -> IvfParams {
    let nlist = if rows > 1 {
        spec.nlist.min(rows - 1).max(1)
    } else {
        1
    };
    let requested = if spec.num_sub_vectors == 0 {
        if spec.dimension >= 1024 { 32 } else { 16 }
    } else {
        spec.num_sub_vectors
    };
    let num_sub_vectors = (1..=requested.min(spec.dimension.max(1)))
        .rev()
        .find(|m| spec.dimension % m == 0)
        .unwrap_or(1);
    IvfParams { nlist, num_sub_vectors }
}

/// Trains the configured index over the rows currently in `table`.
///
/// Returns whether an index was built.
pub async fn build_vector_index(table: &Table, spec: &IndexSpec, rows: usize) -> Result<bool> {
    if spec.kind == IndexKind::Flat || rows < MIN_TRAINING_ROWS {
        tracing::debug!(rows, kind = ?spec.kind, "skipping ANN index, search stays exact");
        return Ok(false);
    }
    let params = compute_ivf_params(rows, spec);
    let index = match spec.kind {
        IndexKind::IvfPq => Index::IvfPq(
            IvfPqIndexBuilder::default()
                .distance_type(distance_type(spec.metric))
                .num_partitions(params.nlist as u32)
                .num_sub_vectors(params.num_sub_vectors as u32),
        ),
        _ => Index::IvfFlat(
            IvfFlatIndexBuilder::default()
                .distance_type(distance_type(spec.metric))
                .num_partitions(params.nlist as u32),
        ),
    };
    table.create_index(&[VECTOR_COL], index).replace(true).execute().await.map_err(index_err)?;
    tracing::info!(rows, nlist = params.nlist, kind = ?spec.kind, "built vector index");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(dimension: usize, nlist: usize, m: usize) -> IndexSpec {
        IndexSpec { dimension, kind: IndexKind::IvfPq, metric: Metric::L2, nlist, num_sub_vectors: m }
    }

    #[test]
    fn nlist_clamped_below_rows() {
        assert_eq!(compute_ivf_params(300, &spec(384, 1024, 16)).nlist, 299);
        assert_eq!(compute_ivf_params(50_000, &spec(384, 1024, 16)).nlist, 1024);
        assert_eq!(compute_ivf_params(1, &spec(384, 1024, 16)).nlist, 1);
    }

    #[test]
    fn sub_vectors_divide_dimension() {
        assert_eq!(compute_ivf_params(1000, &spec(384, 8, 16)).num_sub_vectors, 16);
        assert_eq!(compute_ivf_params(1000, &spec(100, 8, 16)).num_sub_vectors, 10);
        assert_eq!(compute_ivf_params(1000, &spec(1024, 8, 0)).num_sub_vectors, 32);
    }
}
