use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, Table};
use std::sync::Arc;
use tokio::sync::Mutex;

use coldata_core::config::VectorConfig;
use coldata_core::traits::VectorIndex;
use coldata_core::types::{IndexSpec, Metric, ScoredChunk, SearchParams, MAX_CHUNK_ID_LEN};
use coldata_core::{Error, Result};

use crate::index_build::{build_vector_index, distance_type};
use crate::schema::{chunk_schema, vector_dim, CHUNK_ID_COL, DISTANCE_COL};
use crate::table::{drop_table, ensure_table, index_err, open_db, table_exists};

#[derive(Default)]
struct State {
    spec: Option<IndexSpec>,
    table: Option<Table>,
    loaded: bool,
    pending: Vec<RecordBatch>,
}

/// Chunk vectors in a LanceDB table.
///
/// Inserts are buffered until `flush`; searches need a prior `load`.
pub struct LanceVectorIndex {
    conn: Connection,
    name: String,
    state: Mutex<State>,
}

impl LanceVectorIndex {
    pub async fn connect(uri: &str, collection: &str) -> Result<Self> {
        let conn = open_db(uri).await?;
        Ok(Self { conn, name: collection.to_string(), state: Mutex::new(State::default()) })
    }

    pub async fn from_config(config: &VectorConfig) -> Result<Self> { Self::connect(&config.uri, &config.collection).await }

    fn missing(&self) -> Error { Error::CollectionMissing(self.name.clone()) }
}

fn to_batch(dim: usize, chunk_ids: &[String], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
    let values = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
    RecordBatch::try_new(
        chunk_schema(dim),
        vec![
            Arc::new(StringArray::from(chunk_ids.to_vec())),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(values, dim as i32)),
        ],
    )
    .map_err(|e| Error::VectorIndex(e.to_string()))
}

/// Engine distance to the metric's own score: similarity for IP and cosine,
/// squared distance for L2.
fn to_score(metric: Metric, distance: f32) -> f32 {
    match metric {
        Metric::InnerProduct | Metric::Cosine => 1.0 - distance,
        Metric::L2 => distance,
    }
}

fn read_hits(batch: &RecordBatch, metric: Metric) -> Result<Vec<ScoredChunk>> {
    let ids = batch
        .column_by_name(CHUNK_ID_COL)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::VectorIndex("chunk_id column missing from search result".into()))?;
    let distances = batch
        .column_by_name(DISTANCE_COL)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::VectorIndex("_distance column missing from search result".into()))?;
    Ok((0..batch.num_rows())
        .filter(|&i| ids.is_valid(i))
        .map(|i| ScoredChunk { chunk_id: ids.value(i).to_string(), score: to_score(metric, distances.value(i)) })
        .collect())
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    fn collection_name(&self) -> &str { &self.name }

    async fn create_or_replace(&self, spec: &IndexSpec, renew: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if renew {
            drop_table(&self.conn, &self.name).await?;
        } else if table_exists(&self.conn, &self.name).await? {
            let table = self.conn.open_table(&self.name).execute().await.map_err(index_err)?;
            let schema = table.schema().await.map_err(index_err)?;
            if let Some(existing) = vector_dim(&schema) {
                if existing != spec.dimension {
                    return Err(Error::InvalidConfig(format!(
                        "collection '{}' stores {existing}-d vectors but the embedder produces {}-d",
                        self.name, spec.dimension
                    )));
                }
            }
        }
        let table = ensure_table(&self.conn, &self.name, chunk_schema(spec.dimension)).await?;
        *state = State { spec: Some(spec.clone()), table: Some(table), loaded: false, pending: Vec::new() };
        tracing::info!(collection = %self.name, dim = spec.dimension, metric = spec.metric.as_str(), renew, "collection ready");
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        if self.state.lock().await.table.is_some() {
            return Ok(true);
        }
        table_exists(&self.conn, &self.name).await
    }

    async fn drop_collection(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        drop_table(&self.conn, &self.name).await?;
        *state = State::default();
        Ok(())
    }

    async fn insert(&self, chunk_ids: &[String], vectors: &[Vec<f32>]) -> Result<()> {
        let mut state = self.state.lock().await;
        let dim = state.spec.as_ref().map(|s| s.dimension).ok_or_else(|| self.missing())?;
        if chunk_ids.len() != vectors.len() {
            return Err(Error::LengthMismatch { ids: chunk_ids.len(), vectors: vectors.len() });
        }
        for (id, v) in chunk_ids.iter().zip(vectors) {
            if id.chars().count() > MAX_CHUNK_ID_LEN {
                return Err(Error::ChunkIdTooLong { chunk_id: id.clone(), max: MAX_CHUNK_ID_LEN });
            }
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len(), chunk_id: id.clone() });
            }
        }
        if chunk_ids.is_empty() {
            return Ok(());
        }
        let batch = to_batch(dim, chunk_ids, vectors)?;
        state.pending.push(batch);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let (Some(spec), Some(table)) = (state.spec.clone(), state.table.clone()) else {
            return Err(self.missing());
        };
        if state.pending.is_empty() {
            return Ok(());
        }
        let batches = std::mem::take(&mut state.pending);
        let rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
        let reader = Box::new(RecordBatchIterator::new(batches.into_iter().map(Ok), chunk_schema(spec.dimension)));
        // upsert on chunk_id: rebuilding into a kept collection must not duplicate rows
        let mut mi = table.merge_insert(&[CHUNK_ID_COL]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let res = mi.execute(reader).await.map_err(index_err)?;
        tracing::debug!(
            collection = %self.name,
            rows,
            inserted = res.num_inserted_rows,
            updated = res.num_updated_rows,
            "flushed"
        );
        Ok(())
    }

    async fn build_ann_index(&self) -> Result<()> {
        let state = self.state.lock().await;
        let (Some(spec), Some(table)) = (state.spec.as_ref(), state.table.as_ref()) else {
            return Err(self.missing());
        };
        let rows = table.count_rows(None).await.map_err(index_err)?;
        build_vector_index(table, spec, rows).await?;
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.table.is_none() {
            return Err(self.missing());
        }
        state.loaded = true;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.state.lock().await.loaded = false;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.lock().await;
        let table = state.table.as_ref().ok_or_else(|| self.missing())?;
        table.count_rows(None).await.map_err(index_err)
    }

    async fn search(&self, queries: &[Vec<f32>], k: usize, params: &SearchParams) -> Result<Vec<Vec<ScoredChunk>>> {
        let (spec, table) = {
            let state = self.state.lock().await;
            let (Some(spec), Some(table)) = (state.spec.clone(), state.table.clone()) else {
                return Err(self.missing());
            };
            if !state.loaded {
                return Err(Error::NotLoaded(self.name.clone()));
            }
            (spec, table)
        };

        let mut out = Vec::with_capacity(queries.len());
        for (qi, q) in queries.iter().enumerate() {
            if q.len() != spec.dimension {
                return Err(Error::DimensionMismatch {
                    expected: spec.dimension,
                    actual: q.len(),
                    chunk_id: format!("<query {qi}>"),
                });
            }
            if k == 0 {
                out.push(Vec::new());
                continue;
            }
            let batches: Vec<RecordBatch> = table
                .vector_search(q.clone())
                .map_err(index_err)?
                .distance_type(distance_type(spec.metric))
                .nprobes(params.nprobe.max(1))
                .select(Select::columns(&[CHUNK_ID_COL]))
                .limit(k)
                .execute()
                .await
                .map_err(index_err)?
                .try_collect()
                .await
                .map_err(index_err)?;
            let mut hits = Vec::with_capacity(k);
            for batch in &batches {
                hits.extend(read_hits(batch, spec.metric)?);
            }
            hits.sort_by(|a, b| spec.metric.rank(a.score, b.score));
            hits.truncate(k);
            out.push(hits);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_become_metric_scores() {
        assert!((to_score(Metric::InnerProduct, 0.1) - 0.9).abs() < 1e-6);
        assert!((to_score(Metric::Cosine, 1.5) + 0.5).abs() < 1e-6);
        assert_eq!(to_score(Metric::L2, 2.0), 2.0);
    }
}
