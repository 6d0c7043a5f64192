//! Search pipeline: embed → nearest chunks → best chunk per record → rank →
//! join against the document store.

use futures::TryStreamExt;
use std::collections::HashMap;

use coldata_core::traits::{DocumentStore, Embedder, VectorIndex};
use coldata_core::types::{record_index_of, Filter, Metric, Record, ResultSet, ScoredChunk, SearchHit, SearchParams};
use coldata_core::{Error, Result};

/// Best score per record, best first.
///
/// Equal scores keep the chunk seen first, and equally scored records keep
/// their first-seen order.
pub fn collapse_hits(hits: &[ScoredChunk], metric: Metric) -> Vec<(String, f32)> {
    let mut best: Vec<(String, f32)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for hit in hits {
        let index = record_index_of(&hit.chunk_id);
        match position.get(index) {
            Some(&i) => {
                if metric.is_better(hit.score, best[i].1) {
                    best[i].1 = hit.score;
                }
            }
            None => {
                position.insert(index, best.len());
                best.push((index.to_string(), hit.score));
            }
        }
    }
    best.sort_by(|a, b| metric.rank(a.1, b.1));
    best
}

pub struct QueryEngine<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    metric: Metric,
    limit: usize,
    params: SearchParams,
}

impl<'a> QueryEngine<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex, metric: Metric, limit: usize, params: SearchParams) -> Self {
        Self { embedder, index, metric, limit, params }
    }

    /// One result set per query, in query order. A query whose embed or
    /// search fails yields an `Err` in its slot without affecting the others.
    pub async fn search(&self, store: &dyn DocumentStore, queries: &[String]) -> Result<Vec<Result<ResultSet>>> {
        if queries.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let result = self.search_one(store, query).await;
            if let Err(e) = &result {
                tracing::warn!(query = %query, error = %e, "query failed");
            }
            results.push(result);
        }
        Ok(results)
    }

    async fn search_one(&self, store: &dyn DocumentStore, query: &str) -> Result<ResultSet> {
        let mut vectors = self.embedder.embed_batch(&[query.to_string()])?;
        let vector = vectors.pop().ok_or_else(|| Error::Embedding("no vector returned for query".into()))?;
        let hits = self
            .index
            .search(std::slice::from_ref(&vector), self.limit, &self.params)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let ranked = collapse_hits(&hits, self.metric);
        if ranked.is_empty() {
            return Ok(ResultSet::default());
        }
        let indices: Vec<String> = ranked.iter().map(|(index, _)| index.clone()).collect();
        let mut records: HashMap<String, Record> = store
            .find(&Filter::IndexIn(indices))
            .await?
            .map_ok(|r| (r.index.clone(), r))
            .try_collect()
            .await?;

        let mut out = ResultSet::default();
        for (index, score) in ranked {
            match records.remove(&index) {
                Some(record) => out.hits.push(SearchHit { index, score, record }),
                None => tracing::debug!(index = %index, "hit has no record in the document store, dropped"),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> ScoredChunk { ScoredChunk { chunk_id: id.to_string(), score } }

    #[test]
    fn keeps_best_chunk_per_record() {
        let hits = [hit("A_0", 0.9), hit("B_0", 0.92), hit("A_1", 0.95)];
        let out = collapse_hits(&hits, Metric::InnerProduct);
        assert_eq!(out, vec![("A".to_string(), 0.95), ("B".to_string(), 0.92)]);
    }

    #[test]
    fn distance_metrics_keep_smallest() {
        let hits = [hit("A_0", 0.4), hit("A_1", 0.1), hit("B_0", 0.2)];
        let out = collapse_hits(&hits, Metric::L2);
        assert_eq!(out, vec![("A".to_string(), 0.1), ("B".to_string(), 0.2)]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let hits = [hit("x_y_0", 0.5), hit("z_0", 0.5), hit("x_y_3", 0.5)];
        let out = collapse_hits(&hits, Metric::Cosine);
        assert_eq!(out, vec![("x_y".to_string(), 0.5), ("z".to_string(), 0.5)]);
    }
}
