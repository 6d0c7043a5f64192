//! Records in a LanceDB table: `index`, `url` and `website` as filterable
//! columns, the whole record as a JSON `payload`.

use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Table;
use std::sync::Arc;

use coldata_core::config::StoreConfig;
use coldata_core::traits::DocumentStore;
use coldata_core::types::{Filter, Record};
use coldata_core::{Error, Result};

use crate::schema::record_schema;
use crate::table::{ensure_table, open_db, sql_literal, store_err};

pub struct LanceDocumentStore {
    table: Table,
}

impl LanceDocumentStore {
    pub async fn connect(uri: &str, collection: &str) -> Result<Self> {
        let conn = open_db(uri).await?;
        let table = ensure_table(&conn, collection, record_schema()).await?;
        Ok(Self { table })
    }

    pub async fn from_config(config: &StoreConfig) -> Result<Self> { Self::connect(&config.uri, &config.collection).await }
}

/// SQL predicate for `filter`; `None` selects everything.
fn predicate(filter: &Filter) -> Option<String> {
    match filter {
        Filter::All => None,
        Filter::IndexEq(index) => Some(format!("index = {}", sql_literal(index))),
        Filter::IndexIn(indices) => {
            let list: Vec<String> = indices.iter().map(|i| sql_literal(i)).collect();
            Some(format!("index IN ({})", list.join(", ")))
        }
        Filter::WebsiteEq(website) => Some(format!("website = {}", sql_literal(website))),
    }
}

fn to_batch(record: &Record) -> Result<RecordBatch> {
    let payload = serde_json::to_string(record)?;
    RecordBatch::try_new(
        record_schema(),
        vec![
            Arc::new(StringArray::from(vec![record.index.clone()])),
            Arc::new(StringArray::from(vec![record.url.clone()])),
            Arc::new(StringArray::from(vec![record.website.clone()])),
            Arc::new(StringArray::from(vec![payload])),
        ],
    )
    .map_err(|e| Error::Store(e.to_string()))
}

fn decode(batch: &RecordBatch) -> Vec<Result<Record>> {
    let Some(payload) = batch.column_by_name("payload").and_then(|c| c.as_any().downcast_ref::<StringArray>()) else {
        return vec![Err(Error::Store("payload column missing".into()))];
    };
    (0..batch.num_rows())
        .filter(|&i| payload.is_valid(i))
        .map(|i| serde_json::from_str::<Record>(payload.value(i)).map_err(Error::from))
        .collect()
}

impl LanceDocumentStore {
    async fn query(&self, filter: &Filter, limit: Option<usize>) -> Result<BoxStream<'static, Result<Record>>> {
        if matches!(filter, Filter::IndexIn(indices) if indices.is_empty()) {
            return Ok(stream::empty().boxed());
        }
        let mut query = self.table.query();
        if let Some(sql) = predicate(filter) {
            query = query.only_if(sql);
        }
        if let Some(n) = limit {
            query = query.limit(n);
        }
        let batches = query.execute().await.map_err(store_err)?;
        Ok(batches
            .map_err(store_err)
            .map_ok(|batch| stream::iter(decode(&batch)))
            .try_flatten()
            .boxed())
    }
}

#[async_trait]
impl DocumentStore for LanceDocumentStore {
    async fn find(&self, filter: &Filter) -> Result<BoxStream<'static, Result<Record>>> { self.query(filter, None).await }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Record>> {
        self.query(filter, Some(1)).await?.try_next().await
    }

    async fn count(&self) -> Result<usize> { self.table.count_rows(None).await.map_err(store_err) }

    async fn insert_if_absent(&self, record: &Record) -> Result<bool> {
        let batch = to_batch(record)?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), record_schema()));
        let mut mi = self.table.merge_insert(&["index"]);
        mi.when_not_matched_insert_all();
        let res = mi.execute(reader).await.map_err(store_err)?;
        Ok(res.num_inserted_rows > 0)
    }
}
