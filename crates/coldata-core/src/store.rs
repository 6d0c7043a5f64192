//! In-process document store keeping records in insertion order.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::traits::DocumentStore;
use crate::types::{Filter, Record};

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.records.write() {
            for record in records {
                if !guard.iter().any(|r| r.index == record.index) {
                    guard.push(record);
                }
            }
        }
        store
    }

    fn select(&self, filter: &Filter) -> Result<Vec<Record>> {
        let guard = self.records.read().map_err(|_| Error::Store("record lock poisoned".into()))?;
        Ok(guard.iter().filter(|r| filter.matches(r)).cloned().collect())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, filter: &Filter) -> Result<BoxStream<'static, Result<Record>>> {
        let records = self.select(filter)?;
        Ok(stream::iter(records.into_iter().map(Ok)).boxed())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Record>> {
        Ok(self.select(filter)?.into_iter().next())
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.records.read().map_err(|_| Error::Store("record lock poisoned".into()))?;
        Ok(guard.len())
    }

    async fn insert_if_absent(&self, record: &Record) -> Result<bool> {
        let mut guard = self.records.write().map_err(|_| Error::Store("record lock poisoned".into()))?;
        if guard.iter().any(|r| r.index == record.index) {
            return Ok(false);
        }
        guard.push(record.clone());
        Ok(true)
    }
}
