//! Update pipeline: document store → chunker → embedder → vector index.

use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use coldata_core::chunker::TextChunker;
use coldata_core::traits::{DocumentStore, Embedder, VectorIndex};
use coldata_core::types::{Chunk, Filter, IndexSpec};
use coldata_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub spec: IndexSpec,
    pub renew: bool,
    pub batch_size: usize,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub records: usize,
    /// Records whose text produced no chunks.
    pub empty_records: usize,
    pub chunks: usize,
    pub batches: usize,
}

pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    chunker: &'a TextChunker,
    options: UpdateOptions,
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder, index: &'a dyn VectorIndex, chunker: &'a TextChunker, options: UpdateOptions) -> Self {
        Self { embedder, index, chunker, options }
    }

    /// Rebuilds the vector index from every record in `store`.
    ///
    /// The collection is (re)created first. Each full batch is embedded,
    /// inserted and flushed before the next one is read, so a failure leaves
    /// earlier batches searchable and reports the failing batch.
    pub async fn update(&self, store: &dyn DocumentStore) -> Result<UpdateReport> {
        if self.options.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".into()));
        }
        self.index.create_or_replace(&self.options.spec, self.options.renew).await?;

        let total = store.count().await?;
        tracing::info!(records = total, collection = self.index.collection_name(), "updating vector index");
        let pb = progress_bar(total as u64, self.options.show_progress);

        let mut report = UpdateReport::default();
        let mut buffer: Vec<Chunk> = Vec::with_capacity(self.options.batch_size);
        let mut records = store.find(&Filter::All).await?;
        while let Some(record) = records.try_next().await? {
            let chunks = self.chunker.chunk_record(&record);
            if chunks.is_empty() {
                tracing::debug!(index = %record.index, "record has no text, skipped");
                report.empty_records += 1;
            }
            report.records += 1;
            report.chunks += chunks.len();
            buffer.extend(chunks);
            while buffer.len() >= self.options.batch_size {
                let batch: Vec<Chunk> = buffer.drain(..self.options.batch_size).collect();
                self.write_batch(report.batches, &batch).await?;
                report.batches += 1;
            }
            pb.inc(1);
            pb.set_message(format!("{} chunks", report.chunks));
        }
        if !buffer.is_empty() {
            self.write_batch(report.batches, &buffer).await?;
            report.batches += 1;
        }
        self.index.flush().await?;
        self.index.build_ann_index().await?;

        pb.finish_with_message(format!("{} chunks indexed", report.chunks));
        tracing::info!(
            records = report.records,
            chunks = report.chunks,
            batches = report.batches,
            empty = report.empty_records,
            "vector index updated"
        );
        Ok(report)
    }

    async fn write_batch(&self, batch_no: usize, batch: &[Chunk]) -> Result<()> {
        let first_chunk_id = batch.first().map(|c| c.chunk_id.clone()).unwrap_or_default();
        let fail = |source: Error| Error::BatchFailed { batch: batch_no, first_chunk_id: first_chunk_id.clone(), source: Box::new(source) };

        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let ids: Vec<String> = batch.iter().map(|c| c.chunk_id.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).map_err(fail)?;
        self.index.insert(&ids, &vectors).await.map_err(fail)?;
        self.index.flush().await.map_err(fail)?;
        tracing::debug!(batch = batch_no, size = batch.len(), first = %first_chunk_id, "batch written");
        Ok(())
    }
}
