//! Domain types shared by the document store, the vector index and the
//! search pipeline.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Separator between a record index and the chunk sequence number.
pub const CHUNK_ID_DELIMITER: char = '_';

/// Upper bound on the stored primary key length.
pub const MAX_CHUNK_ID_LEN: usize = 128;

/// A dataset page persisted by one of the website adapters.
///
/// - `index`: hex digest of the canonical URL, unique in the document store
/// - `url`: origin page (serialized as `URL`)
/// - `website`: adapter / source name
/// - `title`/`description`: the common metadata most adapters extract
/// - `info`: cleaned full text of the page
/// - `metadata`: any further key/value fields an adapter produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub index: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(default)]
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub info: String,
    #[serde(flatten)]
    pub metadata: Meta,
}

/// A contiguous window of a record's context text.
///
/// `chunk_id` is `{record_index}_{sequence}`; `start_offset` is the character
/// offset of `text` inside the context string when offsets are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub record_index: String,
    pub sequence: usize,
    pub text: String,
    pub start_offset: Option<usize>,
}

/// Builds the vector-index primary key for the `sequence`-th chunk of a record.
pub fn chunk_id(record_index: &str, sequence: usize) -> ChunkId {
    format!("{record_index}{CHUNK_ID_DELIMITER}{sequence}")
}

/// Recovers the owning record index by cutting at the last delimiter.
///
/// Ids without a delimiter are returned unchanged.
pub fn record_index_of(chunk_id: &str) -> &str {
    chunk_id
        .rsplit_once(CHUNK_ID_DELIMITER)
        .map_or(chunk_id, |(prefix, _)| prefix)
}

/// Distance metric of the vector index.
///
/// Serialized with the short upper-case names used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    #[serde(rename = "IP", alias = "ip", alias = "dot")]
    InnerProduct,
    #[serde(rename = "COSINE", alias = "cosine")]
    Cosine,
    #[serde(rename = "L2", alias = "l2")]
    L2,
}

impl Metric {
    /// Similarity metrics rank larger scores first, distances rank smaller first.
    pub fn greater_is_better(self) -> bool {
        matches!(self, Metric::InnerProduct | Metric::Cosine)
    }

    /// Strictly better; equal scores never displace the incumbent.
    pub fn is_better(self, candidate: f32, incumbent: f32) -> bool {
        if self.greater_is_better() {
            candidate > incumbent
        } else {
            candidate < incumbent
        }
    }

    /// Ordering that places the best score first when used with `sort_by`.
    pub fn rank(self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        if self.greater_is_better() {
            ord.reverse()
        } else {
            ord
        }
    }

    /// Score of `b` against `a` in this metric's own direction.
    ///
    /// L2 is the squared euclidean distance, matching what the engines report.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::InnerProduct => dot(a, b),
            Metric::Cosine => {
                let denom = (dot(a, a).sqrt() * dot(b, b).sqrt()).max(1e-12);
                dot(a, b) / denom
            }
            Metric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::InnerProduct => "IP",
            Metric::Cosine => "COSINE",
            Metric::L2 => "L2",
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

/// Approximate-nearest-neighbour index built over the vector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// Exact scan, no trained index.
    #[serde(rename = "FLAT", alias = "flat")]
    Flat,
    #[default]
    #[serde(rename = "IVF_FLAT", alias = "ivf_flat")]
    IvfFlat,
    #[serde(rename = "IVF_PQ", alias = "ivf_pq")]
    IvfPq,
}

/// Everything needed to (re)create a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub dimension: usize,
    pub kind: IndexKind,
    pub metric: Metric,
    pub nlist: usize,
    pub num_sub_vectors: usize,
}

/// Per-search tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub nprobe: usize,
}

impl Default for SearchParams {
    fn default() -> Self { Self { nprobe: 32 } }
}

/// One nearest-neighbour hit at chunk granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: ChunkId,
    pub score: f32,
}

/// A record-level hit after collapsing chunks and joining the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub index: String,
    pub score: f32,
    pub record: Record,
}

/// Ranked, de-duplicated hits for a single query (best first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub hits: Vec<SearchHit>,
}

impl ResultSet {
    pub fn len(&self) -> usize { self.hits.len() }
    pub fn is_empty(&self) -> bool { self.hits.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &SearchHit> { self.hits.iter() }
    pub fn get(&self, index: &str) -> Option<&SearchHit> { self.hits.iter().find(|h| h.index == index) }
    pub fn indices(&self) -> Vec<&str> { self.hits.iter().map(|h| h.index.as_str()).collect() }
}

/// Document-store selection predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    IndexEq(String),
    IndexIn(Vec<String>),
    WebsiteEq(String),
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::IndexEq(index) => &record.index == index,
            Filter::IndexIn(indices) => indices.iter().any(|i| i == &record.index),
            Filter::WebsiteEq(website) => &record.website == website,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_recover_record_index() {
        let id = chunk_id("abc_def", 12);
        assert_eq!(id, "abc_def_12");
        assert_eq!(record_index_of(&id), "abc_def");
        assert_eq!(record_index_of("plain"), "plain");
    }

    #[test]
    fn metric_direction() {
        assert!(Metric::InnerProduct.is_better(0.95, 0.9));
        assert!(!Metric::InnerProduct.is_better(0.9, 0.9));
        assert!(Metric::L2.is_better(0.1, 0.2));
        let mut scores = vec![0.2f32, 0.9, 0.5];
        scores.sort_by(|a, b| Metric::Cosine.rank(*a, *b));
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
        scores.sort_by(|a, b| Metric::L2.rank(*a, *b));
        assert_eq!(scores, vec![0.2, 0.5, 0.9]);
    }

    #[test]
    fn record_roundtrips_open_metadata() {
        let json = r#"{"index":"h1","URL":"https://x/y","website":"UCI","title":"Iris","info":"flowers","Creators":"Fisher"}"#;
        let rec: Record = serde_json::from_str(json).unwrap();
        assert_eq!(rec.url, "https://x/y");
        assert_eq!(rec.metadata.get("Creators").and_then(|v| v.as_str()), Some("Fisher"));
        let back = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["URL"], "https://x/y");
        assert_eq!(back["Creators"], "Fisher");
    }
}
