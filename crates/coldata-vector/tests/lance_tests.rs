use futures::TryStreamExt;
use tempfile::TempDir;

use coldata_core::traits::{DocumentStore, VectorIndex};
use coldata_core::types::{Filter, IndexKind, IndexSpec, Metric, Record, SearchParams};
use coldata_core::Error;
use coldata_vector::{LanceDocumentStore, LanceVectorIndex};

fn spec(dimension: usize, metric: Metric) -> IndexSpec {
    IndexSpec { dimension, kind: IndexKind::IvfFlat, metric, nlist: 1024, num_sub_vectors: 16 }
}

fn unit(v: [f32; 4]) -> Vec<f32> {
    let n = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / n).collect()
}

async fn index_in(tmp: &TempDir) -> LanceVectorIndex {
    LanceVectorIndex::connect(&tmp.path().display().to_string(), "dataset_chunks").await.expect("connect")
}

#[tokio::test]
async fn insert_flush_load_search_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp).await;
    index.create_or_replace(&spec(4, Metric::InnerProduct), true).await.unwrap();

    let ids = vec!["r1_0".to_string(), "r1_1".to_string(), "r2_0".to_string()];
    let vectors = vec![unit([1.0, 0.0, 0.0, 0.0]), unit([0.7, 0.7, 0.0, 0.0]), unit([0.0, 0.0, 1.0, 0.0])];
    index.insert(&ids, &vectors).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0, "buffered rows are not counted before flush");
    index.flush().await.unwrap();
    index.build_ann_index().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 3);

    index.load().await.unwrap();
    let hits = index.search(&[unit([1.0, 0.1, 0.0, 0.0])], 2, &SearchParams::default()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].len(), 2);
    assert_eq!(hits[0][0].chunk_id, "r1_0");
    assert!(hits[0][0].score >= hits[0][1].score);
    assert!(hits[0][0].score > 0.9 && hits[0][0].score <= 1.0 + 1e-5, "score {}", hits[0][0].score);
}

#[tokio::test]
async fn renew_drops_previous_contents() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp).await;
    index.create_or_replace(&spec(4, Metric::L2), true).await.unwrap();
    index.insert(&["a_0".to_string()], &[vec![1.0, 2.0, 3.0, 4.0]]).await.unwrap();
    index.flush().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1);

    for _ in 0..2 {
        index.create_or_replace(&spec(4, Metric::L2), true).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        index.load().await.unwrap();
        let hits = index.search(&[vec![1.0, 2.0, 3.0, 4.0]], 3, &SearchParams::default()).await.unwrap();
        assert_eq!(hits, vec![Vec::new()], "renewed collection is empty but searchable");
        let err = index.insert(&["c_0".to_string()], &[vec![0.0; 3]]).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3, .. }));
    }

    index.insert(&["b_0".to_string()], &[vec![0.0; 4]]).await.unwrap();
    index.flush().await.unwrap();
    index.create_or_replace(&spec(4, Metric::L2), false).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 1, "renew = false keeps rows");
    let err = index.create_or_replace(&spec(8, Metric::L2), false).await.unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[tokio::test]
async fn flushing_an_existing_chunk_id_replaces_the_row() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp).await;
    index.create_or_replace(&spec(4, Metric::InnerProduct), true).await.unwrap();
    let ids = vec!["r1_0".to_string(), "r2_0".to_string()];
    index.insert(&ids, &[unit([1.0, 0.0, 0.0, 0.0]), unit([0.0, 1.0, 0.0, 0.0])]).await.unwrap();
    index.flush().await.unwrap();

    // a rebuild into a kept collection writes the same ids again
    index.create_or_replace(&spec(4, Metric::InnerProduct), false).await.unwrap();
    index.insert(&ids, &[unit([0.0, 0.0, 1.0, 0.0]), unit([0.0, 1.0, 0.0, 0.0])]).await.unwrap();
    index.flush().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 2);

    index.load().await.unwrap();
    let hits = index.search(&[unit([0.0, 0.0, 1.0, 0.0])], 1, &SearchParams::default()).await.unwrap();
    assert_eq!(hits[0][0].chunk_id, "r1_0");
    assert!(hits[0][0].score > 0.99, "row holds the latest vector, score {}", hits[0][0].score);
}

#[tokio::test]
async fn exists_does_not_create() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp).await;
    assert!(!index.exists().await.unwrap());
    assert!(!index_in(&tmp).await.exists().await.unwrap());
    index.create_or_replace(&spec(4, Metric::L2), true).await.unwrap();
    assert!(index_in(&tmp).await.exists().await.unwrap(), "visible to a fresh connection");
    index.drop_collection().await.unwrap();
    assert!(!index.exists().await.unwrap());
}

#[tokio::test]
async fn insert_validates_lengths_and_dimensions() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp).await;
    let err = index.insert(&["x_0".to_string()], &[vec![0.0; 4]]).await.unwrap_err();
    assert!(matches!(err, Error::CollectionMissing(_)));

    index.create_or_replace(&spec(4, Metric::InnerProduct), true).await.unwrap();
    let err = index.insert(&["x_0".to_string(), "x_1".to_string()], &[vec![0.0; 4]]).await.unwrap_err();
    assert!(matches!(err, Error::LengthMismatch { ids: 2, vectors: 1 }));

    let err = index.insert(&["x_0".to_string()], &[vec![0.0; 3]]).await.unwrap_err();
    match err {
        Error::DimensionMismatch { expected, actual, chunk_id } => {
            assert_eq!((expected, actual, chunk_id.as_str()), (4, 3, "x_0"));
        }
        other => panic!("unexpected error {other}"),
    }

    let long = "h".repeat(130);
    let err = index.insert(&[long], &[vec![0.0; 4]]).await.unwrap_err();
    assert!(matches!(err, Error::ChunkIdTooLong { max: 128, .. }));
}

#[tokio::test]
async fn search_requires_load() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp).await;
    index.create_or_replace(&spec(4, Metric::Cosine), true).await.unwrap();
    let err = index.search(&[vec![1.0, 0.0, 0.0, 0.0]], 3, &SearchParams::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotLoaded(_)));
    index.load().await.unwrap();
    index.release().await.unwrap();
    assert!(index.search(&[vec![1.0, 0.0, 0.0, 0.0]], 3, &SearchParams::default()).await.is_err());
}

#[tokio::test]
async fn document_store_skips_existing_index() {
    let tmp = TempDir::new().unwrap();
    let store = LanceDocumentStore::connect(&tmp.path().display().to_string(), "dataset").await.unwrap();
    let mut iris = Record::new("https://archive.ics.uci.edu/dataset/53/iris", "UCI");
    iris.title = Some("Iris".into());
    iris.info = "Measurements of iris flowers.".into();
    iris.metadata.insert("Creators".into(), serde_json::json!("R. A. Fisher"));
    let ocean = Record::new("https://www.kaggle.com/datasets/ocean", "Kaggle");

    assert!(store.insert_if_absent(&iris).await.unwrap());
    assert!(!store.insert_if_absent(&iris).await.unwrap());
    assert!(store.insert_if_absent(&ocean).await.unwrap());
    assert_eq!(store.count().await.unwrap(), 2);

    let found: Vec<Record> = store
        .find(&Filter::IndexIn(vec![iris.index.clone(), "stale".into()]))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(found, vec![iris.clone()]);

    let all: Vec<Record> = store.find(&Filter::All).await.unwrap().try_collect().await.unwrap();
    assert_eq!(all.len(), 2);
    let none: Vec<Record> = store.find(&Filter::IndexIn(vec![])).await.unwrap().try_collect().await.unwrap();
    assert!(none.is_empty());
    let kaggle = store.find_one(&Filter::WebsiteEq("Kaggle".into())).await.unwrap();
    assert_eq!(kaggle.map(|r| r.index), Some(ocean.index));
}
