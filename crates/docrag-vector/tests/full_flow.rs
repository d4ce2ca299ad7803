use docrag_core::traits::{Embedder, VectorIndex};
use docrag_core::types::IndexEntry;
use docrag_embed::HashEmbedder;
use docrag_vector::LanceVectorIndex;
use tempfile::TempDir;

const DIM: usize = 64;

async fn entries(embedder: &HashEmbedder, rows: &[(&str, &str, &str)]) -> Vec<IndexEntry> {
    let texts: Vec<String> = rows.iter().map(|(_, _, t)| t.to_string()).collect();
    let vectors = embedder.embed_batch(&texts).await.expect("embed");
    rows.iter()
        .zip(vectors)
        .map(|((id, source, _), vector)| IndexEntry { id: id.to_string(), source: source.to_string(), vector })
        .collect()
}

#[tokio::test]
async fn lancedb_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashEmbedder::new(DIM);
    let index = LanceVectorIndex::open(&tmp.path().join("lancedb"), DIM).await.expect("open");
    assert_eq!(index.count().await.expect("count"), 0);

    let batch = entries(
        &embedder,
        &[
            ("c1", "a.txt", "corrosive ppe gloves goggles"),
            ("c2", "b.txt", "fire extinguisher class b"),
            ("c3", "c.txt", "budget spreadsheet totals"),
        ],
    )
    .await;
    index.add(&batch).await.expect("add");
    assert_eq!(index.count().await.expect("count"), 3);

    let q = embedder.embed_batch(&["corrosive ppe".to_string()]).await.expect("embed").remove(0);
    let hits = index.search(&q, 2).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "c1");
    assert_eq!(hits[0].source, "a.txt");
    assert!(hits[0].score >= hits[1].score);
}

#[tokio::test]
async fn search_before_any_add_is_empty() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceVectorIndex::open(tmp.path(), DIM).await.expect("open");
    let hits = index.search(&vec![0.1; DIM], 10).await.expect("search");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn appends_accumulate_and_ties_follow_insertion_order() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashEmbedder::new(DIM);
    let index = LanceVectorIndex::open(tmp.path(), DIM).await.expect("open");

    index.add(&entries(&embedder, &[("first", "a.txt", "same words here")]).await).await.expect("add 1");
    index.add(&entries(&embedder, &[("second", "b.txt", "same words here")]).await).await.expect("add 2");
    assert_eq!(index.count().await.expect("count"), 2);

    let q = embedder.embed_batch(&["same words here".to_string()]).await.expect("embed").remove(0);
    let hits = index.search(&q, 10).await.expect("search");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
    assert!(hits[0].seq < hits[1].seq);
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceVectorIndex::open(tmp.path(), DIM).await.expect("open");
    let bad = IndexEntry { id: "x".into(), source: "x.txt".into(), vector: vec![0.5; DIM + 1] };
    assert!(index.add(&[bad]).await.is_err());
    assert!(index.search(&vec![0.5; 3], 1).await.is_err());
}

#[tokio::test]
async fn ties_past_the_limit_resolve_by_insertion_order() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashEmbedder::new(DIM);
    let index = LanceVectorIndex::open(tmp.path(), DIM).await.expect("open");

    // Six runs appending the same five chunks, as repeated re-indexing does.
    for run in 0..6 {
        let rows: Vec<(String, String)> = (0..5).map(|i| (format!("r{run}-c{i}"), format!("doc{i}.txt"))).collect();
        let refs: Vec<(&str, &str, &str)> =
            rows.iter().map(|(id, src)| (id.as_str(), src.as_str(), "same words here")).collect();
        index.add(&entries(&embedder, &refs).await).await.expect("add");
    }
    assert_eq!(index.count().await.expect("count"), 30);

    let q = embedder.embed_batch(&["same words here".to_string()]).await.expect("embed").remove(0);
    let hits = index.search(&q, 10).await.expect("search");
    let seqs: Vec<i64> = hits.iter().map(|h| h.seq).collect();
    assert_eq!(seqs, (0..10).collect::<Vec<i64>>());
    assert_eq!(hits[0].id, "r0-c0");
    assert_eq!(hits[9].id, "r1-c4");
}

#[tokio::test]
async fn reads_do_not_create_the_index_directory() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("lancedb");
    let embedder = HashEmbedder::new(DIM);
    let index = LanceVectorIndex::open(&path, DIM).await.expect("open");

    assert!(index.search(&vec![0.1; DIM], 10).await.expect("search").is_empty());
    assert_eq!(index.count().await.expect("count"), 0);
    assert!(!path.exists());

    index.add(&entries(&embedder, &[("c1", "a.txt", "gloves")]).await).await.expect("add");
    assert!(path.exists());
    assert_eq!(index.count().await.expect("count"), 1);
}
