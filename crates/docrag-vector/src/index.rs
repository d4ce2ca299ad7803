use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use docrag_core::traits::VectorIndex;
use docrag_core::types::{IndexEntry, VectorHit};

use crate::schema::{build_chunk_schema, CHUNKS_TABLE};
use crate::table::{ensure_table, open_db, table_exists};

/// Persistent cosine-similarity index over chunk embeddings.
///
/// Appends are serialized so `seq` stays contiguous across calls. The
/// directory is only created by the first append; reads against a missing
/// directory see an empty index.
pub struct LanceVectorIndex {
    path: PathBuf,
    db: OnceCell<Connection>,
    table_name: String,
    dim: usize,
    write_lock: Mutex<()>,
}

impl LanceVectorIndex {
    /// Connects right away when `path` already exists.
    pub async fn open(path: &Path, dim: usize) -> Result<Self> {
        ensure!(dim > 0, "vector dimension must be > 0");
        let index = Self {
            path: path.to_path_buf(),
            db: OnceCell::new(),
            table_name: CHUNKS_TABLE.to_string(),
            dim,
            write_lock: Mutex::new(()),
        };
        index.connection(false).await?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn entries_to_record_batch(&self, entries: &[IndexEntry], first_seq: i64) -> Result<RecordBatch> {
        let dim = i32::try_from(self.dim)?;
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        let seqs: Vec<i64> = (0..entries.len() as i64).map(|i| first_seq + i).collect();
        let vectors = entries.iter().map(|e| Some(e.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));
        let record_batch = RecordBatch::try_new(
            build_chunk_schema(dim),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(sources)),
                Arc::new(Int64Array::from(seqs)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
            ],
        )?;
        Ok(record_batch)
    }

    /// `None` when the directory does not exist and `create` is false.
    async fn connection(&self, create: bool) -> Result<Option<&Connection>> {
        if let Some(db) = self.db.get() {
            return Ok(Some(db));
        }
        if !create && !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(self.db.get_or_try_init(|| open_db(&self.path)).await?))
    }

    /// The chunks table, if it has been created.
    async fn existing_table(&self) -> Result<Option<Table>> {
        let Some(db) = self.connection(false).await? else {
            return Ok(None);
        };
        if !table_exists(db, &self.table_name).await? {
            return Ok(None);
        }
        Ok(Some(db.open_table(&self.table_name).execute().await?))
    }
}

/// Up to `limit` nearest rows, ordered by (score desc, seq asc).
async fn nearest(table: &Table, query: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
    let mut stream = table
        .vector_search(query.to_vec())?
        .distance_type(DistanceType::Cosine)
        .select(Select::columns(&["id", "source", "seq"]))
        .limit(limit)
        .execute()
        .await?;

    let mut hits = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        let ids = string_column(&batch, "id")?;
        let sources = string_column(&batch, "source")?;
        let seqs = batch
            .column_by_name("seq")
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .ok_or_else(|| anyhow!("seq column missing"))?;
        let distances = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| anyhow!("_distance column missing"))?;
        for i in 0..batch.num_rows() {
            let score = if distances.is_null(i) { f32::MIN } else { 1.0 - distances.value(i) };
            hits.push(VectorHit {
                id: ids.value(i).to_string(),
                source: sources.value(i).to_string(),
                score,
                seq: seqs.value(i),
            });
        }
    }
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.seq.cmp(&b.seq)));
    Ok(hits)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("{} column missing", name))
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn add(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        for e in entries {
            ensure!(
                e.vector.len() == self.dim,
                "vector for chunk {} has {} dims, index expects {}",
                e.id,
                e.vector.len(),
                self.dim
            );
        }
        let _guard = self.write_lock.lock().await;
        let db = self.connection(true).await?.ok_or_else(|| anyhow!("vector index not connected"))?;
        ensure_table(db, &self.table_name, build_chunk_schema(i32::try_from(self.dim)?)).await?;
        let table = db.open_table(&self.table_name).execute().await?;
        let first_seq = i64::try_from(table.count_rows(None).await?)?;
        let record_batch = self.entries_to_record_batch(entries, first_seq)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
        table.add(reader).execute().await?;
        debug!(rows = entries.len(), first_seq, "vector index append");
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        ensure!(query.len() == self.dim, "query has {} dims, index expects {}", query.len(), self.dim);
        if k == 0 {
            return Ok(vec![]);
        }
        let Some(table) = self.existing_table().await? else {
            return Ok(vec![]);
        };
        let total = table.count_rows(None).await?;
        // The k-th row may tie with rows the backend left out; widen until the
        // last returned score is strictly below it so seq decides among ties.
        let mut limit = k;
        loop {
            let mut hits = nearest(&table, query, limit).await?;
            let tied_at_edge = hits.len() == limit
                && limit < total
                && hits[limit - 1].score.total_cmp(&hits[k - 1].score).is_eq();
            if !tied_at_edge {
                hits.truncate(k);
                return Ok(hits);
            }
            limit = limit.saturating_mul(2).min(total);
            debug!(k, limit, "score tie at the cut-off; widening search");
        }
    }

    async fn count(&self) -> Result<usize> {
        match self.existing_table().await? {
            Some(table) => Ok(table.count_rows(None).await?),
            None => Ok(0),
        }
    }
}
