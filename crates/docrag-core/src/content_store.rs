//! Chunk id -> {text, source} store, persisted as one JSON snapshot.
//!
//! The snapshot is written to a temp file in the target directory and then
//! renamed over the previous one, so readers never observe a partial file.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkId};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
}

impl From<&Chunk> for ContentRecord {
    fn from(c: &Chunk) -> Self {
        Self { id: c.id.clone(), text: c.text.clone(), source: c.source.clone() }
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    written_at: String,
    records: Vec<ContentRecord>,
}

#[derive(Debug, Default)]
pub struct ContentStore {
    records: Vec<ContentRecord>,
    by_id: HashMap<ChunkId, usize>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no content store snapshot, starting empty");
            return Ok(Self::new());
        }
        let reader = BufReader::new(fs::File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Operation(format!(
                "unsupported content store version {} in {}",
                snapshot.version,
                path.display()
            )));
        }
        let mut store = Self::new();
        for record in snapshot.records {
            store.insert(record)?;
        }
        Ok(store)
    }

    pub fn insert(&mut self, record: ContentRecord) -> Result<()> {
        if self.by_id.contains_key(&record.id) {
            return Err(Error::Operation(format!("duplicate chunk id {}", record.id)));
        }
        self.by_id.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn insert_chunks(&mut self, chunks: &[Chunk]) -> Result<()> {
        chunks.iter().try_for_each(|c| self.insert(ContentRecord::from(c)))
    }

    pub fn get(&self, id: &str) -> Option<&ContentRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentRecord> {
        self.records.iter()
    }

    /// Replace the snapshot at `path` with this store's full contents.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            written_at: chrono::Utc::now().to_rfc3339(),
            records: self.records.clone(),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        debug!(path = %path.display(), records = self.len(), "content store persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_snapshot_loads_empty() {
        let tmp = TempDir::new().expect("tmp");
        let store = ContentStore::load(&tmp.path().join("nope.json")).expect("load");
        assert!(store.is_empty());
    }

    #[test]
    fn persisted_text_reads_back_byte_for_byte() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("storage").join("content_store.json");
        let chunks = vec![
            Chunk::new("filename: a.txt\n\nCorrosive PPE requires gloves and goggles.", "a.txt"),
            Chunk::new("  leading space, ünïcødé, \"quotes\"\ttab  ", "b.pdf"),
        ];
        let mut store = ContentStore::new();
        store.insert_chunks(&chunks).expect("insert");
        store.persist(&path).expect("persist");

        let loaded = ContentStore::load(&path).expect("load");
        assert_eq!(loaded.len(), 2);
        for c in &chunks {
            let rec = loaded.get(&c.id).expect("present");
            assert_eq!(rec.text.as_bytes(), c.text.as_bytes());
            assert_eq!(rec.source, c.source);
        }
    }

    #[test]
    fn persist_replaces_previous_snapshot() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("content_store.json");
        let mut first = ContentStore::new();
        first.insert_chunks(&[Chunk::new("old", "old.txt")]).expect("insert");
        first.persist(&path).expect("persist");

        ContentStore::new().persist(&path).expect("persist empty");
        assert!(ContentStore::load(&path).expect("load").is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let chunk = Chunk::new("x", "a.txt");
        let mut store = ContentStore::new();
        store.insert(ContentRecord::from(&chunk)).expect("first");
        assert!(store.insert(ContentRecord::from(&chunk)).is_err());
    }
}
