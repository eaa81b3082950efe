//! Durable id -> metadata mapping for stored vectors.
//!
//! Persists as a single JSON document (metadata.json):
//!
//! ```json
//! {
//!   "next_id": 2,
//!   "metadata": {
//!     "0": { "text": "...", "source_path": "...", "segments": [] }
//!   }
//! }
//! ```
//!
//! Ids are serialized as decimal strings in the document and parsed back
//! to integers on load. A missing record for an id is a valid outcome,
//! not an error: vector presence and metadata presence can diverge on a
//! torn write and search must stay usable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::index::VectorId;

/// A time-aligned sub-segment of the source material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// Descriptive record attached to a stored vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Transcribed or descriptive text
    #[serde(default)]
    pub text: String,
    /// Path to the source file the vector was derived from
    #[serde(default)]
    pub source_path: String,
    /// Optional time-aligned sub-segments
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// On-disk document shape. Keys are decimal-string ids.
#[derive(Serialize, Deserialize)]
struct MetadataDocument {
    next_id: u64,
    metadata: BTreeMap<String, MetadataRecord>,
}

/// Errors that can occur during metadata store operations.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt metadata document: {0}")]
    Corrupt(String),
}

/// Durable mapping from vector id to descriptive record.
pub struct MetadataStore {
    path: PathBuf,
    next_id: u64,
    records: BTreeMap<VectorId, MetadataRecord>,
}

impl MetadataStore {
    /// Open the store at `path`, loading the document if it exists.
    pub fn open(path: PathBuf) -> Result<Self, MetadataError> {
        if !path.exists() {
            return Ok(Self {
                path,
                next_id: 0,
                records: BTreeMap::new(),
            });
        }

        let data = std::fs::read(&path)?;
        let document: MetadataDocument =
            serde_json::from_slice(&data).map_err(|e| MetadataError::Corrupt(e.to_string()))?;

        let mut records = BTreeMap::new();
        for (key, record) in document.metadata {
            let id: VectorId = key
                .parse()
                .map_err(|_| MetadataError::Corrupt(format!("non-numeric id key '{}'", key)))?;
            records.insert(id, record);
        }

        Ok(Self {
            path,
            next_id: document.next_id,
            records,
        })
    }

    /// Get the document file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The id the store expects to see assigned next.
    ///
    /// Diagnostic cross-check against the vector index's count.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Get the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or overwrite the record for `id`.
    pub fn put(&mut self, id: VectorId, record: MetadataRecord) {
        self.records.insert(id, record);
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }

    /// Get the record for `id`. Absence is a valid, non-error outcome.
    pub fn get(&self, id: VectorId) -> Option<&MetadataRecord> {
        self.records.get(&id)
    }

    /// Persist the full document.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(&self) -> Result<(), MetadataError> {
        let document = MetadataDocument {
            next_id: self.next_id,
            metadata: self
                .records
                .iter()
                .map(|(id, record)| (id.to_string(), record.clone()))
                .collect(),
        };

        let data = serde_json::to_vec_pretty(&document)
            .map_err(|e| MetadataError::Corrupt(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");

        if let Err(e) = write_and_sync(&temp_path, &data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn write_and_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> PathBuf {
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "audioseek-metadata-test-{}-{}.json",
            std::process::id(),
            counter
        ))
    }

    fn sample_record(text: &str) -> MetadataRecord {
        MetadataRecord {
            text: text.to_string(),
            source_path: format!("data/uploads/{}.wav", text),
            segments: vec![Segment {
                start_seconds: 0.0,
                end_seconds: 1.5,
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_open_missing_file_starts_empty() {
        let store = MetadataStore::open(temp_path()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.next_id(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let mut store = MetadataStore::open(temp_path()).unwrap();
        store.put(0, sample_record("dog barking"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().text, "dog barking");
        assert_eq!(store.next_id(), 1);
    }

    #[test]
    fn test_get_absent_is_none() {
        let store = MetadataStore::open(temp_path()).unwrap();
        assert!(store.get(42).is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let mut store = MetadataStore::open(temp_path()).unwrap();
        store.put(0, sample_record("first"));
        store.put(0, sample_record("second"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().text, "second");
        assert_eq!(store.next_id(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path();

        {
            let mut store = MetadataStore::open(path.clone()).unwrap();
            store.put(0, sample_record("rain"));
            store.put(1, sample_record("thunder"));
            store.save().unwrap();
        }

        let store = MetadataStore::open(path.clone()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.next_id(), 2);
        assert_eq!(store.get(0).unwrap().text, "rain");
        assert_eq!(store.get(1).unwrap().text, "thunder");
        assert_eq!(store.get(1).unwrap().segments.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_ids_serialized_as_decimal_strings() {
        let path = temp_path();

        let mut store = MetadataStore::open(path.clone()).unwrap();
        store.put(7, sample_record("x"));
        store.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["metadata"].get("7").is_some());
        assert_eq!(value["next_id"], 8);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_document_rejected() {
        let path = temp_path();
        std::fs::write(&path, b"{ not json").unwrap();

        let result = MetadataStore::open(path.clone());
        assert!(matches!(result, Err(MetadataError::Corrupt(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_non_numeric_key_rejected() {
        let path = temp_path();
        std::fs::write(
            &path,
            br#"{ "next_id": 1, "metadata": { "abc": { "text": "", "source_path": "", "segments": [] } } }"#,
        )
        .unwrap();

        let result = MetadataStore::open(path.clone());
        assert!(matches!(result, Err(MetadataError::Corrupt(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_large_id_round_trips() {
        let path = temp_path();

        let mut store = MetadataStore::open(path.clone()).unwrap();
        let big = u64::MAX - 1;
        store.put(big, sample_record("edge"));
        store.save().unwrap();

        let store = MetadataStore::open(path.clone()).unwrap();
        assert_eq!(store.get(big).unwrap().text, "edge");
        assert_eq!(store.next_id(), u64::MAX);

        let _ = std::fs::remove_file(&path);
    }
}
