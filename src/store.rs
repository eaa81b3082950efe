//! Store facade combining the vector index and the metadata store.
//!
//! Owns both components behind a reader/writer lock: `add` runs under the
//! exclusive lock so id assignment and the two persisted writes never
//! interleave; `search` and `stats` run under the shared lock.
//!
//! Every successful `add` persists both files before returning. If a
//! persist fails after the in-memory vector append, the error is surfaced
//! as `PartialWrite` carrying the assigned id, so the caller knows the id
//! exists in memory but may not be durable.

use std::path::PathBuf;
use std::sync::RwLock;

use serde::Serialize;

use crate::config::StoreConfig;
use crate::index::{IndexError, VectorId, VectorIndex};
use crate::index_storage::{IndexStorage, IndexStorageError};
use crate::metadata::{MetadataError, MetadataRecord, MetadataStore, Segment};

/// Index file name within the data directory
const VECTORS_FILE: &str = "vectors.bin";
/// Metadata document name within the data directory
const METADATA_FILE: &str = "metadata.json";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Index storage error: {0}")]
    IndexStorage(#[from] IndexStorageError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error(
        "Corrupt state: index holds {vector_count} vectors but metadata expects next id {next_id}"
    )]
    CorruptState { vector_count: u64, next_id: u64 },

    #[error("Vector id {id} was assigned but may not be durable: {source}")]
    PartialWrite {
        id: VectorId,
        #[source]
        source: Box<StoreError>,
    },

    #[error("Internal error: lock poisoned")]
    LockPoisoned,
}

/// A fully joined search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: VectorId,
    /// Squared-L2 distance between normalized query and stored vector
    pub distance: f32,
    /// 1 / (1 + distance); 1.0 only on an exact match
    pub similarity_score: f32,
    pub text: String,
    pub source_path: String,
    pub segments: Vec<Segment>,
}

/// Read-only store statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub index_path: String,
}

struct StoreState {
    index: VectorIndex,
    index_storage: IndexStorage,
    metadata: MetadataStore,
}

/// Persistent vector store: exact nearest-neighbor index plus metadata.
///
/// Constructed once at startup and owned by whatever layer serves
/// queries; there is no ambient global instance.
pub struct Store {
    state: RwLock<StoreState>,
}

impl Store {
    /// Open (or create) a store in the configured data directory.
    ///
    /// Loads both persisted files if present and cross-checks them: the
    /// index vector count must equal the metadata document's `next_id`,
    /// otherwise the store refuses to start rather than guess which side
    /// lost data.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.data_dir).map_err(MetadataError::Io)?;

        let index_storage = IndexStorage::new(config.data_dir.join(VECTORS_FILE));

        let index = if index_storage.exists() {
            let index = index_storage.load(config.dimension)?;
            log::info!(
                "Loaded {} vectors from {}",
                index.len(),
                index_storage.path().display()
            );
            index
        } else {
            log::info!(
                "No existing index, creating empty (dimension={})",
                config.dimension
            );
            VectorIndex::new(config.dimension)
        };

        let metadata = MetadataStore::open(config.data_dir.join(METADATA_FILE))?;

        if index.len() as u64 != metadata.next_id() {
            return Err(StoreError::CorruptState {
                vector_count: index.len() as u64,
                next_id: metadata.next_id(),
            });
        }

        Ok(Self {
            state: RwLock::new(StoreState {
                index,
                index_storage,
                metadata,
            }),
        })
    }

    /// Add one embedding with its metadata, returning the assigned id.
    ///
    /// Both persisted files are written before this returns. Runs under
    /// the exclusive lock: two concurrent adds can never assign the same
    /// id or interleave their writes.
    pub fn add(
        &self,
        embedding: Vec<f32>,
        record: MetadataRecord,
    ) -> Result<VectorId, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;

        // Dimension check happens here, before anything is mutated
        let id = state.index.add(embedding)?;

        if let Err(e) = state.index_storage.save(&state.index) {
            return Err(StoreError::PartialWrite {
                id,
                source: Box::new(e.into()),
            });
        }

        state.metadata.put(id, record);

        if let Err(e) = state.metadata.save() {
            return Err(StoreError::PartialWrite {
                id,
                source: Box::new(e.into()),
            });
        }

        log::debug!("Stored vector {} ({} total)", id, state.index.len());
        Ok(id)
    }

    /// Find the `k` nearest stored vectors and join them with metadata.
    ///
    /// A vector whose metadata record is missing still produces a
    /// well-formed hit with empty text/source_path/segments.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;

        let results = state.index.search(query, k)?;

        let hits = results
            .into_iter()
            .map(|r| {
                let record = state.metadata.get(r.id).cloned().unwrap_or_default();
                SearchHit {
                    id: r.id,
                    distance: r.distance,
                    similarity_score: 1.0 / (1.0 + r.distance),
                    text: record.text,
                    source_path: record.source_path,
                    segments: record.segments,
                }
            })
            .collect();

        Ok(hits)
    }

    /// Read-only statistics about the store.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;

        Ok(StoreStats {
            total_vectors: state.index.len(),
            dimension: state.index.dimension(),
            index_path: state.index_storage.path().display().to_string(),
        })
    }

    /// Path of the metadata document (for diagnostics).
    pub fn metadata_path(&self) -> Result<PathBuf, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.metadata.path().to_path_buf())
    }
}
