//! Persistent vector similarity store for audio-derived embeddings.
//!
//! Stores fixed-dimension embeddings in an exact (brute-force) nearest
//! neighbor index and attaches a metadata record to every stored vector.
//! Both sides are persisted on every add, and reloading cross-checks them
//! against each other.
//!
//! # Architecture
//!
//! - `index`: in-memory dense vector table with squared-L2 k-NN search
//! - `index_storage`: binary file I/O for vectors.bin persistence
//! - `metadata`: id -> record mapping persisted as metadata.json
//! - `store`: facade owning both, with the add/search/stats surface
//! - `config`: YAML config file handling

pub mod config;
pub mod index;
pub mod index_storage;
pub mod metadata;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use index::{IndexError, SearchResult, VectorId, VectorIndex};
pub use index_storage::{IndexStorage, IndexStorageError};
pub use metadata::{MetadataError, MetadataRecord, MetadataStore, Segment};
pub use store::{SearchHit, Store, StoreError, StoreStats};
