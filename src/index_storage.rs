//! Binary storage for the vector index.
//!
//! File format: vectors.bin
//!
//! Header (15 bytes):
//! - version: u8 (1)
//! - dimension: u16 (little-endian)
//! - count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Body: count * dimension f32 values (little-endian), in id order.
//! Vectors are written already normalized; loading does not re-normalize.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::index::VectorIndex;

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + dimension(2) + count(8) + checksum(4)
const HEADER_SIZE: usize = 15;

/// Largest dimension the header's u16 field can represent
pub const MAX_DIMENSION: usize = u16::MAX as usize;

/// Errors that can occur during index storage operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Dimension {got} exceeds the file format maximum {max}")]
    DimensionTooLarge { got: usize, max: usize },
}

/// Storage manager for the on-disk vector table.
pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    /// Create a new storage manager for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the storage file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the storage file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the vector index from storage.
    ///
    /// The file's declared dimension must equal `expected_dimension`;
    /// a truncated body or trailing bytes are treated as corruption.
    pub fn load(&self, expected_dimension: usize) -> Result<VectorIndex, IndexStorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = self.read_header(&mut reader)?;

        if header.dimension as usize != expected_dimension {
            return Err(IndexStorageError::DimensionMismatch {
                expected: expected_dimension,
                got: header.dimension as usize,
            });
        }

        let mut index =
            VectorIndex::with_capacity(header.dimension as usize, header.count as usize);

        for _ in 0..header.count {
            let vector = self.read_vector(&mut reader, header.dimension as usize)?;
            index
                .push_normalized(vector)
                .map_err(|e| IndexStorageError::InvalidFormat(e.to_string()))?;
        }

        // Anything past the declared count means the header lies
        let mut trailing = [0u8; 1];
        match reader.read(&mut trailing)? {
            0 => Ok(index),
            _ => Err(IndexStorageError::InvalidFormat(
                "trailing data after declared vector count".to_string(),
            )),
        }
    }

    /// Save the vector index to storage.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(&self, index: &VectorIndex) -> Result<(), IndexStorageError> {
        // The header stores the dimension as u16; anything wider would be
        // silently truncated and make the file unreadable
        if index.dimension() > MAX_DIMENSION {
            return Err(IndexStorageError::DimensionTooLarge {
                got: index.dimension(),
                max: MAX_DIMENSION,
            });
        }

        let temp_path = self.path.with_extension("tmp");

        let result = self.write_to_file(&temp_path, index);

        if result.is_err() {
            // Clean up temp file on error
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        // Atomic rename
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Write index to a file.
    fn write_to_file(&self, path: &Path, index: &VectorIndex) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = Header {
            version: FORMAT_VERSION,
            dimension: index.dimension() as u16,
            count: index.len() as u64,
        };
        self.write_header(&mut writer, &header)?;

        for (_, vector) in index.iter() {
            for &value in vector {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }

    /// Read and validate the header.
    fn read_header(&self, reader: &mut BufReader<File>) -> Result<Header, IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;

        let version = header_bytes[0];

        // Version check first
        if version > FORMAT_VERSION {
            return Err(IndexStorageError::VersionMismatch(version, FORMAT_VERSION));
        }

        let dimension = u16::from_le_bytes([header_bytes[1], header_bytes[2]]);
        let count = u64::from_le_bytes([
            header_bytes[3],
            header_bytes[4],
            header_bytes[5],
            header_bytes[6],
            header_bytes[7],
            header_bytes[8],
            header_bytes[9],
            header_bytes[10],
        ]);
        let stored_checksum = u32::from_le_bytes([
            header_bytes[11],
            header_bytes[12],
            header_bytes[13],
            header_bytes[14],
        ]);

        // Checksum computed over header without checksum field
        let computed_checksum = crc32fast::hash(&header_bytes[0..11]);
        if stored_checksum != computed_checksum {
            return Err(IndexStorageError::ChecksumMismatch);
        }

        Ok(Header {
            version,
            dimension,
            count,
        })
    }

    /// Write the header.
    fn write_header(
        &self,
        writer: &mut BufWriter<File>,
        header: &Header,
    ) -> Result<(), IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];

        header_bytes[0] = header.version;
        header_bytes[1..3].copy_from_slice(&header.dimension.to_le_bytes());
        header_bytes[3..11].copy_from_slice(&header.count.to_le_bytes());

        let checksum = crc32fast::hash(&header_bytes[0..11]);
        header_bytes[11..15].copy_from_slice(&checksum.to_le_bytes());

        writer.write_all(&header_bytes)?;
        Ok(())
    }

    /// Read a single vector from the body.
    fn read_vector(
        &self,
        reader: &mut BufReader<File>,
        dimension: usize,
    ) -> Result<Vec<f32>, IndexStorageError> {
        let mut vector = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            let mut float_bytes = [0u8; 4];
            reader.read_exact(&mut float_bytes)?;
            vector.push(f32::from_le_bytes(float_bytes));
        }
        Ok(vector)
    }
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    dimension: u16,
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> PathBuf {
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "audioseek-vectors-test-{}-{}.bin",
            std::process::id(),
            counter
        ))
    }

    #[test]
    fn test_save_and_load_empty() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let index = VectorIndex::new(768);
        storage.save(&index).unwrap();

        assert!(storage.exists());

        let loaded = storage.load(768).unwrap();
        assert_eq!(loaded.len(), 0);
        assert_eq!(loaded.dimension(), 768);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_round_trip_preserves_normalized_vectors() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let mut index = VectorIndex::new(3);
        index.add(vec![3.0, 0.0, 4.0]).unwrap();
        index.add(vec![0.0, 1.0, 0.0]).unwrap();
        index.add(vec![0.0, 0.0, 0.0]).unwrap();

        storage.save(&index).unwrap();

        let loaded = storage.load(3).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), 3);

        for (id, vector) in index.iter() {
            let reloaded = loaded.get(id).unwrap();
            for (a, b) in vector.iter().zip(reloaded.iter()) {
                assert!((a - b).abs() < 1e-7);
            }
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_dimension_mismatch_on_load() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let index = VectorIndex::new(3);
        storage.save(&index).unwrap();

        let result = storage.load(768);
        assert!(matches!(
            result,
            Err(IndexStorageError::DimensionMismatch { expected: 768, got: 3 })
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let mut index = VectorIndex::new(3);
        index.add(vec![1.0, 0.0, 0.0]).unwrap();
        storage.save(&index).unwrap();

        // Flip a header byte
        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        use std::io::Seek;
        file.seek(std::io::SeekFrom::Start(4)).unwrap();
        file.write_all(&[0xFF]).unwrap();

        let result = storage.load(3);
        assert!(matches!(result, Err(IndexStorageError::ChecksumMismatch)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_truncated_body_rejected() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let mut index = VectorIndex::new(3);
        index.add(vec![1.0, 0.0, 0.0]).unwrap();
        index.add(vec![0.0, 1.0, 0.0]).unwrap();
        storage.save(&index).unwrap();

        // Chop off the last vector's tail
        let data = std::fs::read(&path).unwrap();
        std::fs::write(&path, &data[..data.len() - 6]).unwrap();

        let result = storage.load(3);
        assert!(matches!(result, Err(IndexStorageError::Io(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_trailing_data_rejected() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let mut index = VectorIndex::new(3);
        index.add(vec![1.0, 0.0, 0.0]).unwrap();
        storage.save(&index).unwrap();

        let mut data = std::fs::read(&path).unwrap();
        data.extend_from_slice(&[0u8; 4]);
        std::fs::write(&path, &data).unwrap();

        let result = storage.load(3);
        assert!(matches!(result, Err(IndexStorageError::InvalidFormat(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let index = VectorIndex::new(3);
        storage.save(&index).unwrap();

        let mut data = std::fs::read(&path).unwrap();
        data[0] = 99;
        std::fs::write(&path, &data).unwrap();

        let result = storage.load(3);
        assert!(matches!(result, Err(IndexStorageError::VersionMismatch(99, _))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_oversized_dimension_rejected_on_save() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        // 70000 does not fit the header's u16 field; saving must refuse
        // rather than truncate it and leave an unreadable file behind
        let mut index = VectorIndex::new(70_000);
        index.add(vec![0.5; 70_000]).unwrap();

        let result = storage.save(&index);
        assert!(matches!(
            result,
            Err(IndexStorageError::DimensionTooLarge { got: 70_000, max: MAX_DIMENSION })
        ));
        assert!(!storage.exists());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_max_dimension_round_trips() {
        let path = temp_path();
        let storage = IndexStorage::new(path.clone());

        let mut index = VectorIndex::new(MAX_DIMENSION);
        index.add(vec![1.0; MAX_DIMENSION]).unwrap();
        storage.save(&index).unwrap();

        let loaded = storage.load(MAX_DIMENSION).unwrap();
        assert_eq!(loaded.dimension(), MAX_DIMENSION);
        assert_eq!(loaded.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_write_cleans_up_on_error() {
        let path = PathBuf::from("/nonexistent/directory/vectors.bin");
        let storage = IndexStorage::new(path.clone());

        let index = VectorIndex::new(3);
        let result = storage.save(&index);

        assert!(result.is_err());
        // Temp file should be cleaned up
        assert!(!path.with_extension("tmp").exists());
    }
}
