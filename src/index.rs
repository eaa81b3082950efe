//! In-memory vector index with exact nearest-neighbor search.
//!
//! Stores fixed-dimension embeddings in a dense table, id order = insert
//! order. Search is brute-force squared-L2 over every stored vector.

/// Identifier assigned to a stored vector. Ids start at 0 and increment
/// by one per successful add; they are never reused.
pub type VectorId = u64;

/// A single search hit: stored vector id and squared-L2 distance to the
/// (normalized) query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: VectorId,
    pub distance: f32,
}

/// Append-only, fixed-dimension vector table.
///
/// Vectors are L2-normalized on insert so squared-L2 distance and cosine
/// similarity produce the same ordering. A zero-norm vector cannot be
/// normalized and is stored verbatim.
pub struct VectorIndex {
    /// Stored vectors, position == id
    vectors: Vec<Vec<f32>>,
    /// Expected embedding dimension
    dimension: usize,
}

impl VectorIndex {
    /// Create a new empty index for the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension,
        }
    }

    /// Create an index with pre-allocated capacity.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Self {
        Self {
            vectors: Vec::with_capacity(capacity),
            dimension,
        }
    }

    /// Get the fixed embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Normalize and append a vector, returning its assigned id.
    ///
    /// The assigned id equals the pre-insert count, so ids are dense and
    /// monotonically increasing. Fails only on dimension mismatch.
    pub fn add(&mut self, mut vector: Vec<f32>) -> Result<VectorId, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        normalize(&mut vector);

        let id = self.vectors.len() as VectorId;
        self.vectors.push(vector);
        Ok(id)
    }

    /// Append an already-normalized vector without re-normalizing.
    ///
    /// Used when loading from storage, where vectors were normalized
    /// before they were written.
    pub fn push_normalized(&mut self, vector: Vec<f32>) -> Result<VectorId, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        let id = self.vectors.len() as VectorId;
        self.vectors.push(vector);
        Ok(id)
    }

    /// Get a stored (normalized) vector by id.
    pub fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.vectors.get(id as usize).map(|v| v.as_slice())
    }

    /// Iterate over stored vectors in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VectorId, &[f32])> {
        self.vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i as VectorId, v.as_slice()))
    }

    /// Find the `k` nearest stored vectors to `query`.
    ///
    /// The query is normalized the same way stored vectors are. `k` is
    /// clamped to the number of stored vectors; an empty index yields an
    /// empty result, not an error.
    ///
    /// # Returns
    /// Results sorted by ascending squared-L2 distance; exact distance
    /// ties are broken by ascending id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let k = k.min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut results: Vec<SearchResult> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, stored)| SearchResult {
                id: i as VectorId,
                distance: squared_l2(&query, stored),
            })
            .collect();

        // Ascending distance, ascending id on exact ties
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        results.truncate(k);

        Ok(results)
    }
}

/// Scale a vector to unit L2 norm in place.
///
/// A zero-norm vector is left untouched: there is no direction to
/// preserve, so it is stored verbatim rather than rejected.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm < f32::EPSILON {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Squared Euclidean distance between two equal-length vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
