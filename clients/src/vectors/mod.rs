use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod qdrant;
pub use qdrant::QdrantStore;

/// Similarity at or above which a candidate counts as a near-duplicate of
/// already-stored content.
pub const DUPLICATE_THRESHOLD: f32 = 0.8;
/// Width of the embedding vectors the store collection is created for.
pub const VECTOR_WIDTH: u64 = 1024;

/// A user-reported problem extracted from discussion content. The id is
/// content-addressed, so identical text maps to the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PainPoint {
    pub id: String,
    pub content: String,
    pub category: String,
    pub sources_post: String,
}

/// Result of a nearest-neighbor lookup.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub id: String,
    pub score: f32,
}

/// Nearest-neighbor store scoped by project id. Reads and writes for
/// different projects never see each other.
#[async_trait]
pub trait SimilarityStore {
    /// Inserts or overwrites a record by id.
    async fn upsert(&self, project_id: &str, point: &PainPoint, vector: Vec<f32>) -> Result<()>;

    /// Nearest stored neighbor for `vector` within `project_id`, if any
    /// scores at or above `threshold`.
    async fn nearest(
        &self,
        project_id: &str,
        vector: Vec<f32>,
        threshold: f32,
    ) -> Result<Option<Neighbor>>;

    /// Every record stored for `project_id`.
    async fn scan_all(&self, project_id: &str) -> Result<Vec<PainPoint>>;

    async fn count(&self, project_id: &str) -> Result<u64>;
}
