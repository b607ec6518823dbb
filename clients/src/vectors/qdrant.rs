use super::{Neighbor, PainPoint, SimilarityStore, VECTOR_WIDTH};
use crate::Result;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
    point_id::PointIdOptions, value::Kind,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashMap;

const COLLECTION: &str = "pain_point_research";

/// Qdrant-backed similarity store. One shared collection holds every
/// project's pain points; all operations filter on the `project_id` payload
/// field.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connects and creates the collection if it does not exist yet.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        let store = Self {
            client,
            collection: COLLECTION.to_string(),
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<()> {
        if self.client.collection_exists(&self.collection).await? {
            tracing::debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(VECTOR_WIDTH, Distance::Cosine)),
            )
            .await?;
        tracing::info!(collection = %self.collection, "collection created");
        Ok(())
    }

    fn project_filter(project_id: &str) -> Filter {
        Filter::all([Condition::matches("project_id", project_id.to_string())])
    }
}

#[async_trait]
impl SimilarityStore for QdrantStore {
    async fn upsert(&self, project_id: &str, point: &PainPoint, vector: Vec<f32>) -> Result<()> {
        let mut payload = Payload::new();
        payload.insert("project_id", project_id);
        payload.insert("content", point.content.as_str());
        payload.insert("category", point.category.as_str());
        payload.insert("sources_post", point.sources_post.as_str());

        self.client
            .upsert_points(UpsertPointsBuilder::new(
                &self.collection,
                vec![PointStruct::new(point.id.clone(), vector, payload)],
            ))
            .await?;
        Ok(())
    }

    async fn nearest(
        &self,
        project_id: &str,
        vector: Vec<f32>,
        threshold: f32,
    ) -> Result<Option<Neighbor>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, 1)
                    .filter(Self::project_filter(project_id))
                    .score_threshold(threshold),
            )
            .await?;

        Ok(response.result.into_iter().next().map(|point| Neighbor {
            id: point.id.map(point_id_string).unwrap_or_default(),
            score: point.score,
        }))
    }

    async fn scan_all(&self, project_id: &str) -> Result<Vec<PainPoint>> {
        // Count first, then request exactly that many records.
        let total = self.count(project_id).await?;

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .filter(Self::project_filter(project_id))
                    .limit(total.max(1) as u32)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await?;

        Ok(response
            .result
            .into_iter()
            .map(|point| PainPoint {
                id: point.id.map(point_id_string).unwrap_or_default(),
                content: payload_str(&point.payload, "content"),
                category: payload_str(&point.payload, "category"),
                sources_post: payload_str(&point.payload, "sources_post"),
            })
            .collect())
    }

    async fn count(&self, project_id: &str) -> Result<u64> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(Self::project_filter(project_id))
                    .exact(true),
            )
            .await?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}

fn point_id_string(id: PointId) -> String {
    match id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
    match payload.get(key).and_then(|value| value.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}
