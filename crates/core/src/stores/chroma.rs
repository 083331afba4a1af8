use crate::error::RetrievalError;
use crate::models::{ChunkMetadata, EmbeddingRecord, SearchHit};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

const TENANT: &str = "default_tenant";
const DATABASE: &str = "default_database";

/// Vector index backed by a Chroma server over its REST API. Stateless:
/// the collection is resolved by name on every operation.
pub struct ChromaStore {
    client: Client,
    endpoint: String,
    collection: String,
}

impl ChromaStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Url::parse(&endpoint)?;

        Ok(Self {
            client: Client::new(),
            endpoint,
            collection: collection.into(),
        })
    }

    async fn resolve_collection_id(&self) -> Result<String, RetrievalError> {
        let response = self
            .client
            .post(format!(
                "{}/api/v1/tenants/{}/databases/{}/collections",
                self.endpoint, TENANT, DATABASE
            ))
            .json(&json!({
                "name": self.collection,
                "get_or_create": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RetrievalError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/id")
            .and_then(Value::as_str)
            .map(|id| id.to_string())
            .ok_or_else(|| RetrievalError::BackendResponse {
                backend: "chroma".to_string(),
                details: "collection response missing id".to_string(),
            })
    }
}

#[async_trait]
impl VectorIndex for ChromaStore {
    async fn ensure_ready(&self) -> Result<(), RetrievalError> {
        self.resolve_collection_id().await.map(|_| ())
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), RetrievalError> {
        if records.is_empty() {
            return Ok(());
        }

        let collection_id = self.resolve_collection_id().await?;

        let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
        let embeddings: Vec<&[f32]> = records
            .iter()
            .map(|record| record.vector.as_slice())
            .collect();
        let documents: Vec<&str> = records
            .iter()
            .map(|record| record.document.as_str())
            .collect();
        let metadatas = records
            .iter()
            .map(|record| serde_json::to_value(&record.metadata))
            .collect::<Result<Vec<_>, _>>()?;

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/upsert",
                self.endpoint, collection_id
            ))
            .json(&json!({
                "ids": ids,
                "embeddings": embeddings,
                "documents": documents,
                "metadatas": metadatas,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RetrievalError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        n_results: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let collection_id = self.resolve_collection_id().await?;

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/query",
                self.endpoint, collection_id
            ))
            .json(&json!({
                "query_embeddings": [vector],
                "n_results": n_results,
                "include": ["documents", "metadatas", "distances"],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RetrievalError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(hits_from_response(&parsed))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        let collection_id = self.resolve_collection_id().await?;

        let response = self
            .client
            .get(format!(
                "{}/api/v1/collections/{}/count",
                self.endpoint, collection_id
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RetrievalError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let count: usize = response.json().await?;
        Ok(count)
    }

    async fn drop_collection(&self) -> Result<(), RetrievalError> {
        let response = self
            .client
            .delete(format!(
                "{}/api/v1/tenants/{}/databases/{}/collections/{}",
                self.endpoint, TENANT, DATABASE, self.collection
            ))
            .send()
            .await?;

        // A collection that never existed is already dropped.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }

        Err(RetrievalError::BackendResponse {
            backend: "chroma".to_string(),
            details: response.status().to_string(),
        })
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }

    fn persist_location(&self) -> String {
        self.endpoint.clone()
    }
}

/// Chroma returns one row of parallel arrays per query embedding. Missing or
/// malformed fields degrade to defaults instead of failing the whole query.
fn hits_from_response(parsed: &Value) -> Vec<SearchHit> {
    let row = |key: &str| {
        parsed
            .pointer(&format!("/{key}/0"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    let documents = row("documents");
    let metadatas = row("metadatas");
    let distances = row("distances");

    let result_count = documents.len().max(distances.len());
    let mut hits = Vec::with_capacity(result_count);

    for index in 0..result_count {
        let document = documents
            .get(index)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata = metadatas
            .get(index)
            .cloned()
            .map(|value| serde_json::from_value::<ChunkMetadata>(value).unwrap_or_default())
            .unwrap_or_default();
        let distance = distances
            .get(index)
            .and_then(Value::as_f64)
            .unwrap_or_default() as f32;

        hits.push(SearchHit {
            document,
            metadata,
            distance,
        });
    }

    hits
}
