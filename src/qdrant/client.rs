//! HTTP client wrapper for interacting with Qdrant.

use crate::config::Config;
use crate::qdrant::{
    filters::build_namespace_filter,
    payload::{NAMESPACE_KEY, PAGE_KEY, build_payload, point_id},
    types::{
        BatchOutcome, IndexRecord, QdrantError, QueryResponse, QueryResponseResult, ScoredPoint,
        UpsertReport,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Maximum records sent in one upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Storage operations the query and ingestion pipelines depend on.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write records into `namespace`, batching them to bound request size.
    async fn upsert(&self, namespace: &str, records: Vec<IndexRecord>) -> UpsertReport;

    /// Return up to `top_k` nearest records in `namespace`, best match first, with payloads.
    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<ScoredPoint>, QdrantError>;
}

/// Lightweight HTTP client bound to one Qdrant collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) collection: String,
}

impl QdrantService {
    /// Construct a new client from configuration.
    pub fn new(config: &Config) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("echo-study/0.1").build()?;

        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %config.index_name,
            has_api_key = !config.qdrant_api_key.is_empty(),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
            collection: config.index_name.clone(),
        })
    }

    /// Name of the collection this client reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection and its payload indexes unless they already exist.
    ///
    /// Calling this repeatedly is harmless.
    pub async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        if self.collection_exists().await? {
            tracing::debug!(collection = %self.collection, "Collection already present");
        } else {
            tracing::info!(
                collection = %self.collection,
                vector_size,
                "Creating collection"
            );
            self.create_collection(vector_size).await?;
        }
        self.ensure_payload_indexes().await
    }

    async fn create_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))
            .json(&body)
            .send()
            .await?;

        // Another process may have created it between the existence check and this call.
        if response.status() == StatusCode::CONFLICT {
            tracing::debug!(collection = %self.collection, "Collection created concurrently");
            return Ok(());
        }

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Collection created");
        })
        .await
    }

    /// Ensure keyword/integer payload indexes exist for the filtered fields.
    async fn ensure_payload_indexes(&self) -> Result<(), QdrantError> {
        let fields: [(&str, &str); 2] = [(NAMESPACE_KEY, "keyword"), (PAGE_KEY, "integer")];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{}/index", self.collection))
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() || response.status() == StatusCode::CONFLICT {
                tracing::debug!(
                    collection = %self.collection,
                    field,
                    schema,
                    "Payload index ensured"
                );
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, field, error = %error, "Failed to ensure payload index");
                return Err(error);
            }
        }

        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    async fn upsert_batch(&self, namespace: &str, batch: &[IndexRecord]) -> Result<(), QdrantError> {
        let points: Vec<Value> = batch
            .iter()
            .map(|record| {
                json!({
                    "id": point_id(&record.id),
                    "vector": record.vector,
                    "payload": build_payload(&record.id, namespace, &record.metadata),
                })
            })
            .collect();

        let response = self
            .request(Method::PUT, &format!("collections/{}/points", self.collection))
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = %self.collection,
                namespace,
                points = batch.len(),
                "Points upserted"
            );
        })
        .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if !self.api_key.is_empty() {
            req = req.header("api-key", &self.api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantService {
    async fn upsert(&self, namespace: &str, records: Vec<IndexRecord>) -> UpsertReport {
        let mut report = UpsertReport::default();
        for (batch, chunk) in records.chunks(UPSERT_BATCH_SIZE).enumerate() {
            let error = match self.upsert_batch(namespace, chunk).await {
                Ok(()) => None,
                Err(error) => {
                    tracing::warn!(
                        collection = %self.collection,
                        batch,
                        records = chunk.len(),
                        error = %error,
                        "Upsert batch rejected"
                    );
                    Some(error.to_string())
                }
            };
            report.batches.push(BatchOutcome {
                batch,
                records: chunk.len(),
                error,
            });
        }
        report
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let (Some(filter), Some(obj)) = (build_namespace_filter(namespace), body.as_object_mut())
        {
            obj.insert("filter".into(), filter);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let mut results: Vec<ScoredPoint> = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload.unwrap_or_default(),
            })
            .collect();
        results.truncate(top_k);

        tracing::debug!(
            collection = %self.collection,
            namespace,
            top_k,
            hits = results.len(),
            "Search completed"
        );
        Ok(results)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
