//! Firestore REST API client.
//!
//! Covers the calls the record store needs: document get/create/patch,
//! atomic commits with preconditions, structured queries and count
//! aggregations. Reads are retried with backoff. Writes are not, since
//! their preconditions decide the outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use tracing::{info_span, Instrument};

use super::error::{FirestoreError, FirestoreResult};
use super::metrics::record_request;
use super::retry::{with_retry, RetryConfig};
use super::token_cache::{TokenCache, TokenSource};
use super::types::{
    Aggregation, CommitRequest, CommitResponse, CountAggregation, Document,
    FromFirestoreValue, RunAggregationQueryRequest, RunAggregationQueryResponse, RunQueryRequest,
    RunQueryResponse, StructuredAggregationQuery, StructuredQuery, Value, Write,
};

const PRODUCTION_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Token accepted by the Firestore emulator.
const EMULATOR_TOKEN: &str = "owner";

const COUNT_ALIAS: &str = "total";

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    /// `host:port` of a local emulator. Skips service account auth.
    pub emulator_host: Option<String>,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.trim().is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.trim().is_empty()),
        })
    }
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    documents_url: String,
    token_cache: Arc<TokenCache>,
}

impl FirestoreClient {
    /// Connect to Firestore, or to the emulator when one is configured.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        match config.emulator_host.clone() {
            Some(host) => {
                let endpoint = format!("http://{}", host);
                Self::with_endpoint(config, &endpoint, TokenSource::Static(EMULATOR_TOKEN.to_string()))
            }
            None => {
                let auth = Self::create_auth_provider()?;
                Self::with_endpoint(config, PRODUCTION_ENDPOINT, TokenSource::Provider(auth))
            }
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    /// Client against an explicit endpoint and token source.
    pub fn with_endpoint(config: FirestoreConfig, endpoint: &str, tokens: TokenSource) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vgen-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let documents_url = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            endpoint.trim_end_matches('/'),
            config.project_id,
            config.database_id
        );

        Ok(Self {
            http,
            config,
            documents_url,
            token_cache: Arc::new(TokenCache::new(tokens)),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env()
            .map_err(|e| FirestoreError::auth_error(format!("Failed to load service account: {}", e)))?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// `projects/{p}/databases/{d}/documents/{collection}/{id}`, as used in commits.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, collection, urlencoding::encode(doc_id))
    }

    // =========================================================================
    // Document operations
    // =========================================================================

    /// Fetch a document. `Ok(None)` when it does not exist.
    pub async fn get_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<Option<Document>> {
        let url = self.document_url(collection, doc_id);

        self.execute("get_document", collection, Some(doc_id), async {
            with_retry(&self.config.retry, "get_document", || async {
                let response = self.send(Method::GET, &url, None::<&()>).await?;
                match response.status() {
                    StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                    StatusCode::NOT_FOUND => Ok(None),
                    _ => Err(Self::error_from(&url, response).await),
                }
            })
            .await
        })
        .await
    }

    /// Create a document with a caller-chosen id.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        let url = format!(
            "{}/{}?documentId={}",
            self.documents_url,
            collection,
            urlencoding::encode(doc_id)
        );
        let body = Document::new(fields);

        self.execute("create_document", collection, Some(doc_id), async {
            let response = self.send(Method::POST, &url, Some(&body)).await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json::<Document>().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!("{}/{}", collection, doc_id))),
                _ => Err(Self::error_from(&url, response).await),
            }
        })
        .await
    }

    /// Patch the masked fields, optionally requiring the document's update time.
    pub async fn patch_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: &[&str],
        update_time: Option<&str>,
    ) -> FirestoreResult<Document> {
        let mut params: Vec<String> = update_mask
            .iter()
            .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
            .collect();
        match update_time {
            Some(ts) => params.push(format!("currentDocument.updateTime={}", urlencoding::encode(ts))),
            None => params.push("currentDocument.exists=true".to_string()),
        }
        let url = format!("{}?{}", self.document_url(collection, doc_id), params.join("&"));
        let body = Document::new(fields);

        self.execute("patch_document", collection, Some(doc_id), async {
            let response = self.send(Method::PATCH, &url, Some(&body)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json::<Document>().await?),
                StatusCode::NOT_FOUND => Err(FirestoreError::not_found(format!("{}/{}", collection, doc_id))),
                _ => Err(Self::error_from(&url, response).await),
            }
        })
        .await
    }

    /// Apply writes atomically. Any failed precondition aborts all of them.
    pub async fn commit(&self, writes: Vec<Write>) -> FirestoreResult<CommitResponse> {
        if writes.len() > 500 {
            return Err(FirestoreError::request_failed("Commit exceeds 500 write limit"));
        }

        let url = format!("{}:commit", self.documents_url);
        let body = CommitRequest { writes };

        self.execute("commit", "commit", None, async {
            let response = self.send(Method::POST, &url, Some(&body)).await?;
            match response.status() {
                StatusCode::OK => Ok(response.json::<CommitResponse>().await?),
                _ => Err(Self::error_from(&url, response).await),
            }
        })
        .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Run a structured query over top-level collections.
    pub async fn run_query(&self, query: StructuredQuery) -> FirestoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = RunQueryRequest {
            structured_query: query,
        };
        let collection = body
            .structured_query
            .from
            .first()
            .map(|c| c.collection_id.clone())
            .unwrap_or_default();

        self.execute("run_query", &collection, None, async {
            with_retry(&self.config.retry, "run_query", || async {
                let response = self.send(Method::POST, &url, Some(&body)).await?;
                if response.status() != StatusCode::OK {
                    return Err(Self::error_from(&url, response).await);
                }
                let responses: Vec<RunQueryResponse> = response.json().await?;
                Ok(responses.into_iter().filter_map(|r| r.document).collect())
            })
            .await
        })
        .await
    }

    /// Count documents matching a query without fetching them.
    pub async fn count(&self, query: StructuredQuery) -> FirestoreResult<u64> {
        let url = format!("{}:runAggregationQuery", self.documents_url);
        let body = RunAggregationQueryRequest {
            structured_aggregation_query: StructuredAggregationQuery {
                structured_query: query,
                aggregations: vec![Aggregation {
                    alias: COUNT_ALIAS.to_string(),
                    count: CountAggregation::default(),
                }],
            },
        };

        self.execute("count", "aggregation", None, async {
            with_retry(&self.config.retry, "count", || async {
                let response = self.send(Method::POST, &url, Some(&body)).await?;
                if response.status() != StatusCode::OK {
                    return Err(Self::error_from(&url, response).await);
                }
                let responses: Vec<RunAggregationQueryResponse> = response.json().await?;
                responses
                    .iter()
                    .filter_map(|r| r.result.as_ref())
                    .filter_map(|r| r.aggregate_fields.as_ref())
                    .filter_map(|fields| fields.get(COUNT_ALIAS))
                    .find_map(u64::from_firestore_value)
                    .ok_or_else(|| FirestoreError::InvalidResponse("aggregation returned no count".to_string()))
            })
            .await
        })
        .await
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn build<B: Serialize + ?Sized>(&self, method: Method, url: &str, body: Option<&B>, token: &str) -> reqwest::RequestBuilder {
        let request = self.http.request(method, url).bearer_auth(token);
        match body {
            Some(b) => request.json(b),
            None => request,
        }
    }

    /// Send once, refreshing the token and resending if it had expired.
    async fn send<B: Serialize + ?Sized>(&self, method: Method, url: &str, body: Option<&B>) -> FirestoreResult<Response> {
        let token = self.token_cache.get_token().await?;
        let response = self.build(method.clone(), url, body, &token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&text) {
            return Err(FirestoreError::from_http_status(401, format!("{} failed: {}", url, text)));
        }

        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(self.build(method, url, body, &token).send().await?)
    }

    async fn error_from(url: &str, response: Response) -> FirestoreError {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            if let Some(ms) = retry_after_ms {
                return FirestoreError::RateLimited(ms);
            }
        }
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }

    /// Trace and time a request.
    async fn execute<T, F>(&self, operation: &str, collection: &str, doc_id: Option<&str>, fut: F) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = %operation,
            collection = %collection,
            doc_id = doc_id.unwrap_or("")
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, start.elapsed().as_secs_f64());

        result
    }
}
