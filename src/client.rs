//! HTTP client for the RAG backend.
//!
//! [`RagApi`] is the seam both controllers depend on; [`HttpClient`] is the
//! reqwest implementation used by `ragc`. Tests substitute in-memory fakes.
//!
//! # Endpoints
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `GET` | `/info` | - |
//! | `GET` / `DELETE` | `/projects/{name}` | - |
//! | `POST` | `/projects/{name}/chat` | `{question, id?, k, score}` |
//! | `GET` | `/projects/{name}/embeddings` | - |
//! | `POST` | `/projects/{name}/embeddings/search` | `{text, k, score}` or `{source}` |
//! | `GET` | `/projects/{name}/embeddings/source/{b64}` | - |
//! | `DELETE` | `/projects/{name}/embeddings/{b64}` | - |
//! | `POST` | `/projects/{name}/embeddings/reset` | - |
//! | `POST` | `/projects/{name}/embeddings/ingest/{upload,url,text}` | multipart / JSON |
//! | `GET` | `/statistics/top-projects?limit=N` | - |
//!
//! Every request carries the `Authorization` header produced by the
//! configured [`Credentials`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ChatResponse, EmbeddingList, InfoCatalog, IngestionResult, ProjectMetadata, SourceRecord,
    TopProjects,
};

// ============ Credentials ============

/// Supplies the `Authorization` header value for every request.
pub trait Credentials: Send + Sync {
    /// Full header value (e.g. `"Basic dXNlcjpwYXNz"`), or `None` to send no header.
    fn authorization(&self) -> Option<String>;
}

/// Sends no `Authorization` header.
pub struct Anonymous;

impl Credentials for Anonymous {
    fn authorization(&self) -> Option<String> {
        None
    }
}

/// HTTP basic auth.
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Credentials for BasicAuth {
    fn authorization(&self) -> Option<String> {
        let raw = format!("{}:{}", self.username, self.password);
        Some(format!("Basic {}", STANDARD.encode(raw.as_bytes())))
    }
}

/// Bearer token auth.
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Credentials for BearerToken {
    fn authorization(&self) -> Option<String> {
        Some(format!("Bearer {}", self.0))
    }
}

// ============ Request bodies ============

/// Body of `POST /projects/{name}/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub question: String,
    /// Thread id of the previous turn. Omitted on the first turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub k: u32,
    pub score: f64,
}

/// Body of `POST /projects/{name}/embeddings/search`.
///
/// Serialized untagged, so a source lookup carries only `{"source": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchRequest {
    Text { text: String, k: u32, score: f64 },
    Source { source: String },
}

/// Body of `POST /projects/{name}/embeddings/ingest/url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlIngestRequest {
    pub url: String,
}

/// Body of `POST /projects/{name}/embeddings/ingest/text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextIngestRequest {
    pub text: String,
    pub source: String,
    /// Omitted when empty so the backend extracts keywords itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming the upload after its final path component.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Encode a source identifier for use as a single path segment.
///
/// Standard alphabet with padding, so the output may contain `/` (e.g. a
/// source containing `???` encodes to `Pz8/`). Such sources split into two
/// segments and reach a different route.
pub fn encode_source(source: &str) -> String {
    STANDARD.encode(source.as_bytes())
}

// ============ RagApi ============

/// Backend operations used by the console controllers.
#[async_trait]
pub trait RagApi: Send + Sync {
    async fn info(&self) -> ApiResult<InfoCatalog>;
    async fn project(&self, name: &str) -> ApiResult<ProjectMetadata>;
    async fn delete_project(&self, name: &str) -> ApiResult<()>;
    async fn chat(&self, project: &str, request: &ChatRequest) -> ApiResult<ChatResponse>;
    async fn list_embeddings(&self, project: &str) -> ApiResult<EmbeddingList>;
    async fn search_embeddings(
        &self,
        project: &str,
        request: &SearchRequest,
    ) -> ApiResult<EmbeddingList>;
    async fn inspect_source(&self, project: &str, source: &str) -> ApiResult<SourceRecord>;
    async fn delete_source(&self, project: &str, source: &str) -> ApiResult<()>;
    async fn reset_embeddings(&self, project: &str) -> ApiResult<()>;
    async fn ingest_file(&self, project: &str, file: &FileUpload) -> ApiResult<IngestionResult>;
    async fn ingest_url(
        &self,
        project: &str,
        request: &UrlIngestRequest,
    ) -> ApiResult<IngestionResult>;
    async fn ingest_text(
        &self,
        project: &str,
        request: &TextIngestRequest,
    ) -> ApiResult<IngestionResult>;
    async fn top_projects(&self, limit: u32) -> ApiResult<TopProjects>;
}

// ============ HttpClient ============

/// reqwest-backed [`RagApi`].
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Arc<dyn Credentials>,
}

impl HttpClient {
    /// Create a client. `timeout` of `None` waits indefinitely.
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn Credentials>,
        timeout: Option<Duration>,
    ) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: builder.build()?,
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = match config.server.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let client = Self::new(&config.server.base_url, config.credentials()?, timeout)?;
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "backend request");
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.credentials.authorization() {
            Some(value) => builder.header(reqwest::header::AUTHORIZATION, value),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = check_status(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> ApiResult<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`ApiError::Status`], preferring the
/// backend's `{"detail": ...}` message over the reason phrase.
async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    Err(ApiError::status(status.as_u16(), detail))
}

#[async_trait]
impl RagApi for HttpClient {
    async fn info(&self) -> ApiResult<InfoCatalog> {
        self.send_json(self.request(Method::GET, "/info")).await
    }

    async fn project(&self, name: &str) -> ApiResult<ProjectMetadata> {
        self.send_json(self.request(Method::GET, &format!("/projects/{}", name)))
            .await
    }

    async fn delete_project(&self, name: &str) -> ApiResult<()> {
        self.send_empty(self.request(Method::DELETE, &format!("/projects/{}", name)))
            .await
    }

    async fn chat(&self, project: &str, request: &ChatRequest) -> ApiResult<ChatResponse> {
        let builder = self
            .request(Method::POST, &format!("/projects/{}/chat", project))
            .json(request);
        self.send_json(builder).await
    }

    async fn list_embeddings(&self, project: &str) -> ApiResult<EmbeddingList> {
        self.send_json(self.request(Method::GET, &format!("/projects/{}/embeddings", project)))
            .await
    }

    async fn search_embeddings(
        &self,
        project: &str,
        request: &SearchRequest,
    ) -> ApiResult<EmbeddingList> {
        let builder = self
            .request(
                Method::POST,
                &format!("/projects/{}/embeddings/search", project),
            )
            .json(request);
        self.send_json(builder).await
    }

    async fn inspect_source(&self, project: &str, source: &str) -> ApiResult<SourceRecord> {
        let path = format!(
            "/projects/{}/embeddings/source/{}",
            project,
            encode_source(source)
        );
        let mut record: SourceRecord = self.send_json(self.request(Method::GET, &path)).await?;
        record.source = source.to_string();
        Ok(record)
    }

    async fn delete_source(&self, project: &str, source: &str) -> ApiResult<()> {
        let path = format!("/projects/{}/embeddings/{}", project, encode_source(source));
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn reset_embeddings(&self, project: &str) -> ApiResult<()> {
        self.send_empty(self.request(
            Method::POST,
            &format!("/projects/{}/embeddings/reset", project),
        ))
        .await
    }

    async fn ingest_file(&self, project: &str, file: &FileUpload) -> ApiResult<IngestionResult> {
        let part =
            reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self
            .request(
                Method::POST,
                &format!("/projects/{}/embeddings/ingest/upload", project),
            )
            .multipart(form);
        self.send_json(builder).await
    }

    async fn ingest_url(
        &self,
        project: &str,
        request: &UrlIngestRequest,
    ) -> ApiResult<IngestionResult> {
        let builder = self
            .request(
                Method::POST,
                &format!("/projects/{}/embeddings/ingest/url", project),
            )
            .json(request);
        self.send_json(builder).await
    }

    async fn ingest_text(
        &self,
        project: &str,
        request: &TextIngestRequest,
    ) -> ApiResult<IngestionResult> {
        let builder = self
            .request(
                Method::POST,
                &format!("/projects/{}/embeddings/ingest/text", project),
            )
            .json(request);
        self.send_json(builder).await
    }

    async fn top_projects(&self, limit: u32) -> ApiResult<TopProjects> {
        let builder = self
            .request(Method::GET, "/statistics/top-projects")
            .query(&[("limit", limit)]);
        self.send_json(builder).await
    }
}
