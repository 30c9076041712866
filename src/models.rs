//! Data types exchanged with the RAG backend and held by the controllers.
//!
//! Backend payloads are decoded leniently: optional or missing fields fall
//! back to their defaults instead of failing the whole response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Corpus size at which full listing gives way to search-only mode.
pub const LISTING_THRESHOLD: u64 = 20_000;

/// Answer recorded for a chat turn whose request failed.
pub const CHAT_FAILURE_ANSWER: &str = "Error, something went wrong with my transistors.";

/// One question/answer exchange in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    /// Server thread id. Empty until the server has issued one.
    pub thread_id: String,
    pub question: String,
    /// `None` while the request is in flight.
    pub answer: Option<String>,
    pub sources: Vec<Value>,
}

impl ConversationTurn {
    pub fn pending(thread_id: String, question: String) -> Self {
        Self {
            thread_id,
            question,
            answer: None,
            sources: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.answer.is_none()
    }
}

/// Snapshot of `GET /projects/{name}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProjectMetadata {
    pub name: String,
    /// LLM name.
    pub llm: String,
    pub llm_type: Option<String>,
    pub llm_privacy: Option<String>,
    pub vectorstore: Option<String>,
    /// Embedding model name.
    pub embeddings: Option<String>,
    /// System prompt.
    pub system: Option<String>,
    pub k: Option<u32>,
    pub score: Option<f64>,
    /// Number of documents in the vector store. `None` when not reported.
    pub documents: Option<u64>,
    pub metadatas: Option<u64>,
    pub sandboxed: bool,
    pub sandbox_project: Option<String>,
    pub censorship: Option<String>,
}

impl ProjectMetadata {
    pub fn is_vision(&self) -> bool {
        self.llm_type.as_deref() == Some("vision")
    }
}

/// An entry of the global catalog (embedding model, LLM).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Snapshot of `GET /info`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InfoCatalog {
    pub version: String,
    pub embeddings: Vec<CatalogEntry>,
    pub llms: Vec<CatalogEntry>,
    pub loaders: Vec<Value>,
}

/// One chat exchange as returned by `POST /projects/{name}/chat`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChatResponse {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<Value>,
}

/// A listing or search hit.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EmbeddingEntry {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub source: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Body of the listing and search endpoints.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EmbeddingList {
    #[serde(default)]
    pub embeddings: Vec<EmbeddingEntry>,
}

/// Full record of a single source, as returned by the inspect endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SourceRecord {
    /// Filled in client-side; the backend does not echo it.
    pub source: String,
    pub ids: Vec<Value>,
    pub metadatas: Vec<Value>,
    pub documents: Vec<String>,
}

/// Outcome of one ingestion call.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct IngestionResult {
    pub source: String,
    #[serde(rename = "documents")]
    pub documents_produced: u64,
    #[serde(default)]
    pub chunks: u64,
}

/// A keyword tag attached to a text ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub text: String,
}

impl Tag {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A row of `GET /statistics/top-projects`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TopProject {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: String,
    pub total_tokens: Option<u64>,
    pub total_cost: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TopProjects {
    #[serde(default)]
    pub projects: Vec<TopProject>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_metadata_tolerates_missing_fields() {
        let p: ProjectMetadata = serde_json::from_value(json!({
            "name": "docs",
            "llm": "llama3",
            "embeddings": "all-mpnet-base-v2",
            "documents": 42,
            "unknown_field": true
        }))
        .unwrap();
        assert_eq!(p.name, "docs");
        assert_eq!(p.documents, Some(42));
        assert_eq!(p.k, None);
        assert!(!p.sandboxed);
        assert!(!p.is_vision());
    }

    #[test]
    fn test_chat_response_null_sources() {
        let r: ChatResponse = serde_json::from_value(json!({
            "id": "t-1",
            "question": "hi",
            "answer": "hello",
            "sources": null
        }))
        .unwrap();
        assert!(r.sources.is_empty());
    }

    #[test]
    fn test_ingestion_result_without_chunks() {
        let r: IngestionResult =
            serde_json::from_value(json!({"source": "a.pdf", "documents": 3})).unwrap();
        assert_eq!(r.documents_produced, 3);
        assert_eq!(r.chunks, 0);
    }

    #[test]
    fn test_catalog_keeps_unknown_entry_fields() {
        let c: InfoCatalog = serde_json::from_value(json!({
            "version": "5.0",
            "embeddings": [{"name": "e1", "privacy": "public", "dimension": 768}],
            "loaders": [".pdf", ".txt"]
        }))
        .unwrap();
        assert_eq!(c.embeddings[0].privacy.as_deref(), Some("public"));
        assert_eq!(c.embeddings[0].extra["dimension"], json!(768));
        assert!(c.llms.is_empty());
        assert_eq!(c.loaders.len(), 2);
    }
}
