//! In-process mock of the RAG backend, served with axum on an ephemeral port.
//!
//! Every request is recorded (method, path, query, auth header, body) so
//! tests can assert on exactly what went over the wire.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// `Basic base64("admin:admin")`.
pub const VALID_AUTH: &str = "Basic YWRtaW46YWRtaW4=";
pub const PROJECT: &str = "docs";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

#[derive(Clone)]
struct MockState {
    documents: Arc<AtomicU64>,
    chats: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct MockBackend {
    pub base_url: String,
    documents: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub async fn start(documents: u64) -> Self {
        let state = MockState {
            documents: Arc::new(AtomicU64::new(documents)),
            chats: Arc::new(AtomicU64::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let documents = state.documents.clone();
        let requests = state.requests.clone();

        let app = Router::new().fallback(handle).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            documents,
            requests,
        }
    }

    pub fn set_documents(&self, n: u64) {
        self.documents.store(n, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests matching `method` whose path ends with `suffix`.
    pub fn find(&self, method: &str, suffix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.ends_with(suffix))
            .collect()
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        content_type,
        body: body.to_vec(),
    });

    if authorization.as_deref() != Some(VALID_AUTH) {
        return detail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let path = uri.path();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let body_json = || serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["info"]) => Json(json!({
            "version": "test",
            "embeddings": [
                {"name": "local-embed", "privacy": "private"},
                {"name": "openai", "privacy": "public"}
            ],
            "llms": [{"name": "llama3", "privacy": "private"}],
            "loaders": [".pdf", ".txt"]
        }))
        .into_response(),

        ("GET", ["statistics", "top-projects"]) => Json(json!({
            "projects": [
                {"id": 1, "name": "docs", "type": "rag", "total_tokens": 1500, "total_cost": 0.25}
            ]
        }))
        .into_response(),

        ("GET", ["projects", PROJECT]) => Json(json!({
            "name": PROJECT,
            "llm": "llama3",
            "llm_type": "qa",
            "llm_privacy": "private",
            "vectorstore": "chroma",
            "embeddings": "local-embed",
            "system": "You are helpful.",
            "k": 4,
            "score": 0.3,
            "documents": state.documents.load(Ordering::SeqCst),
            "metadatas": 2,
            "sandboxed": false
        }))
        .into_response(),

        ("DELETE", ["projects", PROJECT]) => Json(json!({})).into_response(),

        ("POST", ["projects", PROJECT, "chat"]) => {
            let n = state.chats.fetch_add(1, Ordering::SeqCst) + 1;
            let req = body_json();
            let question = req["question"].as_str().unwrap_or_default().to_string();
            Json(json!({
                "id": format!("thread-{}", n),
                "question": question,
                "answer": format!("echo: {}", question),
                "type": "chat",
                "sources": [{"source": "a.txt", "score": 0.9, "text": "...", "keywords": "", "id": "1"}]
            }))
            .into_response()
        }

        ("GET", ["projects", PROJECT, "embeddings"]) => Json(json!({
            "embeddings": [
                {"id": "1", "source": "a.txt"},
                {"id": "2", "source": "b.pdf"}
            ]
        }))
        .into_response(),

        ("POST", ["projects", PROJECT, "embeddings", "search"]) => Json(json!({
            "embeddings": [{"id": "2", "source": "b.pdf", "score": 0.8}]
        }))
        .into_response(),

        ("POST", ["projects", PROJECT, "embeddings", "reset"]) => Json(json!({})).into_response(),

        ("GET", ["projects", PROJECT, "embeddings", "source", encoded]) => {
            let source = STANDARD
                .decode(encoded)
                .ok()
                .and_then(|b| String::from_utf8(b).ok());
            match source {
                Some(source) => Json(json!({
                    "ids": ["1"],
                    "metadatas": [{"source": source}],
                    "documents": [format!("contents of {}", source)]
                }))
                .into_response(),
                None => detail(StatusCode::BAD_REQUEST, "Invalid source"),
            }
        }

        ("DELETE", ["projects", PROJECT, "embeddings", _encoded]) => {
            Json(json!({"deleted": true})).into_response()
        }

        ("POST", ["projects", PROJECT, "embeddings", "ingest", "upload"]) => {
            Json(json!({"source": "upload.txt", "documents": 2, "chunks": 5})).into_response()
        }

        ("POST", ["projects", PROJECT, "embeddings", "ingest", "url"]) => {
            let req = body_json();
            Json(json!({"source": req["url"], "documents": 1, "chunks": 3})).into_response()
        }

        ("POST", ["projects", PROJECT, "embeddings", "ingest", "text"]) => {
            let req = body_json();
            Json(json!({"source": req["source"], "documents": 1, "chunks": 1})).into_response()
        }

        ("GET", ["projects", _]) => detail(StatusCode::NOT_FOUND, "Project not found"),

        _ => detail(StatusCode::NOT_FOUND, "Not Found"),
    }
}
