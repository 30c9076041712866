//! Project console: metadata, embedding listing/search, and ingestion.
//!
//! # Listing policy
//!
//! Every time project metadata is refreshed, the search box and result set
//! are cleared and the console decides how to populate them:
//!
//! | `documents` | Mode | Result set |
//! |-------------|------|------------|
//! | unknown or `< 20000` | [`ListingMode::Full`] | full listing fetched automatically |
//! | `>= 20000` | [`ListingMode::SearchOnly`] | empty until [`IngestionConsole::search`] |
//!
//! Listing and search requests are not serialized against each other; when
//! both are outstanding, whichever resolves last owns the result set.
//!
//! # Ingestion
//!
//! [`IngestionConsole::submit`] is gated like a chat session: one ingestion in
//! flight at a time, gate reopened on both success and failure.

use anyhow::{bail, Result};
use std::str::FromStr;
use std::sync::Arc;

use crate::client::{FileUpload, RagApi, SearchRequest};
use crate::error::{ErrorLog, ErrorRecord};
use crate::info::{print_project, ProjectInfoCache};
use crate::ingest::{IngestForm, IngestionStrategy};
use crate::models::{
    EmbeddingEntry, IngestionResult, ProjectMetadata, SourceRecord, Tag, LISTING_THRESHOLD,
};
use crate::privacy::PrivacyClass;

/// How the result set is populated after a metadata refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    Full,
    SearchOnly,
}

impl ListingMode {
    pub fn for_documents(documents: Option<u64>) -> Self {
        match documents {
            Some(n) if n >= LISTING_THRESHOLD => ListingMode::SearchOnly,
            _ => ListingMode::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Similarity search over fragment text.
    Text,
    /// Exact lookup by source identifier.
    Source,
}

impl FromStr for SearchKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(SearchKind::Text),
            "source" => Ok(SearchKind::Source),
            other => bail!("Unknown search kind: {}. Use text or source.", other),
        }
    }
}

impl SearchKind {
    /// Build the request body. `k` and `score` only apply to text searches.
    pub fn request(self, query: &str, k: u32, score: f64) -> SearchRequest {
        match self {
            SearchKind::Text => SearchRequest::Text {
                text: query.to_string(),
                k,
                score,
            },
            SearchKind::Source => SearchRequest::Source {
                source: query.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Ingested(IngestionResult),
    /// The request failed; see [`IngestionConsole::errors`].
    Failed,
    /// The form was empty; no request was made.
    NothingToIngest,
    /// Another ingestion is still running.
    InFlight,
}

#[derive(Default)]
struct ConsoleState {
    project: Option<ProjectMetadata>,
    listing: Vec<EmbeddingEntry>,
    search_box: String,
    inspected: Option<SourceRecord>,
    form: IngestForm,
    last_ingestion: Option<IngestionResult>,
    in_flight: bool,
    errors: ErrorLog,
}

pub struct IngestionConsole {
    api: Arc<dyn RagApi>,
    info: Arc<ProjectInfoCache>,
    project_name: String,
    state: parking_lot::Mutex<ConsoleState>,
}

impl IngestionConsole {
    pub fn new(api: Arc<dyn RagApi>, info: Arc<ProjectInfoCache>, project_name: &str) -> Self {
        Self {
            api,
            info,
            project_name: project_name.to_string(),
            state: parking_lot::Mutex::new(ConsoleState::default()),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Fetch the catalog, the project, and (policy permitting) the listing.
    pub async fn mount(&self) {
        let (_, catalog) = tokio::join!(self.refresh(), self.info.fetch(self.api.as_ref()));
        if let Err(e) = catalog {
            self.state.lock().errors.record("fetch_info", &e);
        }
    }

    /// Re-fetch project metadata and apply the listing policy.
    ///
    /// Returns `false` if the metadata fetch failed, in which case the
    /// result set is left untouched.
    pub async fn refresh(&self) -> bool {
        if self.load_project().await.is_none() {
            return false;
        }
        self.apply_listing_policy().await;
        true
    }

    /// Re-fetch project metadata without touching the result set.
    pub async fn load_project(&self) -> Option<ProjectMetadata> {
        match self.api.project(&self.project_name).await {
            Ok(project) => {
                self.state.lock().project = Some(project.clone());
                Some(project)
            }
            Err(e) => {
                self.state.lock().errors.record("fetch_project", &e);
                None
            }
        }
    }

    /// Discard any search result and repopulate per the listing policy.
    pub async fn clear(&self) -> ListingMode {
        self.apply_listing_policy().await
    }

    async fn apply_listing_policy(&self) -> ListingMode {
        let mode = {
            let mut state = self.state.lock();
            state.search_box.clear();
            state.listing.clear();
            ListingMode::for_documents(state.project.as_ref().and_then(|p| p.documents))
        };

        if mode == ListingMode::Full {
            match self.api.list_embeddings(&self.project_name).await {
                Ok(list) => self.state.lock().listing = list.embeddings,
                Err(e) => self.state.lock().errors.record("fetch_embeddings", &e),
            }
        }
        mode
    }

    /// Replace the result set with the hits for `query`.
    pub async fn search(&self, kind: SearchKind, query: &str, k: u32, score: f64) -> bool {
        self.state.lock().search_box = query.to_string();
        let request = kind.request(query, k, score);

        match self.api.search_embeddings(&self.project_name, &request).await {
            Ok(list) => {
                self.state.lock().listing = list.embeddings;
                true
            }
            Err(e) => {
                self.state.lock().errors.record("search", &e);
                false
            }
        }
    }

    /// Fetch the full record of `source` into the inspected slot.
    pub async fn view_entry(&self, source: &str) -> Option<SourceRecord> {
        match self.api.inspect_source(&self.project_name, source).await {
            Ok(mut record) => {
                record.source = source.to_string();
                self.state.lock().inspected = Some(record.clone());
                Some(record)
            }
            Err(e) => {
                self.state.lock().errors.record("view_entry", &e);
                None
            }
        }
    }

    /// Delete every fragment of `source`, then refresh.
    pub async fn delete_entry(&self, source: &str) -> bool {
        let result = self.api.delete_source(&self.project_name, source).await;
        let ok = match result {
            Ok(()) => true,
            Err(e) => {
                self.state.lock().errors.record("delete_entry", &e);
                false
            }
        };
        self.refresh().await;
        ok
    }

    /// Drop all of the project's embeddings, then refresh.
    pub async fn reset_embeddings(&self) -> bool {
        let result = self.api.reset_embeddings(&self.project_name).await;
        let ok = match result {
            Ok(()) => true,
            Err(e) => {
                self.state.lock().errors.record("reset_embeddings", &e);
                false
            }
        };
        self.refresh().await;
        ok
    }

    /// Delete the project itself.
    pub async fn delete_project(&self) -> bool {
        match self.api.delete_project(&self.project_name).await {
            Ok(()) => true,
            Err(e) => {
                self.state.lock().errors.record("delete_project", &e);
                false
            }
        }
    }

    /// Ingest whatever the form holds, by file → URL → text precedence.
    pub async fn submit(&self) -> IngestOutcome {
        let strategy = {
            let mut state = self.state.lock();
            if state.in_flight {
                return IngestOutcome::InFlight;
            }
            let Some(strategy) = IngestionStrategy::resolve(&state.form) else {
                return IngestOutcome::NothingToIngest;
            };
            state.in_flight = true;
            strategy
        };

        tracing::debug!(project = %self.project_name, kind = strategy.kind(), "ingest");
        let result = strategy
            .dispatch(self.api.as_ref(), &self.project_name)
            .await;

        let outcome = {
            let mut state = self.state.lock();
            state.in_flight = false;
            match result {
                Ok(ingested) => {
                    strategy.consume(&mut state.form);
                    state.last_ingestion = Some(ingested.clone());
                    IngestOutcome::Ingested(ingested)
                }
                Err(e) => {
                    state
                        .errors
                        .record(&format!("ingest_{}", strategy.kind()), &e);
                    IngestOutcome::Failed
                }
            }
        };

        if matches!(outcome, IngestOutcome::Ingested(_)) {
            self.refresh().await;
        }
        outcome
    }

    // ============ Form ============

    pub fn select_file(&self, file: FileUpload) {
        self.state.lock().form.file = Some(file);
    }

    pub fn clear_file(&self) {
        self.state.lock().form.file = None;
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().form.url = url.to_string();
    }

    pub fn set_text(&self, text: &str) {
        self.state.lock().form.text = text.to_string();
    }

    pub fn set_source_name(&self, name: &str) {
        self.state.lock().form.source_name = name.to_string();
    }

    pub fn add_tag(&self, text: &str) {
        self.state.lock().form.tags.push(Tag::new(text));
    }

    /// Remove the tag at `index`; out-of-range indices are ignored.
    pub fn remove_tag(&self, index: usize) {
        let mut state = self.state.lock();
        if index < state.form.tags.len() {
            state.form.tags.remove(index);
        }
    }

    pub fn form(&self) -> IngestForm {
        self.state.lock().form.clone()
    }

    // ============ Accessors ============

    pub fn project(&self) -> Option<ProjectMetadata> {
        self.state.lock().project.clone()
    }

    pub fn listing(&self) -> Vec<EmbeddingEntry> {
        self.state.lock().listing.clone()
    }

    pub fn listing_mode(&self) -> ListingMode {
        ListingMode::for_documents(self.state.lock().project.as_ref().and_then(|p| p.documents))
    }

    pub fn search_box(&self) -> String {
        self.state.lock().search_box.clone()
    }

    pub fn inspected(&self) -> Option<SourceRecord> {
        self.state.lock().inspected.clone()
    }

    pub fn last_ingestion(&self) -> Option<IngestionResult> {
        self.state.lock().last_ingestion.clone()
    }

    pub fn is_submittable(&self) -> bool {
        !self.state.lock().in_flight
    }

    pub fn privacy(&self) -> Option<PrivacyClass> {
        let catalog = self.info.get();
        self.state
            .lock()
            .project
            .as_ref()
            .map(|p| PrivacyClass::of(p, &catalog))
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.state.lock().errors.entries().to_vec()
    }
}

// ============ CLI entry points ============

/// `ragc show`
pub async fn run_show(console: &IngestionConsole) -> Result<()> {
    console.mount().await;
    if let Some(project) = console.project() {
        print_project(&project, &console.info.get());
    }
    Ok(())
}

/// `ragc list`
pub async fn run_list(console: &IngestionConsole) -> Result<()> {
    console.mount().await;
    if console.project().is_none() {
        return Ok(());
    }
    match console.listing_mode() {
        ListingMode::Full => print_listing(&console.listing()),
        ListingMode::SearchOnly => println!(
            "Too many embeddings to list ({} or more documents); use `ragc search`.",
            LISTING_THRESHOLD
        ),
    }
    Ok(())
}

/// `ragc search`
pub async fn run_search(
    console: &IngestionConsole,
    kind: SearchKind,
    query: &str,
    k: Option<u32>,
    score: Option<f64>,
) -> Result<()> {
    let Some(project) = console.load_project().await else {
        return Ok(());
    };
    let k = k.or(project.k).unwrap_or(crate::chat::DEFAULT_K);
    let score = score.or(project.score).unwrap_or(crate::chat::DEFAULT_SCORE);

    if console.search(kind, query, k, score).await {
        let hits = console.listing();
        if hits.is_empty() {
            println!("No results.");
        } else {
            print_listing(&hits);
        }
    }
    Ok(())
}

/// `ragc view`
pub async fn run_view(console: &IngestionConsole, source: &str) -> Result<()> {
    let Some(record) = console.view_entry(source).await else {
        return Ok(());
    };

    println!("--- Source ---");
    println!("source:    {}", record.source);
    println!("fragments: {}", record.documents.len());
    println!();
    for (i, document) in record.documents.iter().enumerate() {
        let id = record
            .ids
            .get(i)
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_default();
        println!("[{}] {}", i, id);
        if let Some(meta) = record.metadatas.get(i) {
            println!("metadata: {}", meta);
        }
        println!("{}", document);
        println!();
    }
    Ok(())
}

/// `ragc delete`
pub async fn run_delete(console: &IngestionConsole, source: &str) -> Result<()> {
    if console.delete_entry(source).await {
        println!("Deleted {}.", source);
        report_documents(console);
    }
    Ok(())
}

/// `ragc reset`
pub async fn run_reset(console: &IngestionConsole) -> Result<()> {
    if console.reset_embeddings().await {
        println!("Embeddings of {} reset.", console.project_name());
        report_documents(console);
    }
    Ok(())
}

/// `ragc delete-project`
pub async fn run_delete_project(console: &IngestionConsole) -> Result<()> {
    if console.delete_project().await {
        println!("Project {} deleted.", console.project_name());
    }
    Ok(())
}

fn report_documents(console: &IngestionConsole) {
    if let Some(docs) = console.project().and_then(|p| p.documents) {
        println!("documents: {}", docs);
    }
}

fn print_listing(entries: &[EmbeddingEntry]) {
    println!("{:<40} SOURCE", "ID");
    println!("{}", "-".repeat(76));
    for entry in entries {
        let id = match &entry.id {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "-".to_string(),
        };
        println!("{:<40} {}", id, entry.source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_threshold_boundary() {
        assert_eq!(ListingMode::for_documents(Some(0)), ListingMode::Full);
        assert_eq!(ListingMode::for_documents(Some(19_999)), ListingMode::Full);
        assert_eq!(
            ListingMode::for_documents(Some(20_000)),
            ListingMode::SearchOnly
        );
        assert_eq!(ListingMode::for_documents(None), ListingMode::Full);
    }

    #[test]
    fn test_search_kind_parsing() {
        assert_eq!("text".parse::<SearchKind>().unwrap(), SearchKind::Text);
        assert_eq!("source".parse::<SearchKind>().unwrap(), SearchKind::Source);
        assert!("fuzzy".parse::<SearchKind>().is_err());
    }

    #[test]
    fn test_source_search_ignores_k_and_score() {
        let body = serde_json::to_value(SearchKind::Source.request("report.pdf", 4, 0.3)).unwrap();
        assert_eq!(body, json!({"source": "report.pdf"}));

        let body = serde_json::to_value(SearchKind::Text.request("rust", 4, 0.3)).unwrap();
        assert_eq!(body, json!({"text": "rust", "k": 4, "score": 0.3}));
    }
}
